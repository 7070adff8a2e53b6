//! Async helpers for reading TLV structures from byte streams

use tokio::io::{AsyncRead, AsyncReadExt};

/// Read one TLV number from a stream
///
/// Fails with `UnexpectedEof` on a short read, leaving no way to consume a
/// partial number.
pub async fn read_tl_num_from_stream<R>(reader: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut first = [0u8; 1];
    reader.read_exact(&mut first).await?;
    match first[0] {
        n @ 0..=0xFC => Ok(u64::from(n)),
        0xFD => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf).await?;
            Ok(u64::from(u16::from_be_bytes(buf)))
        }
        0xFE => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf).await?;
            Ok(u64::from(u32::from_be_bytes(buf)))
        }
        _ => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf).await?;
            Ok(u64::from_be_bytes(buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_tl_num() {
        let mut reader: &[u8] = &[0x05, 0xFD, 0x01, 0x00, 0xFE, 0x00, 0x01, 0x00, 0x01];
        assert_eq!(read_tl_num_from_stream(&mut reader).await.unwrap(), 5);
        assert_eq!(read_tl_num_from_stream(&mut reader).await.unwrap(), 256);
        assert_eq!(read_tl_num_from_stream(&mut reader).await.unwrap(), 65537);
    }

    #[tokio::test]
    async fn test_short_read() {
        let mut reader: &[u8] = &[0xFD, 0x01];
        let err = read_tl_num_from_stream(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
