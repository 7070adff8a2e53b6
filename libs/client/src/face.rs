//! # Face and Registerer Contracts
//!
//! The core consumes a bidirectional packet channel: the transport layer
//! implements [`Face`], delivering inbound frames through a bound channel
//! and accepting outbound buffers via `send`. The concrete stream, datagram
//! and IPC faces live outside the core.
//!
//! [`DummyFace`] is the deterministic in-memory face the integration tests
//! drive: injected packets flow into the dispatcher, sent packets are
//! captured for byte-exact assertion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use types::varnum::parse_tl_num;
use types::Name;

use crate::error::{ClientError, ClientResult};

/// One inbound link-level frame: the outer TLV type and the full packet
#[derive(Debug, Clone)]
pub struct FaceFrame {
    pub typ: u64,
    pub packet: Bytes,
}

/// Bidirectional packet channel provided by the transport layer
#[async_trait]
pub trait Face: Send + Sync {
    /// Bring the face up; must be called before packets flow
    async fn open(&self) -> ClientResult<()>;

    /// Attach the dispatcher's intake channel; called once before `open`
    fn bind(&self, sink: mpsc::UnboundedSender<FaceFrame>);

    /// Best-effort enqueue of an encoded packet
    fn send(&self, data: Bytes) -> ClientResult<()>;

    /// Close the face; idempotent. Dropping the intake channel ends the
    /// dispatcher loop.
    fn shutdown(&self);

    fn running(&self) -> bool;
}

/// Forwarder prefix-registration client contract
#[async_trait]
pub trait Registerer: Send + Sync {
    async fn register(&self, name: &Name) -> ClientResult<bool>;
    async fn unregister(&self, name: &Name) -> ClientResult<bool>;
}

/// Registerer that accepts every request without a forwarder
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRegisterer;

#[async_trait]
impl Registerer for NullRegisterer {
    async fn register(&self, _name: &Name) -> ClientResult<bool> {
        Ok(true)
    }

    async fn unregister(&self, _name: &Name) -> ClientResult<bool> {
        Ok(true)
    }
}

/// In-memory face for deterministic tests
#[derive(Default)]
pub struct DummyFace {
    sink: Mutex<Option<mpsc::UnboundedSender<FaceFrame>>>,
    output: Mutex<Vec<u8>>,
    output_event: Notify,
    running: AtomicBool,
}

impl DummyFace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a complete TLV packet into the dispatcher
    pub fn input_packet(&self, packet: &[u8]) -> ClientResult<()> {
        let packet = Bytes::copy_from_slice(packet);
        let (typ, _) = parse_tl_num(&packet, 0).map_err(|e| ClientError::Network(e.to_string()))?;
        let sink = self.sink.lock();
        sink.as_ref()
            .ok_or_else(|| ClientError::Network("face is not bound".into()))?
            .send(FaceFrame { typ, packet })
            .map_err(|_| ClientError::Network("dispatcher is gone".into()))
    }

    /// Wait until output arrives, assert it matches, and clear the buffer
    pub async fn consume_output(&self, expected: &[u8], timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.output_event.notified();
            {
                let mut output = self.output.lock();
                if !output.is_empty() {
                    assert_eq!(
                        hex::encode(&*output),
                        hex::encode(expected),
                        "face output mismatch"
                    );
                    output.clear();
                    return;
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                panic!("no face output within {timeout:?}");
            }
        }
    }

    /// Wait for any output and return it
    pub async fn take_output(&self, timeout: Duration) -> Vec<u8> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.output_event.notified();
            {
                let mut output = self.output.lock();
                if !output.is_empty() {
                    return std::mem::take(&mut *output);
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                panic!("no face output within {timeout:?}");
            }
        }
    }

    /// Discard whatever has been sent so far
    pub fn ignore_output(&self) {
        self.output.lock().clear();
    }
}

#[async_trait]
impl Face for DummyFace {
    async fn open(&self) -> ClientResult<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn bind(&self, sink: mpsc::UnboundedSender<FaceFrame>) {
        *self.sink.lock() = Some(sink);
    }

    fn send(&self, data: Bytes) -> ClientResult<()> {
        if !self.running() {
            return Err(ClientError::Network(
                "cannot send packet before connected".into(),
            ));
        }
        self.output.lock().extend_from_slice(&data);
        self.output_event.notify_waiters();
        Ok(())
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        *self.sink.lock() = None;
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
