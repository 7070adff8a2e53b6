//! Segment fetcher over a loopback face
//!
//! The app serves a segmented object to itself: the producer handler and
//! the fetcher share one face, with every sent packet pumped back in.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use client::{segment_fetcher, Reply, SegmentFetcherOptions};
use codec::{MetaInfo, PktContext};
use e2e::{pump, TestBed};
use futures::StreamExt;
use security::NullSigner;
use types::{component, Component, Name};

const WAIT: Duration = Duration::from_secs(5);

fn name(uri: &str) -> Name {
    Name::from_str(uri).unwrap()
}

fn serve_segments(bed: &TestBed, prefix: &str, segments: Vec<&'static [u8]>) {
    let base = name(prefix);
    let last_seg = segments.len() as u64 - 1;
    let handler_base = base.clone();
    bed.app
        .attach_handler(
            &base,
            Arc::new(move |int_name: Name, _app_param, reply: Reply, _context: PktContext| {
                let seg = match int_name.last() {
                    Some(comp) if comp.typ() == component::TYPE_SEGMENT => comp.to_number(),
                    _ => 0,
                };
                let Some(content) = segments.get(seg as usize) else {
                    return;
                };
                let data_name = handler_base.appending(Component::from_segment(seg));
                let meta = MetaInfo {
                    content_type: Some(0),
                    freshness_period: Some(1000),
                    final_block_id: Some(Bytes::copy_from_slice(
                        Component::from_segment(last_seg).wire(),
                    )),
                };
                let data =
                    codec::make_data(&data_name, &meta, Some(content), Some(&NullSigner)).unwrap();
                let _ = reply.send(data);
            }),
            None,
        )
        .unwrap();
}

#[tokio::test]
async fn test_fetch_segmented_object() {
    let bed = TestBed::start().await;
    let loopback = pump(bed.face.clone(), bed.face.clone(), WAIT);
    serve_segments(
        &bed,
        "/files/report",
        vec![b"seg0-".as_slice(), b"seg1-".as_slice(), b"seg2".as_slice()],
    );

    let stream = segment_fetcher(
        bed.app.clone(),
        name("/files/report"),
        SegmentFetcherOptions::default(),
    );
    let collected: Vec<_> = stream.collect().await;
    let mut object = Vec::new();
    for piece in collected {
        object.extend_from_slice(&piece.unwrap());
    }
    assert_eq!(object, b"seg0-seg1-seg2");

    loopback.abort();
    bed.stop().await;
}

#[tokio::test]
async fn test_fetch_unsegmented_object() {
    let bed = TestBed::start().await;
    let loopback = pump(bed.face.clone(), bed.face.clone(), WAIT);
    let base = name("/files/plain");
    bed.app
        .attach_handler(
            &base,
            Arc::new(move |int_name: Name, _app_param, reply: Reply, _context| {
                let data = codec::make_data(
                    &int_name,
                    &MetaInfo::with_content_type(0),
                    Some(b"whole object"),
                    Some(&NullSigner),
                )
                .unwrap();
                let _ = reply.send(data);
            }),
            None,
        )
        .unwrap();

    let stream = segment_fetcher(
        bed.app.clone(),
        name("/files/plain"),
        SegmentFetcherOptions::default(),
    );
    let collected: Vec<_> = stream.collect().await;
    assert_eq!(collected.len(), 1);
    assert_eq!(
        collected[0].as_ref().unwrap().as_ref(),
        b"whole object"
    );

    loopback.abort();
    bed.stop().await;
}

#[tokio::test]
async fn test_fetch_with_rdr_discovery() {
    let bed = TestBed::start().await;
    let loopback = pump(bed.face.clone(), bed.face.clone(), WAIT);
    serve_segments(
        &bed,
        "/files/versioned/v=7",
        vec![b"first-".as_slice(), b"second".as_slice()],
    );
    // The metadata point answers with the versioned name to fetch under
    bed.app
        .attach_handler(
            &name("/files/versioned/32=metadata"),
            Arc::new(|int_name: Name, _app_param, reply: Reply, _context| {
                let meta = MetaInfo {
                    content_type: Some(0),
                    freshness_period: Some(10),
                    final_block_id: None,
                };
                let data = codec::make_data(
                    &int_name,
                    &meta,
                    Some(&name("/files/versioned/v=7").encode()),
                    Some(&NullSigner),
                )
                .unwrap();
                let _ = reply.send(data);
            }),
            None,
        )
        .unwrap();

    let stream = segment_fetcher(
        bed.app.clone(),
        name("/files/versioned"),
        SegmentFetcherOptions {
            discovery: client::Discovery::Metadata,
            ..Default::default()
        },
    );
    let collected: Vec<_> = stream.collect().await;
    let mut object = Vec::new();
    for piece in collected {
        object.extend_from_slice(&piece.unwrap());
    }
    assert_eq!(object, b"first-second");

    loopback.abort();
    bed.stop().await;
}

#[tokio::test]
async fn test_fetch_times_out_after_retries() {
    let bed = TestBed::start().await;
    // No producer; every Interest dies in the table
    let stream = segment_fetcher(
        bed.app.clone(),
        name("/files/missing"),
        SegmentFetcherOptions {
            lifetime: 30,
            retry_times: 2,
            ..Default::default()
        },
    );
    let collected: Vec<_> = stream.collect().await;
    assert_eq!(collected.len(), 1);
    assert!(matches!(
        collected[0],
        Err(client::ClientError::Timeout)
    ));
    bed.face.ignore_output();
    bed.stop().await;
}
