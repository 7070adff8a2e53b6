//! Dispatcher scenarios over the dummy face
//!
//! Each test drives the app exactly as a forwarder would: inject full
//! packets, assert the exact bytes sent back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use client::{ClientError, Reply};
use codec::{InterestParam, MetaInfo, PktContext, SignaturePtrs, ValidResult};
use e2e::TestBed;
use hex_literal::hex;
use security::{pass_all, NullSigner, Validator};
use types::Name;

const WAIT: Duration = Duration::from_secs(2);

fn name(uri: &str) -> Name {
    Name::from_str(uri).unwrap()
}

struct FailValidator;

#[async_trait]
impl Validator for FailValidator {
    async fn validate(
        &self,
        _name: &Name,
        _sig_ptrs: &SignaturePtrs,
        _context: &PktContext,
    ) -> ValidResult {
        tokio::time::sleep(Duration::from_millis(3)).await;
        ValidResult::Fail
    }
}

#[tokio::test]
async fn test_consumer_basic() {
    let bed = TestBed::start().await;
    let app = bed.app.clone();
    let request = tokio::spawn(async move {
        app.express(
            &name("/example/testApp/randomData/t=1570430517101"),
            InterestParam {
                must_be_fresh: true,
                lifetime: Some(6000),
                ..Default::default()
            },
            None,
            None,
            pass_all(),
        )
        .await
    });
    bed.face
        .consume_output(
            &hex!(
                "0530 0728 0807 6578616d706c65 0807 74657374417070 080a 72616e646f6d44617461"
                "3808 0000016da4f3ff6d 1200 0c02 1770"
            ),
            WAIT,
        )
        .await;
    bed.face
        .input_packet(&hex!(
            "0642 0728 0807 6578616d706c65 0807 74657374417070 080a 72616e646f6d44617461"
            "3808 0000016da4f3ff6d 1407 180100 190203e8 150d 48656c6c6f2c20776f726c6421"
        ))
        .unwrap();
    let (data_name, content, context) = request.await.unwrap().unwrap();
    assert_eq!(data_name, name("/example/testApp/randomData/t=1570430517101"));
    assert_eq!(content.as_deref(), Some(b"Hello, world!" as &[u8]));
    assert_eq!(
        context.meta_info.unwrap().freshness_period,
        Some(1000)
    );
    bed.stop().await;
}

#[tokio::test]
async fn test_interest_cancel_on_shutdown() {
    let bed = TestBed::start().await;
    let app = bed.app.clone();
    let request = tokio::spawn(async move {
        app.express(
            &name("/not important"),
            InterestParam::default(),
            None,
            None,
            pass_all(),
        )
        .await
    });
    bed.face
        .consume_output(
            &hex!("0515 070f 080d 6e6f7420696d706f7274616e74 0c02 0fa0"),
            WAIT,
        )
        .await;
    bed.app.shutdown();
    assert!(matches!(
        request.await.unwrap(),
        Err(ClientError::Canceled)
    ));
}

#[tokio::test]
async fn test_interest_nack() {
    let bed = TestBed::start().await;
    let app = bed.app.clone();
    let request = tokio::spawn(async move {
        app.express(
            &name("/localhost/nfd/faces/events"),
            InterestParam {
                can_be_prefix: true,
                must_be_fresh: true,
                lifetime: Some(1000),
                ..Default::default()
            },
            None,
            None,
            pass_all(),
        )
        .await
    });
    let interest = hex!(
        "0529 071f 0809 6c6f63616c686f7374 0803 6e6664 0805 6661636573 0806 6576656e7473"
        "2100 1200 0c02 03e8"
    );
    bed.face.consume_output(&interest, WAIT).await;
    let mut nack = hex!("6436 fd0320 05 fd0321 01 96 502b").to_vec();
    nack.extend_from_slice(&interest);
    bed.face.input_packet(&nack).unwrap();
    assert!(matches!(
        request.await.unwrap(),
        Err(ClientError::Nack { reason: 150 })
    ));
    bed.stop().await;
}

#[tokio::test]
async fn test_interest_timeout() {
    let bed = TestBed::start().await;
    let result = bed
        .app
        .express(
            &name("/not important"),
            InterestParam {
                lifetime: Some(10),
                ..Default::default()
            },
            None,
            None,
            pass_all(),
        )
        .await;
    assert!(matches!(result, Err(ClientError::Timeout)));
    bed.stop().await;
}

#[tokio::test]
async fn test_data_validation_failure() {
    let bed = TestBed::start().await;
    let app = bed.app.clone();
    let request = tokio::spawn(async move {
        app.express(
            &name("/not/important"),
            InterestParam {
                nonce: Some(0),
                lifetime: Some(1000),
                ..Default::default()
            },
            None,
            None,
            Arc::new(FailValidator),
        )
        .await
    });
    bed.face
        .consume_output(
            &hex!("051c 0710 0803 6e6f74 0809 696d706f7274616e74 0a04 00000000 0c02 03e8"),
            WAIT,
        )
        .await;
    bed.face
        .input_packet(&hex!(
            "061d 0710 0803 6e6f74 0809 696d706f7274616e74 1403 180100 1504 74657374"
        ))
        .unwrap();
    match request.await.unwrap() {
        Err(ClientError::Validation {
            name: failed,
            content,
            result,
            ..
        }) => {
            assert_eq!(failed, name("/not/important"));
            assert_eq!(content.as_deref(), Some(b"test" as &[u8]));
            assert_eq!(result, ValidResult::Fail);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    bed.stop().await;
}

#[tokio::test]
async fn test_can_be_prefix_matching() {
    let bed = TestBed::start().await;
    let app = bed.app.clone();
    let exact = tokio::spawn({
        let app = app.clone();
        async move {
            app.express(
                &name("/not"),
                InterestParam {
                    lifetime: Some(100),
                    ..Default::default()
                },
                None,
                None,
                pass_all(),
            )
            .await
        }
    });
    // The exact Interest goes out first; pin the ordering
    bed.face
        .consume_output(&hex!("050a 0705 0803 6e6f74 0c01 64"), WAIT)
        .await;
    let prefix = tokio::spawn({
        let app = app.clone();
        async move {
            app.express(
                &name("/not"),
                InterestParam {
                    can_be_prefix: true,
                    lifetime: Some(100),
                    ..Default::default()
                },
                None,
                None,
                pass_all(),
            )
            .await
        }
    });
    let longer = tokio::spawn({
        let app = app.clone();
        async move {
            app.express(
                &name("/not/important"),
                InterestParam {
                    lifetime: Some(100),
                    ..Default::default()
                },
                None,
                None,
                pass_all(),
            )
            .await
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    bed.face.ignore_output();
    bed.face
        .input_packet(&hex!(
            "061d 0710 0803 6e6f74 0809 696d706f7274616e74 1403 180100 1504 74657374"
        ))
        .unwrap();

    let (prefix_name, prefix_content, _) = prefix.await.unwrap().unwrap();
    assert_eq!(prefix_name, name("/not/important"));
    assert_eq!(prefix_content.as_deref(), Some(b"test" as &[u8]));
    let (longer_name, longer_content, _) = longer.await.unwrap().unwrap();
    assert_eq!(longer_name, name("/not/important"));
    assert_eq!(longer_content.as_deref(), Some(b"test" as &[u8]));
    assert!(matches!(exact.await.unwrap(), Err(ClientError::Timeout)));
    bed.stop().await;
}

#[tokio::test]
async fn test_route_and_reply() {
    let bed = TestBed::start().await;
    bed.app
        .attach_handler(
            &name("/not"),
            Arc::new(|int_name: Name, _app_param, reply: Reply, context: PktContext| {
                assert_eq!(
                    context.raw_packet.as_ref(),
                    &hex!("0515 0710 0803 6e6f74 0809 696d706f7274616e74 0c01 05")
                );
                assert!(context.sig_ptrs.signature_info.is_none());
                let data = codec::make_data(
                    &int_name,
                    &MetaInfo::with_content_type(0),
                    Some(b"test"),
                    Some(&NullSigner),
                )
                .unwrap();
                reply.send(data).unwrap();
            }),
            None,
        )
        .unwrap();
    bed.face
        .input_packet(&hex!("0515 0710 0803 6e6f74 0809 696d706f7274616e74 0c01 05"))
        .unwrap();
    bed.face
        .consume_output(
            &hex!(
                "0624 0710 0803 6e6f74 0809 696d706f7274616e74 1403 180100 1504 74657374"
                "1603 1b01c8 1700"
            ),
            WAIT,
        )
        .await;
    bed.stop().await;
}

#[tokio::test]
async fn test_reply_echoes_pit_token() {
    let bed = TestBed::start().await;
    bed.app
        .attach_handler(
            &name("/not"),
            Arc::new(|int_name: Name, _app_param, reply: Reply, _context| {
                let data = codec::make_data(
                    &int_name,
                    &MetaInfo::with_content_type(0),
                    Some(b"test"),
                    Some(&NullSigner),
                )
                .unwrap();
                reply.send(data).unwrap();
            }),
            None,
        )
        .unwrap();
    bed.face
        .input_packet(&hex!(
            "641f 6204 01020304 5017 0515 0710 0803 6e6f74 0809 696d706f7274616e74 0c01 05"
        ))
        .unwrap();
    bed.face
        .consume_output(
            &hex!(
                "642e 6204 01020304 5026"
                "0624 0710 0803 6e6f74 0809 696d706f7274616e74 1403 180100 1504 74657374"
                "1603 1b01c8 1700"
            ),
            WAIT,
        )
        .await;
    bed.stop().await;
}

#[tokio::test]
async fn test_congestion_marked_interest_still_dispatches() {
    let bed = TestBed::start().await;
    bed.app
        .attach_handler(
            &name("/not"),
            Arc::new(|int_name: Name, _app_param, reply: Reply, context: PktContext| {
                assert_eq!(context.congestion_mark, Some(1));
                let data = codec::make_data(
                    &int_name,
                    &MetaInfo::with_content_type(0),
                    Some(b"test"),
                    Some(&NullSigner),
                )
                .unwrap();
                reply.send(data).unwrap();
            }),
            None,
        )
        .unwrap();
    bed.face
        .input_packet(&hex!(
            "641e fd0340 01 01 5017 0515 0710 0803 6e6f74 0809 696d706f7274616e74 0c01 05"
        ))
        .unwrap();
    bed.face
        .consume_output(
            &hex!(
                "0624 0710 0803 6e6f74 0809 696d706f7274616e74 1403 180100 1504 74657374"
                "1603 1b01c8 1700"
            ),
            WAIT,
        )
        .await;
    bed.stop().await;
}

#[tokio::test]
async fn test_signed_interest_without_passing_validator_is_dropped() {
    let bed = TestBed::start().await;
    let called = Arc::new(AtomicBool::new(false));
    let called_in_handler = called.clone();
    bed.app
        .attach_handler(
            &name("/not"),
            Arc::new(move |_name, _app_param, _reply, _context| {
                called_in_handler.store(true, Ordering::SeqCst);
            }),
            Some(Arc::new(FailValidator)),
        )
        .unwrap();
    bed.face
        .input_packet(&hex!(
            "0560 0732 0803 6e6f74 0809 696d706f7274616e74"
            "0220 458aea78497d5bb1cdf001bedbe9030835b1672b4ba86a4b2cd0ad29078396bb"
            "0c01 05 2400 2c03 1b0100"
            "2e20 2193217a475b25cf73e8395c8f5ed3a4b913aa7fa63fd71361567953dc1d57ea"
        ))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!called.load(Ordering::SeqCst));
    bed.face.ignore_output();
    bed.stop().await;
}

#[tokio::test]
async fn test_implicit_sha256_pinning() {
    let bed = TestBed::start().await;
    let app = bed.app.clone();
    let wrong = tokio::spawn({
        let app = app.clone();
        async move {
            app.express(
                &name(
                    "/test/sha256digest=ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                ),
                InterestParam {
                    lifetime: Some(100),
                    ..Default::default()
                },
                None,
                None,
                pass_all(),
            )
            .await
        }
    });
    let right = tokio::spawn({
        let app = app.clone();
        async move {
            app.express(
                &name(
                    "/test/sha256digest=5488f2c11b566d49e9904fb52aa6f6f9e66a954168109ce156eea2c92c57e4c2",
                ),
                InterestParam {
                    lifetime: Some(100),
                    ..Default::default()
                },
                None,
                None,
                pass_all(),
            )
            .await
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    bed.face.ignore_output();
    bed.face
        .input_packet(&hex!("0613 0706 0804 74657374 1403 180100 1504 74657374"))
        .unwrap();
    let (right_name, right_content, _) = right.await.unwrap().unwrap();
    assert_eq!(right_name, name("/test"));
    assert_eq!(right_content.as_deref(), Some(b"test" as &[u8]));
    assert!(matches!(wrong.await.unwrap(), Err(ClientError::Timeout)));
    bed.stop().await;
}

#[tokio::test]
async fn test_duplicate_handler_rejected() {
    let bed = TestBed::start().await;
    let handler: client::IntHandler = Arc::new(|_, _, _, _| {});
    bed.app
        .attach_handler(&name("/a"), handler.clone(), None)
        .unwrap();
    assert!(matches!(
        bed.app.attach_handler(&name("/a"), handler.clone(), None),
        Err(ClientError::DuplicateHandler(_))
    ));
    // Detaching restores the slot
    bed.app.detach_handler(&name("/a"));
    bed.app.attach_handler(&name("/a"), handler, None).unwrap();
    bed.stop().await;
}
