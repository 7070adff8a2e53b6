//! Wire-exact encoding scenarios and cross-crate round trips

use bytes::Bytes;
use codec::{InterestParam, MetaInfo};
use hex_literal::hex;
use security::DigestSha256Signer;
use sha2::{Digest, Sha256};
use types::Name;

fn name(uri: &str) -> Name {
    Name::from_str(uri).unwrap()
}

#[test]
fn test_basic_interest_encode() {
    let (wire, _) = codec::make_interest(
        &name("/local/ndn/prefix"),
        &InterestParam::default(),
        None,
        None,
    )
    .unwrap();
    assert_eq!(
        wire.as_ref(),
        &hex!("051a 0714 0805 6c6f63616c 0803 6e646e 0806 707265666978 0c02 0fa0")
    );
}

#[test]
fn test_interest_with_all_flags() {
    let param = InterestParam {
        can_be_prefix: true,
        must_be_fresh: true,
        hop_limit: Some(1),
        nonce: Some(0),
        lifetime: Some(10),
        forwarding_hint: Vec::new(),
    };
    let (wire, _) = codec::make_interest(&name("/local/ndn/prefix"), &param, None, None).unwrap();
    assert_eq!(
        wire.as_ref(),
        &hex!(
            "0526 0714 0805 6c6f63616c 0803 6e646e 0806 707265666978"
            "2100 1200 0a04 00000000 0c01 0a 2201 01"
        )
    );
}

#[test]
fn test_signed_interest_digest_structure() {
    let param = InterestParam {
        nonce: Some(0x6c21_1166),
        ..Default::default()
    };
    let (wire, final_name) = codec::make_interest(
        &name("/local/ndn/prefix"),
        &param,
        None,
        Some(&DigestSha256Signer::new()),
    )
    .unwrap();
    assert_eq!(wire.len(), 0x6b + 2);
    assert_eq!(wire[0], 0x05);
    assert_eq!(final_name.len(), 4);

    let parsed = codec::parse_interest(wire).unwrap();
    assert_eq!(parsed.param.nonce, Some(0x6c21_1166));
    assert_eq!(parsed.app_param.as_deref(), Some(b"" as &[u8]));
    let sig = &parsed.sig_ptrs;
    assert_eq!(sig.signature_info.as_ref().unwrap().signature_type, 0);
    assert_eq!(sig.signature_value_slice().unwrap().len(), 32);

    // The digest component covers the span from ApplicationParameters on
    let mut h = Sha256::new();
    for blk in sig.digest_covered_slices() {
        h.update(blk);
    }
    assert_eq!(h.finalize().as_slice(), sig.digest_value_slice().unwrap());
    // The signature covers the name (digest excluded) through SignatureInfo
    let mut h = Sha256::new();
    for blk in sig.signature_covered_slices() {
        h.update(blk);
    }
    assert_eq!(h.finalize().as_slice(), sig.signature_value_slice().unwrap());
}

#[test]
fn test_data_encode() {
    let wire = codec::make_data(
        &name("/local/ndn/prefix"),
        &MetaInfo::with_content_type(0),
        None,
        Some(&DigestSha256Signer::new()),
    )
    .unwrap();
    assert_eq!(
        wire.as_ref(),
        &hex!(
            "0642 0714 0805 6c6f63616c 0803 6e646e 0806 707265666978"
            "1403 180100 1603 1b0100"
            "1720 7f31e409c57a2f1d0dda566838fdd994d82753135bd715a59d255e80f2abf0b5"
        )
    );
}

#[test]
fn test_packet_round_trips_canonical() {
    let param = InterestParam {
        can_be_prefix: true,
        nonce: Some(0xdead_beef),
        lifetime: Some(42),
        ..Default::default()
    };
    let (wire, _) =
        codec::make_interest(&name("/round/trip"), &param, None, None).unwrap();
    let parsed = codec::parse_interest(wire.clone()).unwrap();
    let (rebuilt, _) =
        codec::make_interest(&parsed.name, &parsed.param, None, None).unwrap();
    assert_eq!(rebuilt, wire);

    let data_wire = codec::make_data(
        &name("/round/trip"),
        &MetaInfo {
            content_type: Some(0),
            freshness_period: Some(1000),
            final_block_id: None,
        },
        Some(b"abc"),
        None,
    )
    .unwrap();
    let parsed = codec::parse_data(data_wire.clone()).unwrap();
    let rebuilt = codec::make_data(
        &parsed.name,
        &parsed.meta_info.unwrap(),
        parsed.content.as_deref(),
        None,
    )
    .unwrap();
    assert_eq!(rebuilt, data_wire);
}

#[test]
fn test_lvs_signing_scenario() {
    let schema = r#"
    #KEY: "KEY"/_/_/_
    #site: "lvs-test"
    #article: #site/"article"/author/post/_version & {_version: $eq_type("v=0")} <= #author
    #author: #site/"author"/author/"KEY"/_/admin/_ <= #admin
    #admin: #site/"admin"/admin/#KEY <= #root
    #root: #site/#KEY
    "#;
    let checker =
        trust::Checker::new(trust::compile_lvs(schema).unwrap(), trust::default_user_fns())
            .unwrap();
    assert!(checker.check(
        &name("/lvs-test/article/xinyu/hello/v=1"),
        &name("/lvs-test/author/xinyu/KEY/k1/admin/c1"),
    ));
    // `author` is a named pattern shared across rules; a different author
    // on the key cannot sign
    assert!(!checker.check(
        &name("/lvs-test/article/xinyu/hello/v=1"),
        &name("/lvs-test/author/alice/KEY/k1/admin/c1"),
    ));
}

#[test]
fn test_lvs_model_round_trip_and_determinism() {
    let schema = r#"
    #KEY: "KEY"/_/_/_
    #blog: "blog"/#KEY
    #post: "blog"/"post"/author/seq & { seq: $eq_type("seq=0") } <= #blog
    "#;
    let model = trust::compile_lvs(schema).unwrap();
    let wire = model.encode();
    assert_eq!(trust::compile_lvs(schema).unwrap().encode(), wire);
    let decoded = trust::LvsModel::decode(&wire).unwrap();
    assert_eq!(decoded.encode(), wire);
}

#[test]
fn test_state_vec_round_trip() {
    let sv = svs::StateVec {
        entries: vec![
            svs::StateVecEntry {
                node_id: name("/peer/a"),
                seq_no: 12,
            },
            svs::StateVecEntry {
                node_id: name("/peer/b"),
                seq_no: 0x1_0000,
            },
        ],
    };
    let wire = sv.encode_wrapped();
    let parsed = svs::StateVec::parse_wrapped(&wire).unwrap();
    assert_eq!(parsed, sv);
    assert_eq!(parsed.encode_wrapped(), wire);
}

#[test]
fn test_zero_length_component_round_trip() {
    let n = name("/a//b");
    let wire = n.encode();
    assert_eq!(Name::from_wire(&wire).unwrap(), n);
    assert_eq!(n[1].wire(), b"\x08\x00");
}

#[test]
fn test_distinct_pit_keys_with_and_without_digest() {
    let plain = name("/test");
    let digest = Bytes::from(
        Sha256::digest(hex!("0613 0706 0804 74657374 1403 180100 1504 74657374")).to_vec(),
    );
    let pinned = plain.appending(
        types::Component::from_bytes_typed(&digest, types::component::TYPE_IMPLICIT_SHA256)
            .unwrap(),
    );
    assert_ne!(plain, pinned);
    assert!(plain.is_prefix(&pinned));
}
