//! State Vector Sync convergence over paired dummy faces
//!
//! Two nodes run on separate apps; a pump copies whatever each face sends
//! into the other, so sync Interests flow exactly as on a broadcast link.

use std::sync::Arc;
use std::time::Duration;

use e2e::{pump, TestBed};
use security::{pass_all, DigestSha256Signer};
use svs::{SvsConfig, SvsInst};
use types::Name;

const WAIT: Duration = Duration::from_secs(5);

fn name(uri: &str) -> Name {
    Name::from_str(uri).unwrap()
}

fn make_inst(node: &str, missing_tx: tokio::sync::mpsc::UnboundedSender<()>) -> Arc<SvsInst> {
    let mut config = SvsConfig::new(name("/sync/group"), name(node));
    config.sync_interval = Duration::from_millis(100);
    config.suppression_interval = Duration::from_millis(20);
    SvsInst::new(
        config,
        Arc::new(move |_inst: &Arc<SvsInst>| {
            let _ = missing_tx.send(());
        }),
        Arc::new(DigestSha256Signer::new_interest()),
        pass_all(),
    )
}

#[tokio::test]
async fn test_two_node_convergence() {
    let bed_a = TestBed::start().await;
    let bed_b = TestBed::start().await;
    let pump_ab = pump(bed_a.face.clone(), bed_b.face.clone(), WAIT);
    let pump_ba = pump(bed_b.face.clone(), bed_a.face.clone(), WAIT);

    let (missing_a_tx, mut missing_a) = tokio::sync::mpsc::unbounded_channel();
    let (missing_b_tx, mut missing_b) = tokio::sync::mpsc::unbounded_channel();
    let inst_a = make_inst("/node/a", missing_a_tx);
    let inst_b = make_inst("/node/b", missing_b_tx);
    inst_a.start(bed_a.app.clone()).unwrap();
    inst_b.start(bed_b.app.clone()).unwrap();

    // A publishes; B must learn about sequence 1 and report missing data
    let seq = inst_a.new_data();
    assert_eq!(seq, 1);
    tokio::time::timeout(WAIT, missing_b.recv())
        .await
        .expect("B hears about A's publication")
        .unwrap();
    let b_view = inst_b.local_state_vector();
    assert!(b_view.contains(&(name("/node/a"), 1)));

    // B publishes; A must learn about it the same way
    let seq = inst_b.new_data();
    assert_eq!(seq, 1);
    tokio::time::timeout(WAIT, missing_a.recv())
        .await
        .expect("A hears about B's publication")
        .unwrap();

    // After a few periodic rounds both views agree
    tokio::time::sleep(Duration::from_millis(400)).await;
    let view_a = inst_a.local_state_vector();
    let view_b = inst_b.local_state_vector();
    assert_eq!(view_a, view_b);
    assert!(view_a.contains(&(name("/node/a"), 1)));
    assert!(view_a.contains(&(name("/node/b"), 1)));

    inst_a.stop();
    inst_b.stop();
    pump_ab.abort();
    pump_ba.abort();
    bed_a.stop().await;
    bed_b.stop().await;
}

#[tokio::test]
async fn test_new_data_is_strictly_increasing() {
    let bed = TestBed::start().await;
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let inst = make_inst("/node/solo", tx);
    inst.start(bed.app.clone()).unwrap();
    let mut last = 0;
    for _ in 0..10 {
        let seq = inst.new_data();
        assert!(seq > last);
        last = seq;
    }
    assert!(inst
        .local_state_vector()
        .contains(&(name("/node/solo"), 10)));
    inst.stop();
    bed.face.ignore_output();
    bed.stop().await;
}

#[tokio::test]
async fn test_start_twice_rejected() {
    let bed = TestBed::start().await;
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let inst = make_inst("/node/dup", tx);
    inst.start(bed.app.clone()).unwrap();
    assert!(inst.start(bed.app.clone()).is_err());
    inst.stop();
    bed.stop().await;
}
