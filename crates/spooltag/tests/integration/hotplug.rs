//! Reader selection and the background locator loop.

use std::time::Duration;

use tokio::sync::broadcast;

use spooltag::ReaderError;
use spooltag_transport::ReaderSelection;

use crate::harness::{blank_tag, TestRig, ACR122, ACR1252_PICC, ACR1252_SAM};

#[test]
fn test_rule_order_wins_over_enumeration_order() {
    let rig = TestRig::with_readers(&[ACR1252_SAM, ACR1252_PICC, ACR122]);
    assert_eq!(rig.reader.locator().current().as_deref(), Some(ACR122));
}

#[test]
fn test_sam_slot_is_never_selected() {
    let rig = TestRig::with_readers(&[ACR1252_SAM]);
    assert!(!rig.reader.get_connection_state());

    rig.sim.attach_reader(ACR1252_PICC);
    rig.reader.locator().refresh();
    assert_eq!(rig.reader.locator().current().as_deref(), Some(ACR1252_PICC));
}

#[test]
fn test_preferred_reader_overrides_rules() {
    let selection = ReaderSelection {
        preferred: Some("acr1252".into()),
        ..ReaderSelection::default()
    };
    let rig = TestRig::build(&[ACR122, ACR1252_SAM], selection);
    assert_eq!(rig.reader.locator().current().as_deref(), Some(ACR1252_SAM));
}

#[test]
fn test_unknown_reader_is_not_supported() {
    let rig = TestRig::with_readers(&["Generic USB Smart Card Reader"]);
    assert!(!rig.reader.get_connection_state());
    assert!(matches!(rig.reader.read_spool(), Err(ReaderError::NoReader)));
}

#[tokio::test]
async fn test_locator_loop_tracks_hotplug() {
    let rig = TestRig::with_readers(&[]);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = rig.reader.spawn_locator(Duration::from_millis(10), shutdown_rx);

    rig.sim.attach_reader(ACR122);
    wait_for(|| rig.reader.get_connection_state()).await;

    rig.sim.detach_reader(ACR122);
    wait_for(|| !rig.reader.get_connection_state()).await;

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_reader_unplug_ends_pending_read() {
    let rig = TestRig::new();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = rig.reader.spawn_locator(Duration::from_millis(10), shutdown_rx);

    let worker = rig.reader.clone();
    let read = tokio::task::spawn_blocking(move || worker.read_spool());

    tokio::time::sleep(Duration::from_millis(50)).await;
    rig.sim.detach_reader(ACR122);

    let result = tokio::time::timeout(Duration::from_secs(2), read)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ReaderError::NoReader)));

    // Plugging back in lets the next read through.
    rig.sim.attach_reader(ACR122);
    rig.sim.present_tag(blank_tag());
    wait_for(|| rig.reader.get_connection_state()).await;
    let worker = rig.reader.clone();
    let read = tokio::task::spawn_blocking(move || worker.read_spool());
    assert!(read.await.unwrap().is_ok());

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
