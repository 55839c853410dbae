//! File upload over the companion link, end to end through the dispatcher.

use std::time::{Duration, Instant};

use printbridge::app::events::{FileName, StatusEvent};
use printbridge::app::ports::StorageError;
use printbridge::dispatcher::Poll;
use printbridge::error::{Error, TransferError};
use printbridge::link_state::CompanionState;
use printbridge::transfer::hash::digest;

use crate::mock_link::{Rig, ack_all, test_config, wait_until};

const SETTLE: Duration = Duration::from_secs(2);

fn gcode_body(len: usize) -> Vec<u8> {
    let mut body = Vec::new();
    let mut i = 0;
    while body.len() < len {
        body.extend_from_slice(format!("G1 X{} Y{} E{}\n", i, i * 2, i % 7).as_bytes());
        i += 1;
    }
    body.truncate(len);
    body
}

/// Run the handshake up to the point where the engine accepts data.
fn open_upload(rig: &Rig, name: &str) {
    assert_eq!(rig.command("WIFI_STATUS[1192.168.4.20]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("START_TRANSMISSION"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "STM ok\n");
    assert_eq!(rig.bridge.links().companion(), CompanionState::Busy);
    assert_eq!(
        rig.command(&format!("SET_FILENAME[{name}]")),
        Poll::Dispatched(Ok(()))
    );
    assert!(rig.wait_for_reply("Name ok\n", SETTLE), "engine never became ready");
}

#[test]
fn upload_in_three_chunks_verifies() {
    let rig = Rig::new(&test_config(), ack_all());
    let body = gcode_body(512);
    open_upload(&rig, "a.gcode");

    for chunk in [&body[..200], &body[200..400], &body[400..]] {
        rig.companion_sends(chunk);
    }
    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(&body)));

    assert_eq!(res, Poll::Dispatched(Ok(())));
    assert!(rig.companion.text().ends_with("Transfer:ok\n"));
    assert_eq!(rig.store.contents("a.gcode").as_deref(), Some(&body[..]));
    assert!(rig.status.contains(&StatusEvent::UploadComplete(
        FileName::try_from("a.gcode").unwrap()
    )));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);

    let report = rig.bridge.companion_service().last_report().unwrap();
    assert_eq!(report.bytes, 512);
}

#[test]
fn uppercase_digest_is_accepted() {
    let rig = Rig::new(&test_config(), ack_all());
    let body = gcode_body(300);
    open_upload(&rig, "upper.gcode");
    rig.companion_sends(&body);
    let res = rig.command(&format!(
        "TRANSMISSION_OVER[{}]",
        digest(&body).to_ascii_uppercase()
    ));
    assert_eq!(res, Poll::Dispatched(Ok(())));
    assert!(rig.companion.text().ends_with("Transfer:ok\n"));
}

#[test]
fn wrong_digest_reports_corrupt_and_keeps_file() {
    let rig = Rig::new(&test_config(), ack_all());
    let body = gcode_body(512);
    open_upload(&rig, "b.gcode");
    for chunk in body.chunks(200) {
        rig.companion_sends(chunk);
    }
    let wrong = digest(b"something else entirely");
    let res = rig.command(&format!("TRANSMISSION_OVER[{wrong}]"));

    assert_eq!(
        res,
        Poll::Dispatched(Err(Error::Transfer(TransferError::IntegrityMismatch)))
    );
    assert!(rig.companion.text().ends_with("Transfer:corrupt\n"));
    assert_eq!(rig.store.contents("b.gcode").as_deref(), Some(&body[..]));
    assert!(
        !rig.status
            .events()
            .iter()
            .any(|e| matches!(e, StatusEvent::UploadComplete(_)))
    );
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);
}

#[test]
fn rehash_of_stored_file_resolves_mismatch() {
    let rig = Rig::new(&test_config(), ack_all());
    let intended = gcode_body(400);
    let mut garbled = intended.clone();
    garbled[123] ^= 0x20;
    open_upload(&rig, "fixed.gcode");

    rig.companion_sends(&garbled);
    assert!(wait_until(SETTLE, || {
        rig.store.contents("fixed.gcode").map(|c| c.len()) == Some(intended.len())
    }));
    // The stored copy no longer matches what was hashed in flight.
    assert!(rig.store.corrupt("fixed.gcode", 123, intended[123]));

    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(&intended)));
    assert_eq!(res, Poll::Dispatched(Ok(())));
    assert!(rig.companion.text().ends_with("Transfer:ok\n"));
    let report = rig.bridge.companion_service().last_report().unwrap();
    assert_eq!(report.digest, digest(&garbled));
    assert!(rig.status.contains(&StatusEvent::UploadComplete(
        FileName::try_from("fixed.gcode").unwrap()
    )));
}

#[test]
fn write_failure_reports_error_and_frees_link() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.store.set_fail_writes(true);
    open_upload(&rig, "full.gcode");

    rig.companion_sends(&gcode_body(200));
    assert!(wait_until(SETTLE, || {
        !rig.bridge.companion_service().is_transfer_running()
    }));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);

    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(b"")));
    assert_eq!(
        res,
        Poll::Dispatched(Err(Error::Storage(StorageError::WriteFailed)))
    );
    assert!(rig.companion.text().ends_with("Transfer:error\n"));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);
}

#[test]
fn second_filename_rejected_while_receiving() {
    let rig = Rig::new(&test_config(), ack_all());
    let body = gcode_body(128);
    open_upload(&rig, "first.gcode");

    // Injected straight into the dispatcher: on the wire, this text would
    // be file data while a transfer is receiving.
    let second = rig.bridge.dispatcher().dispatch("SET_FILENAME[second.gcode]");
    assert_eq!(second, Err(Error::AlreadyRunning("transfer")));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Busy);

    rig.companion_sends(&body);
    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(&body)));
    assert_eq!(res, Poll::Dispatched(Ok(())));
    assert_eq!(rig.store.contents("first.gcode").as_deref(), Some(&body[..]));
    assert_eq!(rig.store.contents("second.gcode"), None);
}

#[test]
fn sentinel_unblocks_engine_promptly() {
    let cfg = printbridge::config::SystemConfig {
        file_wait_ms: 5_000,
        ..test_config()
    };
    let rig = Rig::new(&cfg, ack_all());
    open_upload(&rig, "empty.gcode");

    let start = Instant::now();
    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(b"")));
    assert_eq!(res, Poll::Dispatched(Ok(())));
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "completion waited for the data queue timeout"
    );
    assert_eq!(rig.store.contents("empty.gcode").as_deref(), Some(&b""[..]));
}

#[test]
fn stalled_sender_gets_reset_request() {
    let rig = Rig::new(&test_config(), ack_all());
    open_upload(&rig, "stall.gcode");

    assert!(rig.wait_for_reply("reset\n", SETTLE));
    assert!(wait_until(SETTLE, || {
        !rig.bridge.companion_service().is_transfer_running()
    }));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);

    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(b"")));
    assert_eq!(
        res,
        Poll::Dispatched(Err(Error::Transfer(TransferError::Stalled)))
    );
    assert!(rig.companion.text().ends_with("Transfer:error\n"));
}

#[test]
fn create_failure_reports_error() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.store.set_fail_create(true);
    assert_eq!(rig.command("START_TRANSMISSION"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("SET_FILENAME[nope.gcode]"), Poll::Dispatched(Ok(())));
    assert!(wait_until(SETTLE, || {
        !rig.bridge.companion_service().is_transfer_running()
    }));

    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(b"")));
    assert!(matches!(res, Poll::Dispatched(Err(Error::Storage(_)))));
    assert!(rig.companion.text().ends_with("Transfer:error\n"));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);
}

#[test]
fn completion_without_transfer_is_an_error() {
    let rig = Rig::new(&test_config(), ack_all());
    let res = rig.command(&format!("TRANSMISSION_OVER[{}]", digest(b"")));
    assert_eq!(
        res,
        Poll::Dispatched(Err(Error::Transfer(TransferError::NotActive)))
    );
    assert_eq!(rig.take_replies(), "Transfer:error\n");
}
