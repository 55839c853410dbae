//! Companion command handling: framing, errors, queries and setpoints.

use std::sync::Arc;

use printbridge::app::events::StatusEvent;
use printbridge::app::ports::StorageError;
use printbridge::dispatcher::Poll;
use printbridge::error::{Error, ProtocolError};
use printbridge::link_state::CompanionState;

use crate::mock_link::{Reply, Rig, Script, ack_all, test_config};

#[test]
fn idle_poll_runs_housekeeping() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(rig.bridge.dispatcher().poll_once(), Poll::Idle);
}

#[test]
fn unknown_verb_is_discarded_and_loop_continues() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.companion_sends(b"MAKE_COFFEE[2]\nGET_PROGRESS\n");
    let d = rig.bridge.dispatcher();
    assert_eq!(
        d.poll_once(),
        Poll::Dispatched(Err(Error::Protocol(ProtocolError::UnknownVerb)))
    );
    assert_eq!(d.poll_once(), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "Progress:0\n");
}

#[test]
fn frames_split_across_bursts_in_order() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.companion_sends(b"GET_NOZZLE_TEMP\r\nGET_BED_TEMP\r\n\r\nGET_FILAMENT_WEIGHT");
    let d = rig.bridge.dispatcher();
    for _ in 0..3 {
        assert_eq!(d.poll_once(), Poll::Dispatched(Ok(())));
    }
    assert_eq!(
        rig.take_replies(),
        "NozzleTemp:0\nBedTemp:0\nFilamentWeight:640\n"
    );
}

#[test]
fn unterminated_argument_is_malformed() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(
        rig.command("SET_NOZZLE_TEMP[200"),
        Poll::Dispatched(Err(Error::Protocol(ProtocolError::MalformedArgument)))
    );
    assert_eq!(
        rig.command("SET_BED_TEMP[warm]"),
        Poll::Dispatched(Err(Error::Protocol(ProtocolError::MalformedArgument)))
    );
    assert!(rig.printer.lines().is_empty());
}

#[test]
fn setpoints_are_clamped_and_forwarded() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(rig.command("SET_NOZZLE_TEMP[999]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("SET_BED_TEMP[60]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("SET_BED_TEMP[-5]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.printer.lines(), ["M104 S280", "M140 S60", "M140 S0"]);
    assert_eq!(rig.bridge.params().snapshot().nozzle_target, 280);
}

#[test]
fn home_sends_g28() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(rig.command("GO_HOME"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.printer.lines(), ["G28"]);
}

#[test]
fn filament_weight_reads_sensor() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.weight.set(712);
    assert_eq!(rig.command("GET_FILAMENT_WEIGHT"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "FilamentWeight:712\n");
    assert!(rig.status.contains(&StatusEvent::FilamentWeight(712)));
}

#[test]
fn file_listing_skips_hidden_and_directories() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.store.insert("benchy.gcode", b"G28\n");
    rig.store.insert("cube.gcode", b"G28\n");
    rig.store.insert_flagged("trash.gcode", b"x", true, false);
    rig.store.insert_flagged("System Volume", b"x", false, true);
    rig.store.add_dir("models");

    assert_eq!(rig.command("GET_ALL_FILES"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "Files:benchy.gcode cube.gcode\n");
    assert!(rig.status.contains(&StatusEvent::FilesListed(2)));
}

#[test]
fn file_listing_empty_and_failing_store() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(rig.command("GET_ALL_FILES"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "Files:NoFiles\n");

    rig.store.set_fail_list(true);
    assert_eq!(
        rig.command("GET_ALL_FILES"),
        Poll::Dispatched(Err(Error::Storage(StorageError::IoError)))
    );
    assert_eq!(rig.take_replies(), "Files:Error\n");
}

#[test]
fn wifi_status_moves_companion_link() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(rig.bridge.links().companion(), CompanionState::Init);
    assert_eq!(rig.command("WIFI_STATUS[110.0.0.7]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);
    assert_eq!(rig.command("WIFI_STATUS[0]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Init);
    assert_eq!(
        rig.command("WIFI_STATUS[]"),
        Poll::Dispatched(Err(Error::Protocol(ProtocolError::MalformedArgument)))
    );
}

#[test]
fn queries_answer_from_cache_without_printer_traffic() {
    let script: Script = Arc::new(|_| vec![Reply::at(0, "ok T:199.0 /200.0 B:61.0 /60.0\n")]);
    let rig = Rig::new(&test_config(), script);
    // Populate the cache the way the poller does.
    let _ = rig.bridge.telemetry().tick();
    let before = rig.printer.len();

    assert_eq!(rig.command("GET_NOZZLE_TEMP"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("GET_BED_TEMP"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "NozzleTemp:199\nBedTemp:61\n");
    assert_eq!(rig.printer.len(), before);
}
