//! G-code streaming under the ack/timeout protocol, driven through the
//! dispatcher against a scripted printer.

use std::sync::Arc;
use std::time::Duration;

use printbridge::app::events::{MachineStatus, StatusEvent};
use printbridge::app::ports::StorageError;
use printbridge::dispatcher::Poll;
use printbridge::error::{Error, PrintError};
use printbridge::link_state::{CompanionState, PrinterState};
use printbridge::print::{JobOutcome, JobReport};

use crate::mock_link::{Reply, Rig, Script, ack_all, test_config, wait_until};

const SETTLE: Duration = Duration::from_secs(3);

fn finish(rig: &Rig) -> JobReport {
    rig.bridge
        .print_service()
        .join_job(embassy_time::Duration::from_millis(5), 2_000)
        .expect("job did not finish")
}

fn ack_after(ms: u64) -> Script {
    Arc::new(move |_| vec![Reply::at(ms, "ok\n")])
}

fn numbered_lines(n: usize) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..n {
        body.push_str(&format!("G1 X{i} Y{i}\n"));
        if i % 5 == 0 {
            body.push_str("; layer change\n\n");
        }
    }
    body.into_bytes()
}

// ── Scenario C ────────────────────────────────────────────────

#[test]
fn header_estimate_scales_with_progress() {
    // 35 bytes up to and including the M190 line, 35 bytes after it.
    let body = b";Print time: 01:02:03\nG28\nM190 S60\nG1 X10\nG1 X10\nG1 X10\nG1 X10\nG1 X10\n";
    assert_eq!(body.len(), 70);
    let script: Script = Arc::new(|line| {
        if line.starts_with("M190") {
            vec![Reply::at(400, "ok\n")]
        } else {
            vec![Reply::ok()]
        }
    });
    let rig = Rig::new(&test_config(), script);
    rig.store.insert("c.gcode", body);

    assert_eq!(rig.command("START_PRINT[c.gcode]"), Poll::Dispatched(Ok(())));

    let params = rig.bridge.params().clone();
    let mut halfway = None;
    assert!(wait_until(SETTLE, || {
        let s = params.snapshot();
        if s.progress == 50 {
            halfway = Some(s);
        }
        halfway.is_some()
    }));
    let s = halfway.unwrap();
    assert_eq!(s.initial_secs, 3723);
    assert!((1861..=1862).contains(&s.remaining_secs), "{}", s.remaining_secs);

    let report = finish(&rig);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.lines_sent, 7);
    assert_eq!(report.ack_timeouts, 0);

    rig.take_replies();
    assert_eq!(rig.command("GET_PROGRESS"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("GET_REMAINING_TIME"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.take_replies(), "Progress:100\nRemainingTime:0\n");
}

// ── Scenario D ────────────────────────────────────────────────

#[test]
fn blocking_line_waits_long_and_absorbs_telemetry() {
    let script: Script = Arc::new(|line| {
        if line.starts_with("G28") {
            vec![
                Reply::at(50, "T:150.0 /200.0 B:50.0 /60.0\n"),
                Reply::at(150, "T:180.0 /200.0 B:55.0 /60.0\n"),
                Reply::at(300, "ok\n"),
            ]
        } else {
            // Standard lines are never acknowledged.
            Vec::new()
        }
    });
    let rig = Rig::new(&test_config(), script);
    rig.store.insert("d.gcode", b"G28\nG1 X10\n");

    assert_eq!(rig.command("START_PRINT[d.gcode]"), Poll::Dispatched(Ok(())));
    let report = finish(&rig);

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.lines_sent, 2);
    assert_eq!(report.ack_timeouts, 1, "only the standard line times out");

    let sent = rig.printer.entries();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].text, "G28");
    let blocking_wait = sent[1].at - sent[0].at;
    assert!(
        blocking_wait >= Duration::from_millis(250),
        "blocking line gave up after {blocking_wait:?}"
    );
    // 100 ms standard timeout, far below the 2 s blocking one.
    assert!(sent[1].at.elapsed() < Duration::from_millis(1_500));

    let params = rig.bridge.params();
    assert_eq!((params.nozzle_temp(), params.bed_temp()), (180, 55));
}

// ── Comments ──────────────────────────────────────────────────

#[test]
fn long_comments_never_reach_the_printer() {
    let mut body = String::from("G28\n; settings = ");
    body.push_str(&"x".repeat(150));
    body.push_str("\nG1 X1 ; ");
    body.push_str(&"y".repeat(140));
    body.push('\n');

    let rig = Rig::new(&test_config(), ack_all());
    rig.store.insert("cfg.gcode", body.as_bytes());
    assert_eq!(rig.command("START_PRINT[cfg.gcode]"), Poll::Dispatched(Ok(())));

    let report = finish(&rig);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.lines_sent, 2);
    assert_eq!(rig.printer.lines(), ["G28", "G1 X1"]);
}

// ── Pause / resume / stop ─────────────────────────────────────

#[test]
fn pause_then_resume_sends_the_same_lines() {
    let body = numbered_lines(20);

    let reference = Rig::new(&test_config(), ack_after(5));
    reference.store.insert("p.gcode", &body);
    assert_eq!(reference.command("START_PRINT[p.gcode]"), Poll::Dispatched(Ok(())));
    assert_eq!(finish(&reference).outcome, JobOutcome::Completed);

    let rig = Rig::new(&test_config(), ack_after(5));
    rig.store.insert("p.gcode", &body);
    assert_eq!(rig.command("START_PRINT[p.gcode]"), Poll::Dispatched(Ok(())));
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(rig.command("PAUSE_PRINT"), Poll::Dispatched(Ok(())));
    std::thread::sleep(Duration::from_millis(30));
    let held = rig.printer.len();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(rig.printer.len(), held, "lines sent while paused");
    assert!(rig.status.contains(&StatusEvent::Status(MachineStatus::Paused)));

    assert_eq!(rig.command("PAUSE_PRINT"), Poll::Dispatched(Ok(())));
    let report = finish(&rig);
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(rig.printer.lines(), reference.printer.lines());
    assert_eq!(report.lines_sent, 20);
}

#[test]
fn progress_never_decreases_and_ends_at_100() {
    let rig = Rig::new(&test_config(), ack_after(2));
    rig.store.insert("m.gcode", &numbered_lines(40));
    assert_eq!(rig.command("START_PRINT[m.gcode]"), Poll::Dispatched(Ok(())));

    let params = rig.bridge.params().clone();
    let mut samples = Vec::new();
    while rig.bridge.print_service().is_printing() {
        samples.push(params.progress());
        std::thread::sleep(Duration::from_millis(1));
    }
    let report = finish(&rig);
    samples.push(params.progress());

    assert_eq!(report.outcome, JobOutcome::Completed);
    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{samples:?}");
    assert_eq!(samples.last(), Some(&100));
}

#[test]
fn stop_ends_job_and_parks_printer() {
    let rig = Rig::new(&test_config(), ack_after(5));
    rig.store.insert("s.gcode", &numbered_lines(40));
    assert_eq!(rig.command("START_PRINT[s.gcode]"), Poll::Dispatched(Ok(())));
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(rig.command("STOP_PRINT"), Poll::Dispatched(Ok(())));
    let report = finish(&rig);

    assert_eq!(report.outcome, JobOutcome::Stopped);
    assert!(report.lines_sent < 40);
    assert!(rig.bridge.params().progress() < 100);
    let lines = rig.printer.lines();
    assert!(lines.iter().any(|l| l == "M104 S0"));
    assert!(lines.iter().any(|l| l == "M140 S0"));
    assert_eq!(rig.bridge.links().printer(), PrinterState::Idle);
    assert_eq!(rig.bridge.links().companion(), CompanionState::Idle);
}

#[test]
fn print_cleanup_leaves_an_open_upload_busy() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(rig.command("WIFI_STATUS[1192.168.4.20]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("START_TRANSMISSION"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Busy);

    rig.store.insert("u.gcode", b"G28\nG1 X1\n");
    assert_eq!(rig.command("START_PRINT[u.gcode]"), Poll::Dispatched(Ok(())));
    assert_eq!(finish(&rig).outcome, JobOutcome::Completed);
    assert_eq!(rig.bridge.links().companion(), CompanionState::Busy);

    assert_eq!(rig.command("STOP_PRINT"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.bridge.links().companion(), CompanionState::Busy);
    assert_eq!(rig.bridge.links().printer(), PrinterState::Idle);
}

#[test]
fn emergency_stop_latches_error_until_stop() {
    let rig = Rig::new(&test_config(), ack_after(5));
    rig.store.insert("e.gcode", &numbered_lines(40));
    assert_eq!(rig.command("START_PRINT[e.gcode]"), Poll::Dispatched(Ok(())));
    std::thread::sleep(Duration::from_millis(15));

    assert_eq!(rig.command("EMERGENCY_STOP"), Poll::Dispatched(Ok(())));
    assert_eq!(finish(&rig).outcome, JobOutcome::Stopped);
    assert!(rig.printer.lines().iter().any(|l| l == "M112"));
    assert_eq!(rig.bridge.links().printer(), PrinterState::Error);

    assert_eq!(
        rig.command("START_PRINT[e.gcode]"),
        Poll::Dispatched(Err(Error::Print(PrintError::PrinterFault)))
    );

    assert_eq!(rig.command("STOP_PRINT"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.bridge.links().printer(), PrinterState::Idle);
    assert_eq!(rig.command("START_PRINT[e.gcode]"), Poll::Dispatched(Ok(())));
    assert_eq!(rig.command("STOP_PRINT"), Poll::Dispatched(Ok(())));
    assert_eq!(finish(&rig).outcome, JobOutcome::Stopped);
}

#[test]
fn second_start_rejected_while_printing() {
    // G28 is never acknowledged, so the job sits in its blocking wait.
    let script: Script = Arc::new(|line| {
        if line.starts_with("G28") { Vec::new() } else { vec![Reply::ok()] }
    });
    let rig = Rig::new(&test_config(), script);
    rig.store.insert("one.gcode", b"G28\nG1 X1\n");
    rig.store.insert("two.gcode", b"G1 X2\n");

    assert_eq!(rig.command("START_PRINT[one.gcode]"), Poll::Dispatched(Ok(())));
    assert!(wait_until(SETTLE, || rig.printer.len() == 1));
    assert_eq!(
        rig.command("START_PRINT[two.gcode]"),
        Poll::Dispatched(Err(Error::AlreadyRunning("print")))
    );
    assert_eq!(rig.bridge.links().printer(), PrinterState::Busy);

    assert_eq!(rig.command("STOP_PRINT"), Poll::Dispatched(Ok(())));
    let report = finish(&rig);
    assert_eq!(report.file_name.as_str(), "one.gcode");
    assert_eq!(report.outcome, JobOutcome::Stopped);
    assert!(!rig.printer.lines().iter().any(|l| l == "G1 X2"));
}

#[test]
fn start_rejects_bad_selections() {
    let rig = Rig::new(&test_config(), ack_all());
    rig.store.insert("empty.gcode", b"");

    assert_eq!(
        rig.command("START_PRINT"),
        Poll::Dispatched(Err(Error::Print(PrintError::EmptySelection)))
    );
    assert_eq!(
        rig.command("START_PRINT[empty.gcode]"),
        Poll::Dispatched(Err(Error::Print(PrintError::EmptyFile)))
    );
    assert_eq!(
        rig.command("START_PRINT[missing.gcode]"),
        Poll::Dispatched(Err(Error::Storage(StorageError::NotFound)))
    );
    assert_eq!(rig.bridge.links().printer(), PrinterState::Idle);
    assert!(rig.printer.lines().is_empty());
}

#[test]
fn pause_without_job_is_rejected() {
    let rig = Rig::new(&test_config(), ack_all());
    assert_eq!(
        rig.command("PAUSE_PRINT"),
        Poll::Dispatched(Err(Error::Print(PrintError::NotPrinting)))
    );
}
