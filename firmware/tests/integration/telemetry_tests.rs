//! Periodic parameter polling against the scripted printer.

use std::sync::Arc;
use std::time::Duration;

use printbridge::app::events::StatusEvent;
use printbridge::dispatcher::Poll;
use printbridge::print::TempQuery;

use crate::mock_link::{Reply, Rig, Script, test_config, wait_until};

fn m105_reporter() -> Script {
    Arc::new(|line| match line {
        "M105" => vec![Reply::at(5, "ok T:201.3 /205.0 B:59.8 /60.0\n")],
        // Homing is left hanging so a job can hold the link.
        "G28" => Vec::new(),
        _ => vec![Reply::ok()],
    })
}

#[test]
fn idle_tick_queries_printer_and_publishes() {
    let rig = Rig::new(&test_config(), m105_reporter());
    let report = rig.bridge.telemetry().tick();

    assert_eq!(report.temp_query, Some(TempQuery::Updated));
    assert!(report.weight_read);
    assert!(!report.job_published);
    assert_eq!(rig.printer.lines(), ["M105"]);
    assert!(rig.status.contains(&StatusEvent::Temperatures { nozzle: 201, bed: 59 }));
    assert!(rig.status.contains(&StatusEvent::FilamentWeight(640)));
}

#[test]
fn silent_printer_is_a_missed_reply() {
    let silent: Script = Arc::new(|_: &str| Vec::new());
    let rig = Rig::new(&test_config(), silent);
    let report = rig.bridge.telemetry().tick();
    assert_eq!(report.temp_query, Some(TempQuery::NoReply));
    // The last known values are still published.
    assert!(rig.status.contains(&StatusEvent::Temperatures { nozzle: 0, bed: 0 }));
}

#[test]
fn printing_publishes_job_and_leaves_link_alone() {
    let rig = Rig::new(&test_config(), m105_reporter());
    rig.store.insert("job.gcode", b";TIME:600\nG28\nG1 X1\n");
    assert_eq!(rig.command("START_PRINT[job.gcode]"), Poll::Dispatched(Ok(())));
    assert!(wait_until(Duration::from_secs(2), || rig.printer.len() == 1));

    let report = rig.bridge.telemetry().tick();
    assert_eq!(report.temp_query, None);
    assert!(report.job_published);
    assert!(!rig.printer.lines().iter().any(|l| l == "M105"));
    assert!(
        rig.status
            .events()
            .iter()
            .any(|e| matches!(e, StatusEvent::RemainingTime(_)))
    );

    assert_eq!(rig.command("STOP_PRINT"), Poll::Dispatched(Ok(())));
    assert!(
        rig.bridge
            .print_service()
            .join_job(embassy_time::Duration::from_millis(5), 1_000)
            .is_some()
    );
}

#[test]
fn upload_in_progress_skips_load_cell() {
    let rig = Rig::new(&test_config(), m105_reporter());
    assert_eq!(rig.command("START_TRANSMISSION"), Poll::Dispatched(Ok(())));
    let report = rig.bridge.telemetry().tick();
    assert!(!report.weight_read);
    assert_eq!(report.temp_query, Some(TempQuery::Updated));
}
