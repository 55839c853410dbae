//! Mock links for integration tests.
//!
//! A scripted printer that answers G-code lines on its own schedule, a
//! recording status sink, and a [`Rig`] that assembles a full bridge
//! around them with an in-memory file store.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use printbridge::adapters::mem_store::MemStore;
use printbridge::adapters::sim_uart::RecordingUart;
use printbridge::adapters::weight::FixedWeight;
use printbridge::app::events::StatusEvent;
use printbridge::app::ports::StatusSink;
use printbridge::bridge::{Bridge, BridgePorts};
use printbridge::config::SystemConfig;
use printbridge::dispatcher::Poll;
use printbridge::transport::route::PrinterRoute;
use printbridge::transport::rx::RxChannel;
use printbridge::transport::uart::{TxDone, UartError, UartPort};

// ── Printer script ────────────────────────────────────────────

/// One reply: `text` delivered `after` the line was sent.
#[derive(Debug, Clone)]
pub struct Reply {
    pub after: Duration,
    pub text: String,
}

impl Reply {
    pub fn ok() -> Self {
        Self::at(0, "ok\n")
    }

    pub fn at(ms: u64, text: &str) -> Self {
        Self {
            after: Duration::from_millis(ms),
            text: text.into(),
        }
    }
}

pub type Script = Arc<dyn Fn(&str) -> Vec<Reply> + Send + Sync>;

/// Every line acknowledged at once.
pub fn ack_all() -> Script {
    Arc::new(|_| vec![Reply::ok()])
}

/// A G-code line as the printer saw it, with its send time.
#[derive(Debug, Clone)]
pub struct SentLine {
    pub text: String,
    pub at: Instant,
}

#[derive(Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<SentLine>>>);

#[allow(dead_code)]
impl SentLog {
    pub fn lines(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|l| l.text.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<SentLine> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn push(&self, text: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentLine {
                text: text.into(),
                at: Instant::now(),
            });
    }
}

// ── ScriptedPrinter ───────────────────────────────────────────

pub struct ScriptedPrinter {
    rx: Arc<RxChannel<PrinterRoute>>,
    script: Script,
    log: SentLog,
}

impl ScriptedPrinter {
    pub fn new(rx: Arc<RxChannel<PrinterRoute>>, script: Script, log: SentLog) -> Self {
        Self { rx, script, log }
    }
}

impl UartPort for ScriptedPrinter {
    fn start_transmit(&mut self, data: &[u8], done: TxDone) -> Result<(), UartError> {
        let text = String::from_utf8_lossy(data).into_owned();
        done.complete();
        for line in text.lines().filter(|l| !l.is_empty()) {
            self.log.push(line);
            let replies = (self.script)(line);
            if replies.is_empty() {
                continue;
            }
            let rx = self.rx.clone();
            std::thread::spawn(move || {
                let start = Instant::now();
                for r in replies {
                    let due = start + r.after;
                    let now = Instant::now();
                    if due > now {
                        std::thread::sleep(due - now);
                    }
                    rx.on_idle_line(r.text.as_bytes());
                }
            });
        }
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn contains(&self, event: &StatusEvent) -> bool {
        self.events().contains(event)
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, event: &StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Fast timings for tests.
pub fn test_config() -> SystemConfig {
    SystemConfig {
        dispatcher_wait_ms: 20,
        ready_delay_ms: 0,
        file_wait_ms: 50,
        stall_limit: 3,
        teardown_poll_ms: 5,
        teardown_poll_retries: 400,
        ack_timeout_ms: 100,
        blocking_ack_timeout_ms: 2000,
        ack_poll_slice_ms: 5,
        pause_poll_ms: 2,
        eta_refresh_ms: 0,
        temp_query_timeout_ms: 100,
        ..SystemConfig::default()
    }
}

pub struct Rig {
    pub bridge: Bridge,
    pub store: Arc<MemStore>,
    pub companion: RecordingUart,
    pub printer: SentLog,
    pub status: Arc<RecordingSink>,
    pub weight: Arc<FixedWeight>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(cfg: &SystemConfig, script: Script) -> Self {
        let store = Arc::new(MemStore::new());
        let companion = RecordingUart::new();
        let printer = SentLog::default();
        let status = Arc::new(RecordingSink::default());
        let weight = Arc::new(FixedWeight::new(640));

        let log = printer.clone();
        let bridge = Bridge::new(
            cfg,
            BridgePorts {
                store: store.clone(),
                weight: weight.clone(),
                status: status.clone(),
                companion_uart: Box::new(companion.clone()),
            },
            move |rx| Box::new(ScriptedPrinter::new(rx, script, log)),
        );
        Self {
            bridge,
            store,
            companion,
            printer,
            status,
            weight,
        }
    }

    /// Deliver `bytes` on the companion link as one idle-line burst.
    pub fn companion_sends(&self, bytes: &[u8]) {
        self.bridge.companion_rx().on_idle_line(bytes);
    }

    /// Send one frame and dispatch it.
    pub fn command(&self, frame: &str) -> Poll {
        self.companion_sends(format!("{frame}\n").as_bytes());
        self.bridge.dispatcher().poll_once()
    }

    /// Companion-link output so far, cleared.
    pub fn take_replies(&self) -> String {
        String::from_utf8_lossy(&self.companion.take()).into_owned()
    }

    /// Wait until the companion link has carried `needle`.
    pub fn wait_for_reply(&self, needle: &str, within: Duration) -> bool {
        wait_until(within, || self.companion.text().contains(needle))
    }
}

/// Poll `cond` every millisecond until it holds or `within` expires.
pub fn wait_until(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
