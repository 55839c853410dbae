//! System assembly: links, queues, services and tasks.
//!
//! ```text
//!  companion UART ─▶ RxChannel<CompanionRoute> ─┬─▶ CommandQueue ─▶ Dispatcher ─┬─▶ CompanionService
//!                                               └─▶ TransferPipe ─▶ TransferEngine └─▶ PrintService
//!  printer UART   ─▶ RxChannel<PrinterRoute>   ───▶ ReplyQueue   ─▶ PrinterLink ◀── PrintStreamer
//!                                                                              ◀── TelemetryPoller
//! ```
//!
//! [`Bridge::new`] wires the object graph once at startup; [`Bridge::spawn`]
//! starts the dispatcher and telemetry tasks. The transfer and print tasks
//! are spawned on demand by their services.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::app::ports::{FileStore, StatusSink, WeightSensor};
use crate::app::events::{MachineStatus, StatusEvent};
use crate::config::{SystemConfig, millis};
use crate::dispatcher::Dispatcher;
use crate::dispatcher::command::CommandQueue;
use crate::dispatcher::registry::{CommandHandler, HandlerRegistry};
use crate::error::Result;
use crate::link_state::{LinkState, PrinterState};
use crate::print::link::PrinterLink;
use crate::print::params::PrinterParams;
use crate::print::service::PrintService;
use crate::print::streamer::PrintDeps;
use crate::tasks::{TaskSpec, spawn_task};
use crate::telemetry::TelemetryPoller;
use crate::transfer::engine::TransferDeps;
use crate::transfer::pipe::TransferPipe;
use crate::transfer::service::CompanionService;
use crate::transport::pool::BufferPool;
use crate::transport::route::{CompanionRoute, PrinterRoute, ReplyQueue};
use crate::transport::rx::RxChannel;
use crate::transport::tx::TxChannel;
use crate::transport::uart::UartPort;

/// Outside-world collaborators handed to the bridge.
pub struct BridgePorts {
    pub store: Arc<dyn FileStore>,
    pub weight: Arc<dyn WeightSensor>,
    pub status: Arc<dyn StatusSink>,
    pub companion_uart: Box<dyn UartPort>,
}

pub struct Bridge {
    companion_rx: Arc<RxChannel<CompanionRoute>>,
    printer_rx: Arc<RxChannel<PrinterRoute>>,
    links: Arc<LinkState>,
    params: Arc<PrinterParams>,
    companion: Arc<CompanionService>,
    print: Arc<PrintService>,
    dispatcher: Arc<Dispatcher>,
    telemetry: Arc<TelemetryPoller>,
    shutdown: Arc<AtomicBool>,
}

/// Handles of the always-on tasks.
pub struct BridgeTasks {
    shutdown: Arc<AtomicBool>,
    dispatcher: JoinHandle<()>,
    telemetry: JoinHandle<()>,
}

impl BridgeTasks {
    /// Signal shutdown and wait for both tasks.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Release);
        for (name, handle) in [("dispatcher", self.dispatcher), ("telemetry", self.telemetry)] {
            if handle.join().is_err() {
                warn!("BRIDGE: {} task panicked", name);
            }
        }
        info!("BRIDGE: stopped");
    }
}

impl Bridge {
    /// Build the object graph. `printer_uart` receives the printer receive
    /// channel so the UART's idle-line interrupt can be attached to it.
    pub fn new(
        cfg: &SystemConfig,
        ports: BridgePorts,
        printer_uart: impl FnOnce(Arc<RxChannel<PrinterRoute>>) -> Box<dyn UartPort>,
    ) -> Self {
        let BridgePorts {
            store,
            weight,
            status,
            companion_uart,
        } = ports;
        let lock_timeout = millis(cfg.tx_lock_timeout_ms);

        // ── Companion link ────────────────────────────────────
        let commands = Arc::new(CommandQueue::new());
        let pipe = Arc::new(TransferPipe::new());
        let companion_rx = Arc::new(RxChannel::new(
            "companion",
            BufferPool::new(),
            CompanionRoute::new(commands.clone(), pipe.clone()),
        ));
        let companion_tx = Arc::new(TxChannel::new("companion", companion_uart, lock_timeout));

        // ── Printer link ──────────────────────────────────────
        let replies = Arc::new(ReplyQueue::new());
        let printer_rx = Arc::new(RxChannel::new(
            "printer",
            BufferPool::new(),
            PrinterRoute::new(replies.clone()),
        ));
        let printer_tx = Arc::new(TxChannel::new(
            "printer",
            printer_uart(printer_rx.clone()),
            lock_timeout,
        ));

        let links = Arc::new(LinkState::new());
        let params = Arc::new(PrinterParams::new());
        let printer = Arc::new(PrinterLink::new(
            printer_tx,
            replies,
            params.clone(),
            millis(cfg.ack_poll_slice_ms),
        ));

        // ── Services ──────────────────────────────────────────
        let companion = Arc::new(CompanionService::new(
            cfg,
            TransferDeps {
                store: store.clone(),
                link: companion_tx.clone(),
                pipe,
                links: links.clone(),
                status: status.clone(),
            },
        ));
        let print = Arc::new(PrintService::new(
            cfg,
            PrintDeps {
                store,
                link: printer.clone(),
                params: params.clone(),
                links: links.clone(),
                status: status.clone(),
            },
            weight.clone(),
        ));

        let mut registry = HandlerRegistry::new();
        let handler: Arc<dyn CommandHandler> = companion.clone();
        registry.register(&CompanionService::VERBS, &handler);
        let handler: Arc<dyn CommandHandler> = print.clone();
        registry.register(&PrintService::VERBS, &handler);

        let (crx, prx) = (companion_rx.clone(), printer_rx.clone());
        let dispatcher = Dispatcher::new(
            commands,
            registry,
            companion_tx,
            millis(cfg.dispatcher_wait_ms),
        )
        .with_housekeeping(move || {
            let (c, p) = (crx.stats(), prx.stats());
            debug!(
                "RX: companion frames={} lost={} overflow={} | printer frames={} lost={} overflow={}",
                c.frames,
                c.lost(),
                c.overflow_bytes,
                p.frames,
                p.lost(),
                p.overflow_bytes
            );
        });

        let telemetry = Arc::new(TelemetryPoller::new(
            cfg,
            printer,
            params.clone(),
            links.clone(),
            weight,
            status.clone(),
        ));

        // Printer link is usable from boot; the companion stays in Init
        // until it reports a network.
        links.set_printer(PrinterState::Idle);
        status.emit(&StatusEvent::Status(MachineStatus::Idle));
        info!("BRIDGE: assembled");

        Self {
            companion_rx,
            printer_rx,
            links,
            params,
            companion,
            print,
            dispatcher: Arc::new(dispatcher),
            telemetry,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the dispatcher and telemetry tasks.
    pub fn spawn(&self) -> Result<BridgeTasks> {
        let (d, stop) = (self.dispatcher.clone(), self.shutdown.clone());
        let dispatcher = spawn_task(TaskSpec::DISPATCHER, move || d.run(&stop))?;

        let (t, stop) = (self.telemetry.clone(), self.shutdown.clone());
        let telemetry = match spawn_task(TaskSpec::TELEMETRY, move || t.run(&stop)) {
            Ok(h) => h,
            Err(e) => {
                // Commands still flow; only the periodic refresh is lost.
                warn!("BRIDGE: telemetry unavailable: {}", e);
                self.shutdown.store(true, Ordering::Release);
                let _ = dispatcher.join();
                return Err(e);
            }
        };

        Ok(BridgeTasks {
            shutdown: self.shutdown.clone(),
            dispatcher,
            telemetry,
        })
    }

    /// Feed bytes as if the companion UART had reported an idle line.
    pub fn companion_rx(&self) -> &Arc<RxChannel<CompanionRoute>> {
        &self.companion_rx
    }

    pub fn printer_rx(&self) -> &Arc<RxChannel<PrinterRoute>> {
        &self.printer_rx
    }

    pub fn links(&self) -> &Arc<LinkState> {
        &self.links
    }

    pub fn params(&self) -> &Arc<PrinterParams> {
        &self.params
    }

    pub fn companion_service(&self) -> &Arc<CompanionService> {
        &self.companion
    }

    pub fn print_service(&self) -> &Arc<PrintService> {
        &self.print
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn telemetry(&self) -> &Arc<TelemetryPoller> {
        &self.telemetry
    }
}
