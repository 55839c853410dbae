//! Companion-link command dispatcher.
//!
//! ```text
//!  ┌────────────┐ CommandFrame ┌──────────────────────────┐
//!  │ RX route   │─────────────▶│ Dispatcher               │
//!  │ (ISR)      │  queue (10)  │  parse → table lookup →  │
//!  └────────────┘              │  handler → response      │──▶ companion TX
//!                              └──────────────────────────┘
//! ```
//!
//! The bounded wait on the command queue doubles as the housekeeping tick
//! when the link is quiet. Handler failures are logged and never stop the
//! loop.

pub mod command;
pub mod registry;

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_time::Duration;
use log::{debug, info, warn};

use crate::error::{ProtocolError, Result};
use crate::transport::tx::TxChannel;
use command::{CommandQueue, Response, RESPONSE_SIZE, VerbKind, parse_frame};
use registry::HandlerRegistry;

/// Outcome of one dispatcher poll.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    /// A frame was processed with this result.
    Dispatched(Result<()>),
    /// The queue wait expired; housekeeping ran.
    Idle,
}

type Housekeeping = Box<dyn Fn() + Send + Sync>;

pub struct Dispatcher {
    commands: Arc<CommandQueue>,
    registry: HandlerRegistry,
    reply: Arc<TxChannel>,
    wait: Duration,
    housekeeping: Option<Housekeeping>,
}

impl Dispatcher {
    pub fn new(
        commands: Arc<CommandQueue>,
        registry: HandlerRegistry,
        reply: Arc<TxChannel>,
        wait: Duration,
    ) -> Self {
        for verb in registry.unbound() {
            warn!("DISPATCH: no handler for {}", verb.wire());
        }
        Self {
            commands,
            registry,
            reply,
            wait,
            housekeeping: None,
        }
    }

    /// Run `f` on every idle tick.
    pub fn with_housekeeping(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.housekeeping = Some(Box::new(f));
        self
    }

    /// Parse one frame, run its handler and send any response.
    pub fn dispatch(&self, frame: &str) -> Result<()> {
        let (verb, args) = parse_frame(frame)?;
        let Some(handler) = self.registry.get(verb) else {
            return Err(ProtocolError::UnknownVerb.into());
        };
        debug!("DISPATCH: {} [{}]", verb.wire(), args);

        match verb.kind() {
            VerbKind::Notification => handler.handle(verb, args, None),
            VerbKind::Query => {
                let mut response = Response::new();
                let res = handler.handle(verb, args, Some(&mut response));
                if response.is_empty() {
                    warn!("DISPATCH: {} produced no response", verb.wire());
                } else {
                    self.respond(&response);
                }
                res
            }
        }
    }

    fn respond(&self, response: &str) {
        let mut out: heapless::Vec<u8, { RESPONSE_SIZE + 1 }> = heapless::Vec::new();
        // Response is bounded by RESPONSE_SIZE, so both fit.
        let _ = out.extend_from_slice(response.as_bytes());
        let _ = out.push(b'\n');
        if let Err(e) = self.reply.send(&out) {
            warn!("DISPATCH: response '{}' not sent: {}", response, e);
        }
    }

    /// Wait once on the command queue and process what arrives.
    pub fn poll_once(&self) -> Poll {
        match self.commands.recv_timeout(self.wait) {
            Some(frame) => {
                let res = self.dispatch(&frame);
                if let Err(e) = res {
                    warn!("DISPATCH: '{}' failed: {}", frame, e);
                }
                Poll::Dispatched(res)
            }
            None => {
                if let Some(tick) = &self.housekeeping {
                    tick();
                }
                Poll::Idle
            }
        }
    }

    /// Dispatch until `shutdown` is set.
    pub fn run(&self, shutdown: &AtomicBool) {
        info!("DISPATCH: running (wait={}ms)", self.wait.as_millis());
        while !shutdown.load(Ordering::Acquire) {
            let _ = self.poll_once();
        }
        info!("DISPATCH: stopped");
    }
}
