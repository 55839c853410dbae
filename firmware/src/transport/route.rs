//! Receive routes for the two links.

use std::sync::Arc;

use log::warn;

use super::pool::PooledBuffer;
use super::rx::{RxRoute, RxStats};
use crate::dispatcher::command::{CommandQueue, Verb, copy_frame, split_frames};
use crate::sync::Queue;
use crate::transfer::pipe::TransferPipe;

/// Depth of the printer reply queue.
pub const REPLY_QUEUE_DEPTH: usize = 4;

pub type ReplyQueue = Queue<PooledBuffer, REPLY_QUEUE_DEPTH>;

// ── Companion link ────────────────────────────────────────────

/// Companion traffic is command frames, except while a file body is being
/// received: then whole buffers go to the transfer engine, and only a
/// buffer opening with the transmission-complete verb is read as commands.
pub struct CompanionRoute {
    commands: Arc<CommandQueue>,
    pipe: Arc<TransferPipe>,
}

impl CompanionRoute {
    pub fn new(commands: Arc<CommandQueue>, pipe: Arc<TransferPipe>) -> Self {
        Self { commands, pipe }
    }

    fn route_commands(&self, buf: &PooledBuffer, stats: &RxStats) {
        for raw in split_frames(buf) {
            match copy_frame(raw) {
                Ok(frame) => {
                    if self.commands.try_send(frame).is_err() {
                        warn!("RX[companion]: command queue full, frame dropped");
                        stats.record_queue_full();
                    }
                }
                Err(e) => {
                    warn!("RX[companion]: frame discarded: {}", e);
                    stats.record_malformed();
                }
            }
        }
    }
}

impl RxRoute for CompanionRoute {
    fn route(&self, buf: PooledBuffer, stats: &RxStats) {
        let is_command = !self.pipe.is_receiving()
            || buf.starts_with(Verb::TransmissionComplete.wire().as_bytes());

        if is_command {
            self.route_commands(&buf, stats);
            // `buf` returns to the pool here; frames were copied out.
        } else if self.pipe.push_chunk(buf).is_err() {
            warn!("RX[companion]: file queue full, chunk dropped");
            stats.record_queue_full();
        }
    }
}

// ── Printer link ──────────────────────────────────────────────

/// Every printer reply goes to the streamer / telemetry reader.
pub struct PrinterRoute {
    replies: Arc<ReplyQueue>,
}

impl PrinterRoute {
    pub fn new(replies: Arc<ReplyQueue>) -> Self {
        Self { replies }
    }
}

impl RxRoute for PrinterRoute {
    fn route(&self, buf: PooledBuffer, stats: &RxStats) {
        if self.replies.try_send(buf).is_err() {
            warn!("RX[printer]: reply queue full, reply dropped");
            stats.record_queue_full();
        }
    }
}
