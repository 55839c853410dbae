//! Named task spawning and single-instance task slots.
//!
//! Every long-running activity (dispatcher, transfer engine, print
//! streamer, parameter poller) runs as its own thread with an explicit
//! name, priority and stack size recorded in a [`TaskSpec`]. On the MCU
//! target the priority maps onto the RTOS task priority; the host build
//! keeps the stack size and name and ignores the priority.
//!
//! [`TaskSlot`] enforces "at most one instance" for the transfer and print
//! tasks: it holds the join handle of the live task and refuses a second
//! start while the first has not finished.

use std::cell::RefCell;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::sync::sleep;

/// Static attributes of a controller task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    pub const DISPATCHER: Self = Self {
        name: "cmd-dispatch",
        priority: 5,
        stack_kb: 8,
    };
    pub const TRANSFER: Self = Self {
        name: "file-recv",
        priority: 6,
        stack_kb: 8,
    };
    pub const PRINT: Self = Self {
        name: "gcode-stream",
        priority: 4,
        stack_kb: 8,
    };
    pub const TELEMETRY: Self = Self {
        name: "param-poll",
        priority: 2,
        stack_kb: 4,
    };
}

/// Spawn a named task. Creation failure is reported, never panics.
pub fn spawn_task<T, F>(spec: TaskSpec, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    info!(
        "Spawning '{}' (sim, pri={} ignored, stack={}KB)",
        spec.name, spec.priority, spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.name.into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            warn!("task '{}' creation failed: {}", spec.name, e);
            Error::Task(spec.name)
        })
}

// ── Single-instance slot ──────────────────────────────────────

/// Holds the handle of at most one live task of a kind.
pub struct TaskSlot<T> {
    name: &'static str,
    handle: Mutex<CriticalSectionRawMutex, RefCell<Option<JoinHandle<T>>>>,
}

impl<T> TaskSlot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(RefCell::new(None)),
        }
    }

    /// `true` while a spawned task has not yet returned.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock(|h| h.borrow().as_ref().is_some_and(|j| !j.is_finished()))
    }

    /// `true` while the slot holds a handle, finished or not.
    pub fn is_occupied(&self) -> bool {
        self.handle.lock(|h| h.borrow().is_some())
    }

    /// Start a task via `spawn` unless one is still running.
    ///
    /// A finished-but-unjoined predecessor is reaped first and its result
    /// discarded.
    pub fn start(&self, spawn: impl FnOnce() -> Result<JoinHandle<T>>) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning(self.name));
        }
        if let Some(old) = self.take() {
            // Already finished, so this does not block.
            if old.join().is_err() {
                warn!("{}: previous task panicked", self.name);
            }
        }
        let handle = spawn()?;
        self.handle.lock(|h| *h.borrow_mut() = Some(handle));
        Ok(())
    }

    /// Remove the handle from the slot without joining.
    pub fn take(&self) -> Option<JoinHandle<T>> {
        self.handle.lock(|h| h.borrow_mut().take())
    }

    /// Poll for task termination up to `retries` times, `period` apart, then
    /// join it. Returns `None` if the slot is empty, the task is still alive
    /// after the last poll, or it panicked.
    pub fn join_within(&self, period: Duration, retries: u32) -> Option<T> {
        if !self.is_occupied() {
            return None;
        }
        let mut polls = 0;
        while self.is_running() {
            if polls >= retries {
                warn!("{}: still running after {} polls", self.name, polls);
                return None;
            }
            sleep(period);
            polls += 1;
        }
        let handle = self.take()?;
        match handle.join() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("{}: task panicked", self.name);
                None
            }
        }
    }
}
