//! Verb → handler table.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  HandlerRegistry                             │
//! │  ┌──────────────────────┬──────────────────┐ │
//! │  │ Verb (as usize)      │ handler          │ │
//! │  ├──────────────────────┼──────────────────┤ │
//! │  │ WifiStatus           │ CompanionService │ │
//! │  │ StartTransmission    │ CompanionService │ │
//! │  │ ...                  │ ...              │ │
//! │  │ StartPrint           │ PrintService     │ │
//! │  │ ListFiles            │ PrintService     │ │
//! │  └──────────────────────┴──────────────────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Populated once at startup by each owning subsystem; lookups are a
//! direct array index.

use std::sync::Arc;

use log::warn;

use super::command::{Response, Verb};
use crate::error::Result;

/// A subsystem that serves one or more verbs.
///
/// Query verbs receive `Some(response)` and must always populate it, even
/// when they also return an error. Notification verbs receive `None`.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, verb: Verb, args: &str, response: Option<&mut Response>) -> Result<()>;
}

pub struct HandlerRegistry {
    table: [Option<Arc<dyn CommandHandler>>; Verb::COUNT],
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            table: core::array::from_fn(|_| None),
        }
    }

    /// Bind `verbs` to `handler`. Re-binding a verb replaces the previous
    /// handler.
    pub fn register(&mut self, verbs: &[Verb], handler: &Arc<dyn CommandHandler>) {
        for &verb in verbs {
            if self.table[verb.index()].is_some() {
                warn!("DISPATCH: {} re-registered", verb.wire());
            }
            self.table[verb.index()] = Some(Arc::clone(handler));
        }
    }

    pub fn get(&self, verb: Verb) -> Option<&Arc<dyn CommandHandler>> {
        self.table[verb.index()].as_ref()
    }

    /// Verbs without a handler.
    pub fn unbound(&self) -> impl Iterator<Item = Verb> + '_ {
        Verb::ALL
            .into_iter()
            .filter(|v| self.table[v.index()].is_none())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
