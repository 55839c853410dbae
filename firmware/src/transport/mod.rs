//! Framed byte channels over UART + DMA.
//!
//! ```text
//!             ┌──────────────────── one per link ───────────────────┐
//!   UART RX ─▶│ RxChannel ── BufferPool ── RxRoute ──▶ consumer queue │
//!   UART TX ◀─│ TxChannel ── transmit lock ── send buffer            │
//!             └──────────────────────────────────────────────────────┘
//! ```
//!
//! | Module  | Role                                                |
//! |---------|-----------------------------------------------------|
//! | `pool`  | fixed receive buffers with single ownership         |
//! | `rx`    | idle-line handling, buffer swap, drop counters      |
//! | `route` | companion (commands / file data) and printer routes |
//! | `tx`    | per-link serialized, completion-released send       |
//! | `uart`  | hardware seam (`UartPort`, `TxDone`)                |

pub mod pool;
pub mod route;
pub mod rx;
pub mod tx;
pub mod uart;

pub use pool::{BufferPool, PooledBuffer};
pub use route::{CompanionRoute, PrinterRoute, ReplyQueue};
pub use rx::{RxChannel, RxRoute, RxStats, RxStatsSnapshot};
pub use tx::TxChannel;
pub use uart::{TxDone, UartError, UartPort};
