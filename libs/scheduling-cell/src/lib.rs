pub mod clock;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::SchedulingEngine;
pub use error::{ErrorCategory, SchedulingError};
pub use store::{LedgerStore, LedgerTx, MemoryLedger, StoreError, SupabaseLedger};
