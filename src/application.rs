//! Application layer - harvesting sessions and the multi-storefront supervisor
//!
//! Orchestrates the domain rules over the infrastructure services; each
//! module is its own file in the application/ directory.

pub mod checkpoint;
pub mod page_walker;
pub mod record_store;
pub mod session;
pub mod supervisor;
pub mod throttle;

pub use page_walker::{PageWalker, StopReason, WalkOutcome};
pub use record_store::{MergeSummary, RecordStore, merge};
pub use session::{FlushTrigger, HarvestError, HarvestSession, SessionContext, SessionReport, SessionStats, SessionStatus};
pub use supervisor::{HarvestUnit, RunSummary, Supervisor, UnitResult, UnitStatus};
pub use throttle::{NoPause, Pacer, PauseKind, RandomPacer};
