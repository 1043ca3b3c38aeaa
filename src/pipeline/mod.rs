//! The checkpointed handout pipeline.
//!
//! - `ledger`: durable record of which stages are complete and where their artifacts live
//! - `coordinator`: stage sequencing, artifact I/O and reset over one ledger
//! - `runner`: executes the incomplete stages with the configured agents

pub mod coordinator;
pub mod ledger;
pub mod runner;

pub use coordinator::{Coordinator, INTERMEDIATE_DIR};
pub use ledger::{Ledger, LedgerKey, LedgerRecord};
pub use runner::{HandoutRunner, LessonContext, RunOptions, RunSummary};
