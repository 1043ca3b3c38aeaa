pub mod agent;
pub mod config;
pub mod credentials;
pub mod distill_config;
pub mod errors;
pub mod init;
pub mod logging;
pub mod materials;
pub mod pipeline;
pub mod prompts;
pub mod stage;
pub mod ui;

pub use errors::{AgentError, LedgerError, PipelineError};
pub use pipeline::{Coordinator, HandoutRunner, RunOptions};
pub use stage::Stage;
