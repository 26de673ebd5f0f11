pub mod runner;
pub mod summary;

pub use runner::{run, run_with_config};
pub use summary::TransferSummary;
