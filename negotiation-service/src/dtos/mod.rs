//! Tool argument and result shapes exchanged with the orchestrator.

mod args;
mod views;

pub use args::*;
pub use views::*;
