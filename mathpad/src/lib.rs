//! mathpad
//!
//! Front-end pieces on top of `mathpad-core`:
//! - `MathpadConfig` - Core configuration plus evaluator endpoint settings
//! - `RemoteEvaluator` - Blocking HTTP client for the evaluation service
//! - `TerminalSink` - Render sink that writes markup to a terminal

pub mod config;
pub use config::MathpadConfig;

pub mod remote;
pub use remote::RemoteEvaluator;

pub mod terminal;
pub use terminal::{parse_line, TerminalSink};
