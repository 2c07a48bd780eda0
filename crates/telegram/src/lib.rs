//! Notification sinks for funding-rate alerts.
//!
//! - [`TelegramSink`]: posts HTML messages to one chat, one forum thread per tier
//! - [`LogSink`]: writes alerts to the log only

pub mod log_sink;
pub mod telegram;

pub use log_sink::LogSink;
pub use telegram::{TelegramSink, TierThreads};
