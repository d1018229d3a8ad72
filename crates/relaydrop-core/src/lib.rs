pub mod config;
pub mod logging;

pub mod destination;
pub mod error;
mod http;
pub mod job;
pub mod notify;
pub mod progress;
pub mod queue;
pub mod relay;
pub mod source;
pub mod store;
pub mod tracker;
pub mod worker;
