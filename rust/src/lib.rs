//! Voice-triggered OSC command dispatch shared by the `oscvoice` binary and tests.

pub mod chatbox;
pub mod command;
pub mod config;
pub mod engine;
pub mod executor;
pub mod inbound;
mod lock;
pub mod matcher;
pub mod osc;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod scope;
pub mod sink;
pub mod state;
mod telemetry;

pub use engine::{DispatchReport, Engine};
pub use telemetry::init_tracing;
