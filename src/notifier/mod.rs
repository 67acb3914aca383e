pub mod catalog;
pub mod classifier;
pub mod dedup;
pub mod dispatch;
pub mod engine;
pub mod gate;
pub mod push;

pub use dispatch::Dispatcher;
pub use engine::{CycleOutcome, PollEngine};
pub use push::{ExpoPush, LogOnlyPush};
