//! Concurrency building blocks shared by every engine
//!
//! - [`queue`]: stoppable FIFO message queue
//! - [`observer`]: observer/subject fan-out
//! - [`engine`]: threaded worker with a start/stop lifecycle
//! - [`resource`]: threaded worker that notifies observers of each message

pub mod engine;
pub mod observer;
pub mod queue;
pub mod resource;

pub use engine::{
    EngineError, EngineHandler, EngineResult, EngineSettings, EngineStatus, PopMode,
    ThreadedEngine, DEFAULT_TICK_INTERVAL,
};
pub use observer::{Observer, ObserverError, Subject};
pub use queue::{MessageQueue, QueueError};
pub use resource::{MessageProcessor, ResourceEngine};
