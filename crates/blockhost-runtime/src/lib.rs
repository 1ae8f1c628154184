//! Process runtime for blockhost: spawning, log capture, shutdown and the
//! server registry, plus in-process adapters for the core ports.
#![deny(unsafe_code)]

pub mod process;
pub mod store;

pub use process::{
    LogBuffer, LogFileReader, LogSink, ProcessHandle, ServerRegistry, StopOutcome, StopProtocol,
    TokioBroadcaster, TopicEvent,
};
pub use store::MemoryConfigStore;
