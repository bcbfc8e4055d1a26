//! Built-in capability implementations.

pub mod access_log;
pub mod storage;

pub use access_log::{AccessLog, AccessLogCapability};
pub use storage::{StorageCapability, StorageEngine, StorageNamespace};
