//! Storage backend implementations

mod memory;
mod mounted;

pub use memory::MemoryStorage;
pub use mounted::MountedStorage;
