//! Shared-storage backends receiving published alignment output

pub mod backend;
pub mod traits;

pub use backend::{MemoryStorage, MountedStorage};
pub use traits::SharedStorage;
