//! Mock implementations for testing

mod storage;

pub use storage::FlakyStorage;
