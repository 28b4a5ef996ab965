//! Scriptable aligner for tests of downstream crates

pub mod mock;

pub use mock::{MockAligner, MockBehavior, MockRule};
