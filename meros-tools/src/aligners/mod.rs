pub mod bwa;

pub use bwa::BwaAligner;
