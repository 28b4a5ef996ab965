mod aligner;

pub use aligner::Aligner;
