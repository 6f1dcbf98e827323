pub mod matching;
pub mod metrics;
