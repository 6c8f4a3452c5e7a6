pub mod engine;

pub use engine::AggregationEngine;
