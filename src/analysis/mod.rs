//! Aggregation engine.
//!
//! Window merging for numeric observations and fan-out/reduce for the
//! social views.

mod aggregator;
mod social;
mod window;

pub use social::{SocialAggregator, SocialSettings};
pub use window::{WindowAggregator, DEFAULT_CAPACITY};
