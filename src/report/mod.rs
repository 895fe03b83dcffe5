//! Report rendering.

mod generator;

pub use generator::{generate_json_report, generate_social_markdown, generate_window_markdown};
