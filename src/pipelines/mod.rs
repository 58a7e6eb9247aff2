//! Render pipelines.

pub mod globe;
