//! Prompt builders, one module per call shape.

pub mod item_summary;
pub mod monolithic;
