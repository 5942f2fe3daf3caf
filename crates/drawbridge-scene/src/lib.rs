//! Scene document model and host capability interface for Drawbridge.

pub mod color;
pub mod document;
pub mod host;
pub mod node;
