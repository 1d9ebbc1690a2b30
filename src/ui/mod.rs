//! Terminal presentation: event rendering and prompts

pub mod prompt;
pub mod render;
