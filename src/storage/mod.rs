//! Storage modules: config, recent clips

pub mod config;
pub mod history;
