//! Configuration, logging and CLI plumbing shared by the SeriesQL binary.

pub mod cli;
pub mod config;

pub use config::Configuration;
