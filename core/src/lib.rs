pub mod action;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod grading;
pub mod sandbox;
pub mod style;
pub mod testing;

#[cfg(test)]
mod testutil;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
