//! The Glyco load job: reads the cleaned diabetes dataset and populates the
//! star schema through any [`StarStore`](glyco_core::store::StarStore).
//!
//! Stages run strictly in order and each one commits on its own:
//! schema, dimensions, patients, facts.

pub mod config;
pub mod connector;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod source;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
