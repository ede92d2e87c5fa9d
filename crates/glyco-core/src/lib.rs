//! Core types and trait definitions for the Glyco star-schema loader.
//!
//! This crate is deliberately free of database dependencies. Storage backends
//! implement [`store::StarStore`]; the ETL crate drives them through it.

pub mod dimension;
pub mod fact;
pub mod record;
pub mod store;
