//! Test utilities and helpers for the doccol workspace.
//!
//! This crate provides:
//! - Data generation for synthetic, reproducible "record" documents
//! - Seeded in-memory collections built on `MemoryDriver`
//!
//! # Usage
//!
//! This crate is intended for use within the doccol test suites.

pub mod collection;
pub mod data_gen;
