//! This crate contains helpers shared between the manifest-source engine and the
//! binaries hosting it.

pub mod yaml;
