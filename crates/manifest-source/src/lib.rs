//! Schema-driven projection of partial resource configuration into canonical manifests.
//!
//! A [`ResourceSchema`](schema::ResourceSchema) describes which attributes of one resource kind
//! can be configured. Raw input is [accepted](config::accept) against it, yielding a typed tree in
//! which every node is explicitly absent or present, or the complete list of validation errors.
//! The accepted tree is [projected](projection::project) into a [`Document`](projection::Document)
//! that only contains what was configured, prefixed with the fixed identity of the resource kind,
//! and finally [serialized](projection::serialize) as YAML.
//!
//! [`pipeline::render`] runs all stages in one call. The [`catalog`] module ships descriptor
//! tables for a set of resource kinds and loads additional tables supplied as data.

pub mod catalog;
pub mod config;
pub mod kvp;
pub mod pipeline;
pub mod projection;
pub mod schema;
pub mod validation;

// Internal re-exports
pub use manifest_source_shared as shared;
