//! Manifest adapter: identifies a path as a
//! manifest/lockfile and parses its blob bytes into
//! `(ecosystem, kind, dependencies[])`. Deterministic, pure function of
//! `(path, bytes)`; no I/O lives in this crate.

pub mod adapter;
pub mod adapters;
pub mod error;
pub mod registry;

pub use adapter::EcosystemAdapter;
pub use error::ParseFailure;
pub use registry::{analyse, identify, AdapterRegistry};
