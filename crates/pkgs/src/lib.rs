//! `git-pkgs`: indexes package-dependency evolution out of git commit
//! history into a local SQLite store, then answers point-in-time and
//! historical queries against it. This crate hosts C0 (CLI/process
//! wiring), C5 (indexer), C6 (updater), C7 (reconstructor), and C8 (query
//! surface); the repository gateway, manifest adapters, analyzer, store,
//! and progress sink each live in their own crate.

pub mod blob_source;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod indexer;
pub mod output;
pub mod queries;
pub mod reconstructor;
pub mod signals;
pub mod textconv;
pub mod updater;
pub mod workingtree;
