//! Prefix-trie dictionary indexes and their incremental build.
//!
//! This crate provides:
//! - A generic prefix trie with exact lookup and prefix enumeration
//! - XML dictionary sources and per-pair index artifacts
//! - The build catalog describing every artifact
//! - A parallel orchestrator that rebuilds only stale pairs

pub mod builder;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lang;
pub mod orchestrator;
pub mod source;
pub mod trie;

// Re-export main types
pub use builder::{group_records, load_artifact, IndexBuilder, LemmaTrie, Sense};
pub use cancel::CancellationToken;
pub use catalog::{BuildCatalog, ResultDescriptor, CATALOG_PREFIX};
pub use config::{load_build_config, BuildConfig};
pub use error::{LexitrieError, Result};
pub use lang::LangPair;
pub use orchestrator::{clean_outputs, Orchestrator, RunReport, SkipReason};
pub use source::{LemmaRecord, SourceData, SourceReader, XmlSourceReader};
pub use trie::{Lookup, PrefixTrie};
