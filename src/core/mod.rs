//! Core modules for the shotdeck engine.
//!
//! The versioned-asset repository, shot registry, and metadata store live
//! here, together with the shared primitives they sit on (ledger broker,
//! schemas, media classification, project layout).

pub mod broker;
pub mod db;
pub mod error;
pub mod layout;
pub mod media;
pub mod metadata;
pub mod output;
pub mod project;
pub mod prompt_import;
pub mod registry;
pub mod reveal;
pub mod schemas;
pub mod service;
pub mod thumbs;
pub mod time;
pub mod version_store;
