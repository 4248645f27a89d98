//! paperdrill-notion — Notion paper-database source.
//!
//! Implements the `PaperSource` trait over the Notion REST API: a
//! paginated database query for the paper list, then per-page block
//! children flattened into plain-text notes.

pub mod client;
pub mod model;

pub use client::NotionClient;
