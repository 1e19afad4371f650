//! # repochat
//!
//! Summarize a local repository file by file with a language model, keep
//! the summaries, and answer questions about the codebase from them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Directory  │──▶│  Ingestion  │──▶│  Store   │
//! │ scan+filter │   │ (summarize) │   │ SQLite / │
//! └─────────────┘   └──────┬──────┘   │ memory   │
//!                          │          └────┬─────┘
//!                          ▼               ▼
//!                    ┌──────────┐    ┌──────────┐
//!                    │  Gemini  │◀───│  Query   │
//!                    └──────────┘    │  router  │
//!                                    └──────────┘
//! ```
//!
//! Every "select repository" action starts a new session with fresh ids.
//! Summaries are namespaced by session, so questions only ever see the
//! files of the active repository.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assistant`] | Session lifecycle, processing flag, status line |
//! | [`completion`] | Completion service abstraction and Gemini client |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`error`] | Shared error types |
//! | [`filter`] | Excluded directories and suffixes |
//! | [`ingest`] | Per-file summarization pipeline |
//! | [`migrate`] | Schema creation |
//! | [`models`] | Core data types |
//! | [`progress`] | Ingestion progress reporters |
//! | [`prompt`] | Intent classification and prompt templates |
//! | [`query`] | Context assembly and answering |
//! | [`session`] | Ids, greeting, transcript ownership |
//! | [`source`] | Source file abstraction and directory scan |
//! | [`store`] | Artifact store trait and backends |

pub mod assistant;
pub mod chat;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod query;
pub mod session;
pub mod source;
pub mod stats;
pub mod store;
pub mod transcript;
