//! # lexindex
//!
//! Retrieval over a corpus of legal documents (case law, statutes, contracts,
//! memos) for a downstream answer generator.
//!
//! The retrieval engine itself lives in the `lexindex-core` crate; this crate
//! supplies the concrete embedding providers, configuration, the directory
//! loader, the HTTP server and the `lex` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │   Loader    │──▶│ Index (lexindex-core)│◀──│ Embedder │
//! │  .txt/.md   │   │ chunk, embed, rank   │   │ provider │
//! └─────────────┘   └──────────┬───────────┘   └──────────┘
//!                              │
//!                  ┌───────────┴───────┐
//!                  ▼                   ▼
//!             ┌──────────┐       ┌──────────┐
//!             │   CLI    │       │   HTTP   │
//!             │  (lex)   │       │  (axum)  │
//!             └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI, Gemini and offline hash embedders |
//! | [`loader`] | Directory walking and doc type inference |
//! | [`search`] | One-shot search command |
//! | [`chunk`] | Chunk preview command |
//! | [`server`] | HTTP retrieval server |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod loader;
pub mod search;
pub mod server;
