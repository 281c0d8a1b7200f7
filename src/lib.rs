//! # qarag
//!
//! Terminal client for a PDF question-answering service.
//!
//! The backend indexes uploaded PDFs and answers questions with ranked
//! evidence passages. This crate talks to it over HTTP, tracks ingestion
//! progress, keeps the conversation in submission order, and renders answers
//! alongside the evidence that supports them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  commands  ┌──────────┐   HTTP   ┌─────────┐
//! │ CLI/chat │───────────▶│ Session  │─────────▶│ backend │
//! │ (render) │◀───────────│ (state)  │◀─────────│         │
//! └──────────┘  notices   └──────────┘  events  └─────────┘
//! ```
//!
//! State types and their invariants live in `qarag-core`; this crate adds
//! the transport, the event-driven session, and terminal output.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Transport error type |
//! | [`transport`] | Backend trait and HTTP client |
//! | [`session`] | State owner and event loop |
//! | [`progress`] | Ingestion progress reporting |
//! | [`render`] | Terminal output |
//! | [`commands`] | One-shot CLI commands |
//! | [`chat`] | Interactive chat loop |

pub mod chat;
pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod render;
pub mod session;
pub mod transport;
