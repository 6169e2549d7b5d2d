#![doc = "docsync-core: core logic library for docsync."]

//! This crate contains the synchronisation pipeline that keeps a public
//! source repo, a published docs site and private repos in step: the
//! dialect normalizer, mapping resolver, classification cache, text
//! generation client, the LLM-backed stages and the forward/backward
//! orchestrators. CLI glue and the concrete repository-host client live in
//! the `docsync` crate.
//!
//! # Usage
//! Build a [`stages::Stages`], a [`contract::TextGenerator`] (normally
//! [`generation::GenerationClient`] over [`generation::AnthropicTransport`])
//! and run a [`synchronise::ForwardSync`] or [`synchronise::BackwardSync`].

pub mod cache;
pub mod changes;
pub mod contract;
pub mod document;
pub mod error;
pub mod generation;
pub mod mapping;
pub mod normalize;
pub mod report;
pub mod stages;
pub mod synchronise;

pub use error::{Result, SyncError};
