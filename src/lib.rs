//! Bilingual terminology extraction from translation-memory files.
//!
//! The core is a chunk-processing pipeline: token-bounded chunking of the
//! document's translation units, sequential per-chunk LLM extraction calls
//! with bounded retry and exponential backoff, and a merge step that validates
//! and deduplicates the extracted pairs. Individual chunk failures never abort
//! a run; only bad input does.

pub mod chunker;
pub mod config;
pub mod dedupe;
pub mod extract;
pub mod ir;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod tmx;
