// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM generator adapter, extraction prompts, and streaming output parsing.
//!
//! The extraction path is: build a context-aware prompt, stream the
//! generator's output through [`stream_parser::StreamingParser`], and emit
//! entities/relations the moment their object literals complete.

pub mod client;
pub mod extractor;
pub mod prompt;
pub mod stream_parser;
pub mod translate;
pub mod types;

pub use client::GeneratorClient;
pub use extractor::KnowledgeExtractor;
pub use stream_parser::{parse_document, StreamingParser};
pub use translate::translate_graph;
