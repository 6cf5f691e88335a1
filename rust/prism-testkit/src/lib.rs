//! Test utilities for the prism crates.
//!
//! This crate provides:
//! - An in-memory segmented index engine ([`index::IndexFixture`]) building
//!   parent-first nested document blocks from JSON documents
//! - A term-matching [`highlighter::TermHighlighter`]
//! - A map-backed [`loader::MapEntityLoader`]
//! - Random document generation for property-style tests

pub mod data_gen;
pub mod highlighter;
pub mod index;
pub mod loader;

pub use highlighter::TermHighlighter;
pub use index::{IndexFixture, MemoryIndex, MemorySegment};
pub use loader::MapEntityLoader;
