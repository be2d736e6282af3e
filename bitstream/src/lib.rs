//! Bit-level packing primitives for the repframe replication core.
//!
//! Packed entity payloads and per-observer update streams are bit streams,
//! not byte streams: a preserve record costs zero bits and a destroy record
//! costs one bit plus an index. This crate provides the writer and reader
//! those streams are built on.
//!
//! Bits are written most-significant first within each byte. The writer
//! accumulates into an owned buffer; the reader is bounds-checked and never
//! panics on malformed input.

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;
