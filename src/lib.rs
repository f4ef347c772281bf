//! Tooling around the content translation section title database.
//!
//! - `extractor`: mine section title pairs from corpus dumps
//! - `importer`: merge machine-learning title alignments
//! - `aligner`: fill gaps for frequent titles with machine translation
//! - `coverage`: report which MT providers cover which language pairs
//! - `buffer`: relay a child engine's output through a buffered pipe

pub mod aligner;
pub mod buffer;
pub mod config;
pub mod coverage;
pub mod db;
pub mod extractor;
pub mod http;
pub mod importer;
pub mod retry;
