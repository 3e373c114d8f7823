//! Register codecs.
//!
//! Protocol-independent conversion of raw 16-bit registers into values.

pub mod word_order;

pub use word_order::{convert_words, decode_words, normalize_words};
