//! Decoder implementations

pub mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticDecoder, SYNTHETIC_SCHEME};
