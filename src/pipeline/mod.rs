//! Producer stdout pipeline: raw chunks → lines → records.
mod decoder;
mod framer;
pub use decoder::*;
pub use framer::*;

#[cfg(test)]
mod decoder_test;
