//! Bomi Control - CLI client for the Bomi insurance comparison assistant.
//!
//! Thin shell over `bomi_common`: a chat REPL, one-shot queries, and a
//! classification debug command. All parsing, state, and normalization
//! logic lives in the common crate; this crate only renders.

pub mod render;
pub mod repl;
