//! Server-side relay for Gemini multimodal demos
//!
//! Keeps the provider API key on the server, uploads client videos to the
//! Gemini file store, waits for them to become usable, and relays
//! image/video understanding requests. Model output is cleaned up into JSON
//! the demo front ends can render directly.

pub mod ai;
pub mod auth;
pub mod detection;
pub mod error;
pub mod extract;
pub mod models;
pub mod poll;
pub mod prompts;
pub mod relay;
pub mod server;

pub use error::{Error, Result};
