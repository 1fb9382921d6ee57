pub mod client;
pub mod content;
pub mod files;
pub mod types;

pub use client::{GeminiAuth, GeminiHttpClient};
pub use content::GeminiContentClient;
pub use files::GeminiFileClient;
