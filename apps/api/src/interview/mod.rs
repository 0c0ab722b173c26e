pub mod analysis;
pub mod catalog;
pub mod feedback;
pub mod handlers;
pub mod notice;
pub mod prompts;
pub mod questions;
pub mod registry;
pub mod session;
pub mod transcription;
