//! Nebula: intent chat and single-document question answering.
//!
//! Every query goes through the same pipeline: ingest a corpus, featurize
//! it, index it, then pick exactly one best match.

pub mod actors;
pub mod chatbot;
pub mod config;
pub mod corpus;
pub mod error;
pub mod featurize;
pub mod fs_manager;
pub mod history;
pub mod nlp;
pub mod persist;
pub mod retrieval;
pub mod session;

pub use chatbot::{DocumentChatbot, IntentChatbot, Responder, RuleChatbot};
pub use config::AppConfig;
pub use error::AppError;

#[cfg(test)]
mod tests;
