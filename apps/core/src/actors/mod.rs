//! # Actors
//!
//! The supervisor owns every live session and serializes access to the
//! chatbots behind a tokio mailbox.
//!
//! ## Components
//! - `messages`: mailbox messages and `ActorError`
//! - `traits`: `ChatService` (front-end seam) and `DocumentService`
//! - `supervisor`: `SupervisorHandle` and its runner

pub mod messages;
pub mod supervisor;
pub mod traits;
