use crate::chatbot::UploadSummary;
use crate::history::ChatLogEntry;
use crate::session::{ChatTurn, TurnOutcome, View};
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The supervisor's mailbox or reply channel is gone.
    #[error("Supervisor unavailable: {0}")]
    ChannelClosed(String),
    /// No live session has this id.
    #[error("Unknown session: {0}")]
    UnknownSession(String),
    /// A generic internal error within an actor.
    #[error("Internal system error: {0}")]
    Internal(String),
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Opens a new session on the Home view.
    CreateSession {
        responder: oneshot::Sender<Uuid>,
    },
    /// A chat query from a session; answered by the chatbot of its current view.
    ProcessUserMessage {
        session_id: Uuid,
        content: String,
        responder: oneshot::Sender<Result<TurnOutcome, AppError>>,
    },
    /// Replaces the document behind the PDF chat.
    UploadDocument {
        file_name: String,
        bytes: Vec<u8>,
        responder: oneshot::Sender<Result<UploadSummary, AppError>>,
    },
    /// Switches a session to another view.
    Navigate {
        session_id: Uuid,
        view: View,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    /// The session's in-memory chat history.
    SessionHistory {
        session_id: Uuid,
        responder: oneshot::Sender<Result<Vec<ChatTurn>, AppError>>,
    },
    /// Everything in the CSV chat log, for the Conversation History view.
    ChatLog {
        responder: oneshot::Sender<Result<Vec<ChatLogEntry>, AppError>>,
    },
    /// Drops a session and its history.
    EndSession {
        session_id: Uuid,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
