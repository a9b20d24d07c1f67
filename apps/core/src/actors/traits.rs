use crate::actors::messages::AppError;
use crate::chatbot::{DocumentChatbot, Responder, UploadSummary};
use crate::history::ChatLogEntry;
use crate::session::{ChatTurn, TurnOutcome, View};
use async_trait::async_trait;
use uuid::Uuid;

/// Defines the public interface of the chat application.
///
/// The CLI talks to the supervisor only through this trait, so any front
/// end (or a test double) can drive the same sessions.
#[async_trait]
pub trait ChatService: Send + Sync + 'static {
    /// Starts a session on the Home view.
    async fn create_session(&self) -> Result<Uuid, AppError>;

    /// Answers a query with the chatbot of the session's current view.
    async fn send_message(&self, session_id: Uuid, content: String) -> Result<TurnOutcome, AppError>;

    /// Replaces the document answered by the PDF chat.
    async fn upload_document(&self, file_name: String, bytes: Vec<u8>) -> Result<UploadSummary, AppError>;

    async fn navigate(&self, session_id: Uuid, view: View) -> Result<(), AppError>;

    async fn session_history(&self, session_id: Uuid) -> Result<Vec<ChatTurn>, AppError>;

    /// Turns recorded in the chat log.
    async fn chat_log(&self) -> Result<Vec<ChatLogEntry>, AppError>;

    async fn end_session(&self, session_id: Uuid) -> Result<(), AppError>;
}

/// A responder over a replaceable uploaded document.
pub trait DocumentService: Responder + 'static {
    fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadSummary, AppError>;
}

impl DocumentService for DocumentChatbot {
    fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadSummary, AppError> {
        DocumentChatbot::upload(self, file_name, bytes)
    }
}
