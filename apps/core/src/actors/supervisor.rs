use crate::actors::messages::{ActorError, AppError, SupervisorMessage};
use crate::actors::traits::{ChatService, DocumentService};
use crate::chatbot::{Responder, UploadSummary};
use crate::history::{ChatLog, ChatLogEntry};
use crate::session::{ChatTurn, Session, TurnOutcome, View};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Uploads fit a model and may load an embedding model first.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// A handle to the `SupervisorActor`.
///
/// This is the primary entry point for all chat logic. The actor owns every
/// live session and routes each query to the chatbot of the session's
/// current view.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
}

impl SupervisorHandle {
    /// Spawns the supervisor over the given chatbots and returns a handle.
    ///
    /// # Arguments
    ///
    /// * `intent_bot` - Answers queries on the Home view.
    /// * `document_bot` - Answers queries on the PDF Chat view and takes uploads.
    /// * `chat_log` - Receives every Home turn when present.
    pub fn new<D: DocumentService>(
        intent_bot: Arc<dyn Responder>,
        document_bot: Arc<D>,
        chat_log: Option<ChatLog>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let actor = SupervisorRunner::new(receiver, intent_bot, document_bot, chat_log);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SupervisorMessage,
        wait: Duration,
    ) -> Result<T, AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(build(send))
            .await
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))?;
        timeout(wait, recv)
            .await?
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))
    }

    /// Asks the supervisor to stop after the messages already queued.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.sender
            .send(SupervisorMessage::Shutdown)
            .await
            .map_err(|e| AppError::Actor(ActorError::ChannelClosed(e.to_string())))
    }
}

#[async_trait]
impl ChatService for SupervisorHandle {
    async fn create_session(&self) -> Result<Uuid, AppError> {
        self.request(|responder| SupervisorMessage::CreateSession { responder }, REQUEST_TIMEOUT)
            .await
    }

    #[instrument(skip(self, content), fields(length = content.len()))]
    async fn send_message(&self, session_id: Uuid, content: String) -> Result<TurnOutcome, AppError> {
        self.request(
            |responder| SupervisorMessage::ProcessUserMessage {
                session_id,
                content,
                responder,
            },
            REQUEST_TIMEOUT,
        )
        .await?
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_document(&self, file_name: String, bytes: Vec<u8>) -> Result<UploadSummary, AppError> {
        self.request(
            |responder| SupervisorMessage::UploadDocument {
                file_name,
                bytes,
                responder,
            },
            UPLOAD_TIMEOUT,
        )
        .await?
    }

    #[instrument(skip(self))]
    async fn navigate(&self, session_id: Uuid, view: View) -> Result<(), AppError> {
        self.request(
            |responder| SupervisorMessage::Navigate {
                session_id,
                view,
                responder,
            },
            REQUEST_TIMEOUT,
        )
        .await?
    }

    async fn session_history(&self, session_id: Uuid) -> Result<Vec<ChatTurn>, AppError> {
        self.request(
            |responder| SupervisorMessage::SessionHistory {
                session_id,
                responder,
            },
            REQUEST_TIMEOUT,
        )
        .await?
    }

    async fn chat_log(&self) -> Result<Vec<ChatLogEntry>, AppError> {
        self.request(|responder| SupervisorMessage::ChatLog { responder }, REQUEST_TIMEOUT)
            .await?
    }

    #[instrument(skip(self))]
    async fn end_session(&self, session_id: Uuid) -> Result<(), AppError> {
        self.request(
            |responder| SupervisorMessage::EndSession {
                session_id,
                responder,
            },
            REQUEST_TIMEOUT,
        )
        .await?
    }
}

// --- Actor Runner ---
struct SupervisorRunner<D>
where
    D: DocumentService,
{
    receiver: mpsc::Receiver<SupervisorMessage>,
    intent_bot: Arc<dyn Responder>,
    document_bot: Arc<D>,
    chat_log: Option<ChatLog>,
    sessions: HashMap<Uuid, Session>,
}

impl<D> SupervisorRunner<D>
where
    D: DocumentService,
{
    fn new(
        receiver: mpsc::Receiver<SupervisorMessage>,
        intent_bot: Arc<dyn Responder>,
        document_bot: Arc<D>,
        chat_log: Option<ChatLog>,
    ) -> Self {
        Self {
            receiver,
            intent_bot,
            document_bot,
            chat_log,
            sessions: HashMap::new(),
        }
    }

    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, SupervisorMessage::Shutdown) {
                info!("Supervisor shutting down...");
                break;
            }
            self.handle_message(msg).await;
        }
        info!("Supervisor stopped ({} sessions dropped)", self.sessions.len());
    }

    async fn handle_message(&mut self, msg: SupervisorMessage) {
        match msg {
            SupervisorMessage::CreateSession { responder } => {
                let session = Session::new();
                let id = session.id();
                self.sessions.insert(id, session);
                info!("Session {} created", id);
                let _ = responder.send(id);
            }
            SupervisorMessage::ProcessUserMessage {
                session_id,
                content,
                responder,
            } => {
                let result = self.handle_user_message(session_id, content).await;
                if let Err(e) = &result {
                    error!("Error processing user message: {}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::UploadDocument {
                file_name,
                bytes,
                responder,
            } => {
                let bot = Arc::clone(&self.document_bot);
                let result = tokio::task::spawn_blocking(move || bot.upload(&file_name, &bytes))
                    .await
                    .unwrap_or_else(|e| Err(AppError::Actor(ActorError::Internal(e.to_string()))));
                if let Err(e) = &result {
                    error!("Error indexing upload: {}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::Navigate {
                session_id,
                view,
                responder,
            } => {
                let result = self.session_mut(session_id).map(|session| {
                    session.navigate(view);
                    info!("Session {} moved to {}", session_id, view);
                });
                let _ = responder.send(result);
            }
            SupervisorMessage::SessionHistory {
                session_id,
                responder,
            } => {
                let result = self
                    .session_mut(session_id)
                    .map(|session| session.history().to_vec());
                let _ = responder.send(result);
            }
            SupervisorMessage::ChatLog { responder } => {
                let result = match &self.chat_log {
                    Some(log) => log.entries(),
                    None => Ok(Vec::new()),
                };
                let _ = responder.send(result);
            }
            SupervisorMessage::EndSession {
                session_id,
                responder,
            } => {
                let result = match self.sessions.remove(&session_id) {
                    Some(session) => {
                        info!(
                            "Session {} ended after {} turns",
                            session_id,
                            session.history().len()
                        );
                        Ok(())
                    }
                    None => Err(unknown_session(session_id)),
                };
                let _ = responder.send(result);
            }
            SupervisorMessage::Shutdown => {}
        }
    }

    fn session_mut(&mut self, session_id: Uuid) -> Result<&mut Session, AppError> {
        self.sessions
            .get_mut(&session_id)
            .ok_or_else(|| unknown_session(session_id))
    }

    #[instrument(skip(self, content))]
    async fn handle_user_message(
        &mut self,
        session_id: Uuid,
        content: String,
    ) -> Result<TurnOutcome, AppError> {
        let (view, closed) = {
            let session = self.session_mut(session_id)?;
            (session.view(), session.is_closed())
        };
        if closed {
            return Err(AppError::Validation(format!("Session {} has ended", session_id)));
        }

        let response = match view {
            View::Home => self.intent_bot.respond(&content),
            View::PdfChat => {
                let bot = Arc::clone(&self.document_bot);
                let query = content.clone();
                tokio::task::spawn_blocking(move || bot.respond(&query))
                    .await
                    .map_err(|e| AppError::Actor(ActorError::Internal(e.to_string())))?
            }
            other => {
                return Err(AppError::Validation(format!(
                    "The {} page does not take chat messages",
                    other
                )))
            }
        };

        if view == View::Home {
            if let Some(log) = &self.chat_log {
                if let Err(e) = log.append(&content, &response) {
                    warn!("Failed to write chat log: {}", e);
                }
            }
        }

        self.session_mut(session_id)?.record(&content, response)
    }
}

fn unknown_session(session_id: Uuid) -> AppError {
    AppError::Actor(ActorError::UnknownSession(session_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::IndexSource;
    use std::sync::Mutex;

    // --- Mock Chatbots ---

    struct EchoResponder;

    impl Responder for EchoResponder {
        fn respond(&self, query: &str) -> String {
            format!("echo: {}", query)
        }
    }

    #[derive(Default)]
    struct MockDocumentBot {
        uploads: Mutex<Vec<String>>,
    }

    impl Responder for MockDocumentBot {
        fn respond(&self, query: &str) -> String {
            match self.uploads.lock().unwrap().last() {
                Some(name) => format!("{} answers {}", name, query),
                None => "no document".to_string(),
            }
        }
    }

    impl DocumentService for MockDocumentBot {
        fn upload(&self, file_name: &str, _bytes: &[u8]) -> Result<UploadSummary, AppError> {
            self.uploads.lock().unwrap().push(file_name.to_string());
            Ok(UploadSummary {
                name: file_name.to_string(),
                fingerprint: "fp".to_string(),
                units: 1,
                source: IndexSource::Built,
            })
        }
    }

    fn setup_supervisor() -> SupervisorHandle {
        SupervisorHandle::new(
            Arc::new(EchoResponder),
            Arc::new(MockDocumentBot::default()),
            None,
        )
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_home_message_uses_intent_bot() {
        let handle = setup_supervisor();
        let session = handle.create_session().await.unwrap();

        let outcome = handle.send_message(session, "hi".to_string()).await.unwrap();
        assert_eq!(outcome.response, "echo: hi");
        assert_eq!(handle.session_history(session).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pdf_view_routes_to_document_bot() {
        let handle = setup_supervisor();
        let session = handle.create_session().await.unwrap();
        handle.navigate(session, View::PdfChat).await.unwrap();

        let before = handle.send_message(session, "q".to_string()).await.unwrap();
        assert_eq!(before.response, "no document");

        handle.upload_document("a.pdf".to_string(), vec![1, 2, 3]).await.unwrap();
        let after = handle.send_message(session, "q".to_string()).await.unwrap();
        assert_eq!(after.response, "a.pdf answers q");
    }

    #[tokio::test]
    async fn test_non_chat_view_rejects_messages() {
        let handle = setup_supervisor();
        let session = handle.create_session().await.unwrap();
        handle.navigate(session, View::About).await.unwrap();

        let result = handle.send_message(session, "hello".to_string()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_and_ended_sessions() {
        let handle = setup_supervisor();
        let result = handle.send_message(Uuid::new_v4(), "hi".to_string()).await;
        assert!(matches!(result, Err(AppError::Actor(ActorError::UnknownSession(_)))));

        let session = handle.create_session().await.unwrap();
        handle.end_session(session).await.unwrap();
        assert!(handle.session_history(session).await.is_err());
        assert!(handle.end_session(session).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_closes_mailbox() {
        let handle = setup_supervisor();
        handle.shutdown().await.unwrap();
        // Give the runner a chance to exit.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = handle.create_session().await;
        assert!(matches!(result, Err(AppError::Actor(ActorError::ChannelClosed(_)))));
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        // Nobody reads this mailbox, so the reply never comes.
        let (sender, _mailbox) = mpsc::channel(1);
        let handle = SupervisorHandle { sender };
        let result = handle
            .request(
                |responder| SupervisorMessage::CreateSession { responder },
                Duration::from_millis(20),
            )
            .await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }
}
