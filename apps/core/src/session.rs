//! Session context.
//!
//! A session is created when a user starts chatting, mutated once per
//! turn and dropped when it ends. It owns the chat history and the
//! current view; nothing here is process-global.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Appended after the bot says goodbye.
pub const FAREWELL_LINE: &str = "Thank you for chatting with me. Have a great day!";

pub const ABOUT_TEXT: &str = "\
Nebula answers questions in two ways. On the Home page it matches what you \
type against a set of labelled intents, using either lemmatized pattern rules \
or a logistic regression classifier trained on TF-IDF features, and replies \
with one of the matched intent's responses. On the PDF Chat page it indexes \
an uploaded document and answers with the sentence that best matches your \
question, found by TF-IDF similarity over sentence windows, by a sentence \
classifier, or by sentence embeddings. Every answer is extracted, never \
generated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "You"),
            Sender::Bot => write!(f, "Nebula"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    pub message: String,
}

/// Pages of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Home,
    ConversationHistory,
    About,
    PdfChat,
}

impl View {
    pub const ALL: [View; 4] = [View::Home, View::ConversationHistory, View::About, View::PdfChat];

    /// Views that accept chat input.
    pub fn is_chat(self) -> bool {
        matches!(self, View::Home | View::PdfChat)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Home => "Home",
            View::ConversationHistory => "Conversation History",
            View::About => "About",
            View::PdfChat => "PDF Chat",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for View {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "home" => Ok(View::Home),
            "history" | "conversationhistory" => Ok(View::ConversationHistory),
            "about" => Ok(View::About),
            "pdf" | "pdfchat" => Ok(View::PdfChat),
            _ => Err(AppError::Validation(format!("Unknown page: {}", s))),
        }
    }
}

/// What a recorded exchange did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response: String,
    /// Closing line when the bot said goodbye.
    pub farewell: Option<String>,
}

/// `true` when the bot's reply is a plain goodbye.
pub fn is_farewell(response: &str) -> bool {
    matches!(response.to_lowercase().as_str(), "goodbye" | "bye")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Local>,
    view: View,
    history: Vec<ChatTurn>,
    closed: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            view: View::Home,
            history: Vec::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Switches pages. History is kept across views.
    pub fn navigate(&mut self, view: View) {
        self.view = view;
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Closed sessions accept no more turns.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Appends the user's query and the bot's reply. A goodbye closes the
    /// session and adds the closing line.
    pub fn record(&mut self, query: &str, response: String) -> Result<TurnOutcome, AppError> {
        if self.closed {
            return Err(AppError::Validation(format!(
                "Session {} has ended",
                self.id
            )));
        }
        self.history.push(ChatTurn {
            sender: Sender::User,
            message: query.to_string(),
        });
        self.history.push(ChatTurn {
            sender: Sender::Bot,
            message: response.clone(),
        });

        let farewell = if is_farewell(&response) {
            self.closed = true;
            self.history.push(ChatTurn {
                sender: Sender::Bot,
                message: FAREWELL_LINE.to_string(),
            });
            Some(FAREWELL_LINE.to_string())
        } else {
            None
        };

        Ok(TurnOutcome { response, farewell })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_home_and_empty() {
        let session = Session::new();
        assert_eq!(session.view(), View::Home);
        assert!(session.history().is_empty());
        assert!(!session.is_closed());
        assert_ne!(session.id(), Session::new().id());
    }

    #[test]
    fn test_record_appends_both_turns() {
        let mut session = Session::new();
        let outcome = session.record("hi", "Hello!".to_string()).unwrap();
        assert_eq!(outcome.farewell, None);
        assert_eq!(
            session.history(),
            &[
                ChatTurn { sender: Sender::User, message: "hi".into() },
                ChatTurn { sender: Sender::Bot, message: "Hello!".into() },
            ]
        );
    }

    #[test]
    fn test_goodbye_closes_session() {
        let mut session = Session::new();
        let outcome = session.record("bye", "Goodbye".to_string()).unwrap();
        assert_eq!(outcome.farewell.as_deref(), Some(FAREWELL_LINE));
        assert!(session.is_closed());
        assert_eq!(session.history().len(), 3);
        assert!(session.record("hello?", "Hi".to_string()).is_err());
    }

    #[test]
    fn test_farewell_detection_is_exact() {
        assert!(is_farewell("Goodbye"));
        assert!(is_farewell("BYE"));
        assert!(!is_farewell("Goodbye, see you soon"));
        assert!(!is_farewell("Hello"));
    }

    #[test]
    fn test_view_parsing_and_navigation() {
        assert_eq!("PDF Chat".parse::<View>().unwrap(), View::PdfChat);
        assert_eq!("conversation-history".parse::<View>().unwrap(), View::ConversationHistory);
        assert_eq!("about".parse::<View>().unwrap(), View::About);
        assert!("settings".parse::<View>().is_err());

        let mut session = Session::new();
        session.record("hi", "Hello!".to_string()).unwrap();
        session.navigate(View::About);
        assert_eq!(session.view(), View::About);
        assert_eq!(session.history().len(), 2);
        assert!(!View::About.is_chat());
        assert!(View::PdfChat.is_chat());
    }
}
