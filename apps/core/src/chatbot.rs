//! Chatbots: the `respond(query) -> String` boundary.
//!
//! Everything below this point returns `Result`; here every error and every
//! empty outcome becomes one of the fixed replies, so a caller always gets
//! something displayable.

use crate::config::{AppConfig, IntentStrategy};
use crate::corpus::{Document, Intent, IntentSet};
use crate::error::AppError;
use crate::featurize::{FastEmbedder, SentenceEmbedder};
use crate::persist::{IndexStore, PersistedIndex};
use crate::retrieval::{
    DocumentIndex, DocumentStrategy, IndexOptions, IntentClassifierMatcher, ResponseSelector,
    RuleMatcher, TrainingOptions,
};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument, warn};

pub const FALLBACK_RESPONSE: &str = "I'm not sure how to respond. Can you try rephrasing?";
pub const NO_DOCUMENT_RESPONSE: &str = "Please upload a PDF first to start chatting.";
pub const NOT_FOUND_RESPONSE: &str =
    "I couldn't find relevant information in the PDF. Please try rephrasing your query.";

/// Single-turn query interface. Never fails.
pub trait Responder: Send + Sync {
    fn respond(&self, query: &str) -> String;
}

/// A random response of `intent`, or the fallback.
fn pick_response(selector: &ResponseSelector, intent: Option<&Intent>) -> String {
    intent
        .and_then(|intent| selector.choose(&intent.responses))
        .unwrap_or_else(|| FALLBACK_RESPONSE.to_string())
}

/// Lemmatized whole-word pattern chatbot.
pub struct RuleChatbot {
    intents: IntentSet,
    matcher: RuleMatcher,
    selector: ResponseSelector,
}

impl RuleChatbot {
    pub fn new(intents: IntentSet, selector: ResponseSelector) -> Self {
        let matcher = RuleMatcher::new(&intents);
        info!(
            "Rule chatbot ready: {} intents, {} patterns",
            intents.len(),
            matcher.pattern_count()
        );
        Self {
            intents,
            matcher,
            selector,
        }
    }
}

impl Responder for RuleChatbot {
    fn respond(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return FALLBACK_RESPONSE.to_string();
        }
        let intent = self.matcher.find(query).and_then(|i| self.intents.get(i));
        if intent.is_none() {
            debug!("No rule matched: {:?}", query);
        }
        pick_response(&self.selector, intent)
    }
}

/// TF-IDF + logistic regression intent chatbot.
pub struct IntentChatbot {
    intents: IntentSet,
    /// `None` when there was nothing to train on.
    matcher: Option<IntentClassifierMatcher>,
    selector: ResponseSelector,
}

impl IntentChatbot {
    pub fn new(intents: IntentSet, options: &TrainingOptions, selector: ResponseSelector) -> Self {
        let matcher = match IntentClassifierMatcher::train(&intents, options) {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                warn!("Intent classifier unavailable, answering with fallback: {}", e);
                None
            }
        };
        Self {
            intents,
            matcher,
            selector,
        }
    }
}

impl Responder for IntentChatbot {
    fn respond(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return FALLBACK_RESPONSE.to_string();
        }
        let intent = self
            .matcher
            .as_ref()
            .and_then(|m| m.predict(query))
            .and_then(|tag| self.intents.find_by_tag(tag));
        pick_response(&self.selector, intent)
    }
}

/// Intent chatbot for the configured strategy.
pub fn intent_responder(config: &AppConfig, intents: IntentSet) -> Arc<dyn Responder> {
    let selector = ResponseSelector::from_seed(config.seed);
    match config.intent_strategy {
        IntentStrategy::Rule => Arc::new(RuleChatbot::new(intents, selector)),
        IntentStrategy::Classifier => {
            Arc::new(IntentChatbot::new(intents, &config.training_options(), selector))
        }
    }
}

/// Where the index behind an upload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Same bytes as the document already loaded.
    Unchanged,
    /// Read back from the index store.
    Persisted,
    /// Fitted from the extracted text.
    Built,
    /// Nothing could be extracted; no index is loaded.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSummary {
    pub name: String,
    pub fingerprint: String,
    pub units: usize,
    pub source: IndexSource,
}

struct LoadedDocument {
    name: String,
    fingerprint: String,
    index: DocumentIndex,
}

/// Question answering over one uploaded document. A new upload replaces
/// the previous index wholesale.
pub struct DocumentChatbot {
    strategy: DocumentStrategy,
    options: IndexOptions,
    embedder: Option<Arc<dyn SentenceEmbedder>>,
    store: Option<IndexStore>,
    current: RwLock<Option<LoadedDocument>>,
}

impl DocumentChatbot {
    pub fn new(strategy: DocumentStrategy, options: IndexOptions) -> Self {
        Self {
            strategy,
            options,
            embedder: None,
            store: None,
            current: RwLock::new(None),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn SentenceEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_store(mut self, store: IndexStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Chatbot for the configured strategy. Loads the embedding model only
    /// when the embedding strategy is selected.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let mut chatbot = Self::new(config.document_strategy, config.index_options());
        if config.document_strategy == DocumentStrategy::Embedding {
            let embedder =
                FastEmbedder::new(config.embeddings_dir(), config.embedding_cache_size)?;
            chatbot = chatbot.with_embedder(Arc::new(embedder));
        }
        if config.persist_index {
            chatbot = chatbot.with_store(IndexStore::new(config.index_dir()));
        }
        Ok(chatbot)
    }

    pub fn strategy(&self) -> DocumentStrategy {
        self.strategy
    }

    fn embedder(&self) -> Option<&dyn SentenceEmbedder> {
        self.embedder.as_deref()
    }

    /// Model the index vectors come from; only embedding indexes have one.
    fn model_id(&self) -> Option<&str> {
        match self.strategy {
            DocumentStrategy::Embedding => self.embedder().map(|e| e.model_id()),
            _ => None,
        }
    }

    pub fn has_document(&self) -> bool {
        self.current
            .read()
            .map(|current| current.is_some())
            .unwrap_or(false)
    }

    /// Name of the loaded document.
    pub fn document_name(&self) -> Option<String> {
        self.current
            .read()
            .ok()
            .and_then(|current| current.as_ref().map(|doc| doc.name.clone()))
    }

    fn replace(&self, loaded: Option<LoadedDocument>) {
        match self.current.write() {
            Ok(mut current) => *current = loaded,
            Err(poisoned) => *poisoned.into_inner() = loaded,
        }
    }

    /// Loads the index the store holds for this strategy, without a
    /// document to compare against. It must have been built with the current
    /// options and model. Returns whether one was loaded.
    pub fn resume(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.load(self.strategy) {
            Ok(Some(persisted))
                if persisted.is_built_with(self.strategy, &self.options, self.model_id()) =>
            {
                info!(
                    "Resumed {} index with {} units",
                    persisted.strategy,
                    persisted.units.len()
                );
                self.replace(Some(LoadedDocument {
                    name: format!("persisted {} index", persisted.strategy),
                    fingerprint: persisted.fingerprint,
                    index: persisted.payload,
                }));
                true
            }
            Ok(Some(_)) => {
                warn!("Persisted index was built with other settings; ignoring it");
                false
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Could not resume persisted index: {}", e);
                false
            }
        }
    }

    /// Extracts and indexes an uploaded file. Identical bytes keep the
    /// current index; a file with no extractable text unloads it.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadSummary, AppError> {
        let document = Document::from_upload(file_name, bytes);

        if let Ok(current) = self.current.read() {
            if let Some(loaded) = current.as_ref() {
                if loaded.fingerprint == document.fingerprint {
                    info!("Document unchanged; keeping current index");
                    return Ok(UploadSummary {
                        name: document.name,
                        fingerprint: document.fingerprint,
                        units: loaded.index.units().len(),
                        source: IndexSource::Unchanged,
                    });
                }
            }
        }

        let sentences = document.sentences();
        if sentences.is_empty() {
            warn!("No text extracted from {}; no document loaded", file_name);
            self.replace(None);
            return Ok(UploadSummary {
                name: document.name,
                fingerprint: document.fingerprint,
                units: 0,
                source: IndexSource::Empty,
            });
        }

        let persisted = self
            .store
            .as_ref()
            .and_then(|store| {
                store.load_fresh(
                    &document.fingerprint,
                    self.strategy,
                    &self.options,
                    self.model_id(),
                )
            });

        let (index, source) = match persisted {
            Some(persisted) => (persisted.payload, IndexSource::Persisted),
            None => {
                let index =
                    DocumentIndex::build(self.strategy, &sentences, &self.options, self.embedder())?;
                if let Some(store) = &self.store {
                    let record = PersistedIndex::new(
                        &document.fingerprint,
                        index.clone(),
                        self.options,
                        self.model_id(),
                    );
                    if let Err(e) = store.save(&record) {
                        warn!("Failed to persist index: {}", e);
                    }
                }
                (index, IndexSource::Built)
            }
        };

        let units = index.units().len();
        info!(
            "Loaded {} ({} sentences, {} units, {:?})",
            document.name,
            sentences.len(),
            units,
            source
        );
        self.replace(Some(LoadedDocument {
            name: document.name.clone(),
            fingerprint: document.fingerprint.clone(),
            index,
        }));

        Ok(UploadSummary {
            name: document.name,
            fingerprint: document.fingerprint,
            units,
            source,
        })
    }
}

impl Responder for DocumentChatbot {
    fn respond(&self, query: &str) -> String {
        let current = match self.current.read() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(loaded) = current.as_ref() else {
            return NO_DOCUMENT_RESPONSE.to_string();
        };
        if query.trim().is_empty() {
            return NOT_FOUND_RESPONSE.to_string();
        }

        match loaded.index.best_match(query, self.embedder()) {
            Ok(Some(answer)) => answer,
            Ok(None) => NOT_FOUND_RESPONSE.to_string(),
            Err(e) => {
                warn!("Document query failed: {}", e);
                NOT_FOUND_RESPONSE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intents() -> IntentSet {
        IntentSet::new(vec![
            Intent::new("greeting", ["hi", "hello"], ["Hello!", "Hi there!"]),
            Intent::new("goodbye", ["bye", "see you"], ["Goodbye"]),
        ])
    }

    #[test]
    fn test_rule_chatbot_answers_from_matched_intent() {
        let bot = RuleChatbot::new(intents(), ResponseSelector::seeded(3));
        for _ in 0..10 {
            let reply = bot.respond("Hi there");
            assert!(reply == "Hello!" || reply == "Hi there!", "{}", reply);
        }
        assert_eq!(bot.respond("see you tomorrow"), "Goodbye");
    }

    #[test]
    fn test_rule_chatbot_fallbacks() {
        let bot = RuleChatbot::new(intents(), ResponseSelector::seeded(3));
        assert_eq!(bot.respond("quantum physics"), FALLBACK_RESPONSE);
        assert_eq!(bot.respond("   "), FALLBACK_RESPONSE);

        let empty = RuleChatbot::new(IntentSet::default(), ResponseSelector::seeded(3));
        assert_eq!(empty.respond("hi"), FALLBACK_RESPONSE);
    }

    #[test]
    fn test_intent_chatbot_with_empty_corpus_falls_back() {
        let bot = IntentChatbot::new(
            IntentSet::default(),
            &TrainingOptions::default(),
            ResponseSelector::seeded(1),
        );
        assert_eq!(bot.respond("hello"), FALLBACK_RESPONSE);
        assert_eq!(bot.respond(""), FALLBACK_RESPONSE);
    }

    #[test]
    fn test_intent_without_responses_falls_back() {
        let set = IntentSet::new(vec![Intent::new("mute", ["hello"], Vec::<String>::new())]);
        let bot = RuleChatbot::new(set, ResponseSelector::seeded(1));
        assert_eq!(bot.respond("hello"), FALLBACK_RESPONSE);
    }

    #[test]
    fn test_document_chatbot_before_upload() {
        let bot = DocumentChatbot::new(DocumentStrategy::Ngram, IndexOptions::default());
        assert!(!bot.has_document());
        assert_eq!(bot.respond("anything"), NO_DOCUMENT_RESPONSE);
        assert_eq!(bot.respond(""), NO_DOCUMENT_RESPONSE);
    }

    #[test]
    fn test_document_chatbot_upload_and_query() {
        let bot = DocumentChatbot::new(DocumentStrategy::Ngram, IndexOptions::default());
        let text = "Owls hunt at night. Hawks hunt during the day. Both are raptors.";
        let summary = bot.upload("birds.txt", text.as_bytes()).unwrap();
        assert_eq!(summary.source, IndexSource::Built);
        assert_eq!(summary.units, 6);
        assert_eq!(bot.document_name().as_deref(), Some("birds.txt"));

        assert_eq!(bot.respond("when do owls hunt"), "Owls hunt at night.");
        assert_eq!(bot.respond("  "), NOT_FOUND_RESPONSE);
    }

    #[test]
    fn test_unreadable_upload_unloads_document() {
        let bot = DocumentChatbot::new(DocumentStrategy::Ngram, IndexOptions::default());
        bot.upload("a.txt", b"Cats purr.").unwrap();
        let summary = bot.upload("broken.docx", b"\x00\x01garbage").unwrap();
        assert_eq!(summary.source, IndexSource::Empty);
        assert_eq!(bot.respond("cats"), NO_DOCUMENT_RESPONSE);
    }
}
