//! Test Module
//!
//! Scenario tests that cross module boundaries. Unit tests live next to
//! the code they cover.
//!
//! ## Test Categories
//! - `corpus_tests`: intent files, notebooks, document extraction and windowing
//! - `pipeline_tests`: query-to-answer behaviour of every chatbot strategy
//! - `persistence_tests`: index reuse, staleness and round trips on disk
//! - `session_tests`: session lifecycle, farewell and the chat log
//! - `supervisor_tests`: the actor with real chatbots behind it

pub mod corpus_tests;

use crate::corpus::{Intent, IntentSet};
use crate::featurize::SentenceEmbedder;
use crate::error::AppError;

/// Budget-assistant intents in the shape of the shipped `intents.json`.
pub fn sample_intents() -> IntentSet {
    IntentSet::new(vec![
        Intent::new(
            "greeting",
            ["Hi", "Hello", "Hey", "Good morning"],
            ["Hi there", "Hello", "Hey", "Nice to meet you"],
        ),
        Intent::new("goodbye", ["Bye", "See you later", "Goodbye"], ["Goodbye", "Bye"]),
        Intent::new(
            "budget",
            ["How do I create a budget", "budgeting tips", "help me plan my budget"],
            ["Start by listing your income and fixed expenses."],
        ),
        Intent::new(
            "credit_score",
            ["What is a credit score", "how to improve my credit score", "credit rating"],
            ["A credit score reflects how reliably you repay debt."],
        ),
    ])
}

pub const SAMPLE_DOCUMENT: &str = "\
The museum opens at ten in the morning. \
Tickets cost twelve dollars for adults. \
Children under five enter for free. \
The sculpture garden closes at sunset. \
Guided tours leave from the main hall every hour.";

/// Bag-of-letters embedder: deterministic and download-free.
pub struct LetterEmbedder;

impl SentenceEmbedder for LetterEmbedder {
    fn model_id(&self) -> &str {
        "test/letters"
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.to_lowercase().chars() {
                    if c.is_ascii_lowercase() {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}
