//! Corpus Loader Tests
//!
//! Loading intents from disk and turning uploads into text units.

use super::{sample_intents, SAMPLE_DOCUMENT};
use crate::corpus::{ngram_contexts, Document, IntentSet};
use crate::error::AppError;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_intents_json_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("intents.json");
    fs::write(&path, serde_json::to_string(&sample_intents()).unwrap()).unwrap();

    let loaded = IntentSet::load_json(&path).unwrap();
    assert_eq!(loaded, sample_intents());
    assert_eq!(loaded.pattern_units().len(), 13);
}

#[test]
fn test_load_intents_from_notebook_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chatbot.ipynb");
    let literal = serde_json::to_string_pretty(&sample_intents()).unwrap();
    let source: Vec<String> = format!("import random\nintents = {}\n", literal)
        .lines()
        .map(|l| format!("{}\n", l))
        .collect();
    let notebook = serde_json::json!({
        "cells": [{"cell_type": "code", "source": source}],
        "nbformat": 4
    });
    fs::write(&path, notebook.to_string()).unwrap();

    assert_eq!(IntentSet::load_notebook(&path).unwrap(), sample_intents());
}

#[test]
fn test_missing_and_malformed_intent_files() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        IntentSet::load_json(&dir.path().join("absent.json")),
        Err(AppError::Io(_))
    ));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{ not json").unwrap();
    assert!(matches!(IntentSet::load_json(&bad), Err(AppError::Json(_))));
}

#[test]
fn test_document_units_from_upload() {
    let doc = Document::from_upload("museum.txt", SAMPLE_DOCUMENT.as_bytes());
    let sentences = doc.sentences();
    assert_eq!(sentences.len(), 5);
    assert_eq!(sentences[1], "Tickets cost twelve dollars for adults.");

    // 5 + 4 + 3 + 2 + 1 windows, sizes up to 6
    let windows = ngram_contexts(&sentences, 1, 6);
    assert_eq!(windows.len(), 15);
    assert!(windows.iter().all(|w| w.start <= w.end && w.end < sentences.len()));
}

#[test]
fn test_same_bytes_same_fingerprint() {
    let a = Document::from_upload("a.txt", SAMPLE_DOCUMENT.as_bytes());
    let b = Document::from_upload("renamed.txt", SAMPLE_DOCUMENT.as_bytes());
    let c = Document::from_upload("a.txt", b"Something else entirely.");
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_ne!(a.fingerprint, c.fingerprint);
}
