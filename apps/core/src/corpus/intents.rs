//! Intent records and their loaders.
//!
//! Intents come either from a JSON file or from a notebook cell that
//! assigns an `intents = [...]` literal. The notebook literal is only ever
//! deserialized, never evaluated.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One labeled intent: trigger patterns and candidate replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub tag: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

impl Intent {
    pub fn new<T, P, R>(tag: T, patterns: P, responses: R) -> Self
    where
        T: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            tag: tag.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            responses: responses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered, immutable intent set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentSet {
    intents: Vec<Intent>,
}

/// A (pattern, tag) training pair borrowed from the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternUnit<'a> {
    pub pattern: &'a str,
    pub tag: &'a str,
    /// Position of the parent intent in the set.
    pub intent_index: usize,
}

impl IntentSet {
    pub fn new(intents: Vec<Intent>) -> Self {
        Self { intents }
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Intent> {
        self.intents.get(index)
    }

    /// First intent carrying `tag`.
    pub fn find_by_tag(&self, tag: &str) -> Option<&Intent> {
        self.intents.iter().find(|intent| intent.tag == tag)
    }

    /// Every pattern as a text unit tagged with its parent intent.
    pub fn pattern_units(&self) -> Vec<PatternUnit<'_>> {
        self.intents
            .iter()
            .enumerate()
            .flat_map(|(intent_index, intent)| {
                intent.patterns.iter().map(move |pattern| PatternUnit {
                    pattern,
                    tag: &intent.tag,
                    intent_index,
                })
            })
            .collect()
    }

    /// Parses a JSON array of intents, or an object with an `intents` array.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IntentsDocument {
            List(Vec<Intent>),
            Wrapped { intents: Vec<Intent> },
        }

        let intents = match serde_json::from_str::<IntentsDocument>(json)? {
            IntentsDocument::List(intents) => intents,
            IntentsDocument::Wrapped { intents } => intents,
        };
        Ok(Self::new(intents))
    }

    pub fn load_json(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        let set = Self::from_json_str(&raw)?;
        info!("Loaded {} intents from {:?}", set.len(), path);
        Ok(set)
    }

    /// Reads the first notebook code cell containing `intents =` and
    /// deserializes its list literal. Python spellings (single quotes,
    /// `True`/`False`/`None`, trailing commas, `#` comments) are rewritten
    /// to JSON first. A notebook without such a cell gives an empty set.
    pub fn from_notebook_str(notebook: &str) -> Result<Self, AppError> {
        let notebook: Notebook = serde_json::from_str(notebook)?;

        for (index, cell) in notebook.cells.into_iter().enumerate() {
            if cell.cell_type != "code" {
                continue;
            }
            let source = cell.source.joined();
            if !source.contains("intents =") {
                continue;
            }
            let literal = extract_assigned_list(&source, "intents =").ok_or_else(|| {
                AppError::Validation("Notebook cell assigns intents without a list literal".into())
            })?;
            let intents: Vec<Intent> = match serde_json::from_str(literal) {
                Ok(intents) => intents,
                Err(_) => serde_json::from_str(&python_literal_to_json(literal)).map_err(|e| {
                    warn!("Notebook cell {} has an unreadable intents literal: {}", index, e);
                    AppError::from(e)
                })?,
            };
            return Ok(Self::new(intents));
        }

        warn!("Notebook contains no intents cell");
        Ok(Self::default())
    }

    pub fn load_notebook(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        let set = Self::from_notebook_str(&raw)?;
        info!("Loaded {} intents from notebook {:?}", set.len(), path);
        Ok(set)
    }
}

#[derive(Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<NotebookCell>,
}

#[derive(Deserialize)]
struct NotebookCell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn joined(&self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text.clone(),
        }
    }
}

/// Returns the balanced `[...]` literal following `marker`, skipping
/// brackets inside string literals.
fn extract_assigned_list<'a>(source: &'a str, marker: &str) -> Option<&'a str> {
    let after = source.find(marker)? + marker.len();
    let open = after + source[after..].find('[')?;

    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in source[open..].char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&source[open..open + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrites a Python list/dict literal as JSON. Anything that is not plain
/// data (calls, names) is left alone and fails to parse afterwards.
fn python_literal_to_json(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            quote @ ('"' | '\'') => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push_str("\\\\"),
                        },
                        c if c == quote => break,
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            '#' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            ']' | '}' => {
                out.truncate(out.trim_end().len());
                if out.ends_with(',') {
                    out.pop();
                }
                out.push(c);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(next) = chars.next_if(|&c| c.is_ascii_alphanumeric() || c == '_') {
                    word.push(next);
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTENTS_JSON: &str = r#"[
        {"tag": "greeting", "patterns": ["Hi", "Hello"], "responses": ["Hello!", "Hi there!"]},
        {"tag": "goodbye", "patterns": ["Bye"], "responses": ["Goodbye"]}
    ]"#;

    #[test]
    fn test_from_json_list() {
        let set = IntentSet::from_json_str(INTENTS_JSON).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.find_by_tag("goodbye").unwrap().responses, vec!["Goodbye"]);
    }

    #[test]
    fn test_from_json_wrapped() {
        let wrapped = format!("{{\"intents\": {}}}", INTENTS_JSON);
        let set = IntentSet::from_json_str(&wrapped).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_pattern_units_keep_order_and_tags() {
        let set = IntentSet::from_json_str(INTENTS_JSON).unwrap();
        let units = set.pattern_units();
        let flat: Vec<(&str, &str)> = units.iter().map(|u| (u.pattern, u.tag)).collect();
        assert_eq!(
            flat,
            vec![("Hi", "greeting"), ("Hello", "greeting"), ("Bye", "goodbye")]
        );
        assert_eq!(units[2].intent_index, 1);
    }

    #[test]
    fn test_notebook_cell_is_deserialized() {
        let notebook = serde_json::json!({
            "cells": [
                {"cell_type": "markdown", "source": ["intents = [not code]"]},
                {"cell_type": "code", "source": ["import random\n"]},
                {"cell_type": "code", "source": [
                    "intents = [\n",
                    "  {\"tag\": \"greeting\", \"patterns\": [\"Hi [there]\"], \"responses\": [\"Hello!\"]}\n",
                    "]\n",
                    "print(len(intents))\n"
                ]}
            ]
        });
        let set = IntentSet::from_notebook_str(&notebook.to_string()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().patterns, vec!["Hi [there]"]);
    }

    #[test]
    fn test_notebook_without_intents_is_empty() {
        let notebook = serde_json::json!({
            "cells": [{"cell_type": "code", "source": "x = 1"}]
        });
        let set = IntentSet::from_notebook_str(&notebook.to_string()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_notebook_code_is_never_evaluated() {
        let notebook = serde_json::json!({
            "cells": [{"cell_type": "code", "source": "intents = [__import__('os').system('rm -rf /')]"}]
        });
        assert!(IntentSet::from_notebook_str(&notebook.to_string()).is_err());
    }

    #[test]
    fn test_extract_assigned_list_unbalanced() {
        assert_eq!(extract_assigned_list("intents = [1, 2", "intents ="), None);
        assert_eq!(extract_assigned_list("intents = [1, [2]] + x", "intents ="), Some("[1, [2]]"));
    }

    #[test]
    fn test_notebook_python_literal_is_accepted() {
        let notebook = serde_json::json!({
            "cells": [{"cell_type": "code", "source": [
                "intents = [\n",
                "    # small talk\n",
                "    {'tag': 'greeting', 'patterns': ['Hi', \"What's up\"], 'responses': ['Hello!',],},\n",
                "    {'tag': 'quote', 'patterns': ['say \"cheese\"'], 'responses': ['It\\'s fine']},\n",
                "]\n"
            ]}]
        });
        let set = IntentSet::from_notebook_str(&notebook.to_string()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).unwrap().patterns, vec!["Hi", "What's up"]);
        assert_eq!(set.get(0).unwrap().responses, vec!["Hello!"]);
        assert_eq!(set.get(1).unwrap().patterns, vec!["say \"cheese\""]);
        assert_eq!(set.get(1).unwrap().responses, vec!["It's fine"]);
    }

    #[test]
    fn test_python_keywords_become_json() {
        assert_eq!(
            python_literal_to_json("[True, # yes\n False, None, 'a#b']"),
            "[true, \n false, null, \"a#b\"]"
        );
        assert_eq!(python_literal_to_json("[1, 2,\n ]"), "[1, 2]");
    }
}
