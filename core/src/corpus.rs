//! Corpus entry parsing.
//!
//! Accepts both the simplified corpus shape (`lemma`, string `forms`/`senses`)
//! and raw Wikidata lexemes (`lemmas.en.value`, `forms[].representations`,
//! `senses[].glosses`).

use crate::error::BuildError;
use crate::index::{DocId, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const LEXEME_URL_PREFIX: &str = "https://www.wikidata.org/wiki/Lexeme:";
const ENGLISH: &str = "en";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Representation {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormEntry {
    Plain(String),
    Rich { representations: HashMap<String, Representation> },
    Other(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SenseEntry {
    Plain(String),
    Rich { glosses: HashMap<String, Representation> },
    Other(Value),
}

/// One corpus entry as it appears on disk. Fields of the wrong type read as
/// absent instead of rejecting the entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lemma: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub lemmas: HashMap<String, Representation>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub forms: Vec<FormEntry>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub senses: Vec<SenseEntry>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_map<'de, D: Deserializer<'de>>(d: D) -> Result<HashMap<String, Representation>, D::Error> {
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(HashMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(lang, v)| serde_json::from_value(v).ok().map(|r| (lang, r)))
        .collect())
}

fn lenient_list<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Vec<T>, D::Error> {
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect())
}

impl RawEntry {
    /// English headword, if the entry has one.
    pub fn headword(&self) -> Option<&str> {
        let lemma = self.lemma.as_deref().filter(|s| !s.is_empty());
        lemma.or_else(|| english(&self.lemmas))
    }

    pub fn form_values(&self) -> Vec<&str> {
        self.forms
            .iter()
            .filter_map(|f| match f {
                FormEntry::Plain(s) => Some(s.as_str()),
                FormEntry::Rich { representations } => english(representations),
                FormEntry::Other(_) => None,
            })
            .collect()
    }

    pub fn sense_values(&self) -> Vec<&str> {
        self.senses
            .iter()
            .filter_map(|s| match s {
                SenseEntry::Plain(s) => Some(s.as_str()),
                SenseEntry::Rich { glosses } => english(glosses),
                SenseEntry::Other(_) => None,
            })
            .collect()
    }

    pub fn url_or_default(&self) -> String {
        match (&self.url, &self.id) {
            (Some(url), _) => url.clone(),
            (None, Some(id)) if !id.is_empty() => format!("{LEXEME_URL_PREFIX}{id}"),
            _ => String::new(),
        }
    }

    /// Build the forward-index record. `None` when there is no English headword.
    pub fn to_document(&self, doc_id: DocId) -> Option<Document> {
        let title = self.headword()?.to_string();
        Some(Document {
            doc_id,
            title,
            language: self.language.clone().unwrap_or_else(|| ENGLISH.to_string()),
            forms: self.form_values().join(" "),
            senses: self.sense_values().join(";"),
            url: self.url_or_default(),
            vector: None,
        })
    }

    /// Reduce a raw lexeme to the simplified corpus shape.
    pub fn simplify(&self) -> Option<SimplifiedLexeme> {
        let lemma = self.headword()?.to_string();
        let forms: Vec<String> = self.form_values().into_iter().map(str::to_string).collect();
        let senses: Vec<String> = self.sense_values().into_iter().map(str::to_string).collect();
        let combined_text = std::iter::once(lemma.as_str())
            .chain(forms.iter().map(String::as_str))
            .chain(senses.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Some(SimplifiedLexeme {
            id: self.id.clone(),
            language: ENGLISH.to_string(),
            lemma,
            forms,
            senses,
            combined_text,
            url: self.url_or_default(),
        })
    }
}

fn english(reps: &HashMap<String, Representation>) -> Option<&str> {
    reps.get(ENGLISH).and_then(|r| r.value.as_deref()).filter(|s| !s.is_empty())
}

/// The corpus entry shape written by `lexi simplify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedLexeme {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub language: String,
    pub lemma: String,
    pub forms: Vec<String>,
    pub senses: Vec<String>,
    pub combined_text: String,
    pub url: String,
}

/// `"L<digits>"` -> digits. Anything else is `None`.
pub fn parse_lexeme_id(id: &str) -> Option<DocId> {
    let digits = id.strip_prefix('L')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Read the corpus file and return its top-level array elements.
pub fn read_corpus(path: &Path) -> Result<Vec<Value>, BuildError> {
    let file = File::open(path).map_err(|source| BuildError::Io { path: path.to_path_buf(), source })?;
    let json: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| BuildError::Json { path: path.to_path_buf(), source })?;
    match json {
        Value::Array(entries) => Ok(entries),
        _ => Err(BuildError::NotAnArray { path: path.to_path_buf() }),
    }
}
