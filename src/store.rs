//! In-memory question store.
//!
//! Provides a thread-safe collection of quiz records with:
//! - Store-assigned unique ids
//! - Field-level validation on create and update
//! - Stable id-ordered listing
//! - Optional preloading from a TOML questions file

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, trace, warn};

/// A single quiz record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    /// Store-assigned unique id
    pub id: u32,
    /// The question text
    pub question: String,
    /// The expected answer
    pub answer: String,
}

/// Question store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No quiz exists with the given id
    NotFound(u32),
    /// The submitted fields were rejected, one message per offending field
    Invalid(Vec<String>),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "There is no quiz with id={}", id),
            StoreError::Invalid(messages) => {
                write!(f, "Invalid quiz: {}", messages.join(", "))
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Entry shape of the TOML questions file: `[[quiz]]` tables
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    quiz: Vec<SeedQuiz>,
}

#[derive(Debug, Deserialize)]
struct SeedQuiz {
    question: String,
    answer: String,
}

/// Seed file loading errors
#[derive(Debug)]
pub enum SeedError {
    FileRead(std::path::PathBuf, std::io::Error),
    TomlParse(std::path::PathBuf, toml::de::Error),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::FileRead(path, e) => {
                write!(f, "Failed to read questions file '{}': {}", path.display(), e)
            }
            SeedError::TomlParse(path, e) => {
                write!(f, "Failed to parse questions file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for SeedError {}

/// Thread-safe in-memory question store
pub struct QuizStore {
    /// The actual records, keyed by id so listing is id-ordered
    data: RwLock<BTreeMap<u32, Quiz>>,
    /// Next id to assign
    next_id: AtomicU32,
}

impl QuizStore {
    /// Create a new empty store
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            data: RwLock::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
        })
    }

    /// Validate quiz fields, collecting one message per offending field
    fn validate(question: &str, answer: &str) -> Result<(), StoreError> {
        let mut messages = Vec::new();
        if question.trim().is_empty() {
            messages.push("question must not be empty".to_string());
        }
        if answer.trim().is_empty() {
            messages.push("answer must not be empty".to_string());
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Invalid(messages))
        }
    }

    /// Snapshot of all quizzes in ascending id order
    pub fn list(&self) -> Vec<Quiz> {
        let data = self.data.read().unwrap();
        data.values().cloned().collect()
    }

    /// Fetch a single quiz by id
    pub fn get(&self, id: u32) -> Option<Quiz> {
        let data = self.data.read().unwrap();
        data.get(&id).cloned()
    }

    /// Create a new quiz, assigning the next id
    pub fn create(&self, question: &str, answer: &str) -> Result<Quiz, StoreError> {
        Self::validate(question, answer)?;

        let quiz = Quiz {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            question: question.to_string(),
            answer: answer.to_string(),
        };

        let mut data = self.data.write().unwrap();
        data.insert(quiz.id, quiz.clone());
        trace!(id = quiz.id, "Quiz created");
        Ok(quiz)
    }

    /// Replace the question and answer of an existing quiz
    pub fn update(&self, id: u32, question: &str, answer: &str) -> Result<Quiz, StoreError> {
        Self::validate(question, answer)?;

        let mut data = self.data.write().unwrap();
        // The id may have been deleted by another session since it was
        // validated; that surfaces as NotFound, never a panic.
        let quiz = data.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        quiz.question = question.to_string();
        quiz.answer = answer.to_string();
        let updated = quiz.clone();
        trace!(id, "Quiz updated");
        Ok(updated)
    }

    /// Delete a quiz. Idempotent: deleting an absent id succeeds.
    /// Returns whether a record was actually removed.
    pub fn delete(&self, id: u32) -> bool {
        let mut data = self.data.write().unwrap();
        let removed = data.remove(&id).is_some();
        if removed {
            trace!(id, "Quiz deleted");
        }
        removed
    }

    /// Number of quizzes currently stored
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Preload questions from a TOML file. Entries that fail validation are
    /// skipped with a warning. Returns the number of quizzes loaded.
    pub fn load_questions(&self, path: &Path) -> Result<usize, SeedError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SeedError::FileRead(path.to_path_buf(), e))?;
        let seed: SeedFile = toml::from_str(&contents)
            .map_err(|e| SeedError::TomlParse(path.to_path_buf(), e))?;

        let mut loaded = 0;
        for entry in &seed.quiz {
            match self.create(&entry.question, &entry.answer) {
                Ok(_) => loaded += 1,
                Err(e) => {
                    warn!(question = %entry.question, error = %e, "Skipping invalid seed entry");
                }
            }
        }

        info!(count = loaded, path = %path.display(), "Loaded questions");
        Ok(loaded)
    }
}
