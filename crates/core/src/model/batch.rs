use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::BatchId;

/// Longest accepted batch title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Question limit stored for uploaded batches when none is given.
pub const DEFAULT_QUESTION_LIMIT: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchError {
    #[error("batch title cannot be empty")]
    EmptyTitle,

    #[error("batch title is {len} characters, the limit is {MAX_TITLE_LEN}")]
    TitleTooLong { len: usize },

    #[error("question limit must be > 0")]
    InvalidQuestionLimit,

    #[error("unknown batch source: {0}")]
    UnknownSource(String),
}

//
// ─── SOURCE ────────────────────────────────────────────────────────────────────
//

/// Where the questions of a batch came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    Pdf { file_name: String },
    TextInput,
    ManualEntry,
}

impl BatchSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchSource::Pdf { .. } => "pdf",
            BatchSource::TextInput => "text_input",
            BatchSource::ManualEntry => "manual_entry",
        }
    }

    /// Legacy `file_path` value exposed on the wire.
    #[must_use]
    pub fn file_path(&self) -> String {
        match self {
            BatchSource::Pdf { file_name } => format!("pdfs/{file_name}"),
            other => other.as_str().to_owned(),
        }
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            BatchSource::Pdf { file_name } => Some(file_name),
            _ => None,
        }
    }

    /// Rebuild a source from its persisted tag and optional file name.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::UnknownSource` for unrecognised tags.
    pub fn from_parts(tag: &str, file_name: Option<String>) -> Result<Self, BatchError> {
        match tag {
            "pdf" => Ok(BatchSource::Pdf {
                file_name: file_name.unwrap_or_default(),
            }),
            "text_input" => Ok(BatchSource::TextInput),
            "manual_entry" => Ok(BatchSource::ManualEntry),
            other => Err(BatchError::UnknownSource(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDraft {
    pub title: String,
    pub source: BatchSource,
    pub source_content: String,
    pub question_limit: Option<u32>,
}

impl BatchDraft {
    pub fn new(
        title: impl Into<String>,
        source: BatchSource,
        source_content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source,
            source_content: source_content.into(),
            question_limit: None,
        }
    }

    #[must_use]
    pub fn with_question_limit(mut self, limit: Option<u32>) -> Self {
        self.question_limit = limit;
        self
    }

    /// Validate the title and limit and stamp the creation time.
    ///
    /// # Errors
    ///
    /// Returns `BatchError` for blank or overlong titles and a zero limit.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedBatch, BatchError> {
        let title = validate_title(&self.title)?;
        let question_limit = match self.question_limit {
            Some(0) => return Err(BatchError::InvalidQuestionLimit),
            Some(limit) => limit,
            None => DEFAULT_QUESTION_LIMIT,
        };

        Ok(ValidatedBatch {
            title,
            source: self.source,
            source_content: self.source_content,
            question_limit,
            created_at: now,
        })
    }
}

fn validate_title(raw: &str) -> Result<String, BatchError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(BatchError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(BatchError::TitleTooLong { len });
    }
    Ok(title.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    pub title: String,
    pub source: BatchSource,
    pub source_content: String,
    pub question_limit: u32,
    pub created_at: DateTime<Utc>,
}

impl ValidatedBatch {
    pub fn assign_id(self, id: BatchId, question_count: u32) -> Batch {
        Batch {
            id,
            title: self.title,
            source: self.source,
            source_content: self.source_content,
            question_count,
            question_limit: self.question_limit,
            created_at: self.created_at,
        }
    }
}

//
// ─── BATCH ─────────────────────────────────────────────────────────────────────
//

/// A named collection of questions from one upload or authoring session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: BatchId,
    title: String,
    source: BatchSource,
    source_content: String,
    question_count: u32,
    question_limit: u32,
    created_at: DateTime<Utc>,
}

impl Batch {
    /// Rehydrate a batch from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `BatchError` if the stored title or limit is invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: BatchId,
        title: String,
        source: BatchSource,
        source_content: String,
        question_count: u32,
        question_limit: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BatchError> {
        let title = validate_title(&title)?;
        if question_limit == 0 {
            return Err(BatchError::InvalidQuestionLimit);
        }
        Ok(Self {
            id,
            title,
            source,
            source_content,
            question_count,
            question_limit,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> BatchId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn source(&self) -> &BatchSource {
        &self.source
    }

    #[must_use]
    pub fn source_content(&self) -> &str {
        &self.source_content
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn question_limit(&self) -> u32 {
        self.question_limit
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
