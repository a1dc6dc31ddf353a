use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use quiz_core::TextParser;
use quiz_core::model::{
    Batch, BatchDraft, BatchId, BatchSource, Question, QuestionDraft, QuestionId,
    ValidatedQuestion,
};
use storage::repository::BatchRepository;
use tracing::{debug, info};

use crate::Clock;
use crate::error::{AuthoringError, IdList};

/// Stored as the source content of manually authored batches.
pub const MANUAL_CONTENT: &str = "Manual question entry";

/// A batch together with its questions in authoring order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWithQuestions {
    pub batch: Batch,
    pub questions: Vec<Question>,
}

/// Result of turning raw text into a stored batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TextImport {
    pub batch: Batch,
    pub questions: Vec<Question>,
    /// True when multiple-choice blocks were detected, false when prompts
    /// were generated from sentences.
    pub structured: bool,
}

/// A reviewed correct answer for one stored question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerUpdate {
    pub question_id: QuestionId,
    pub correct_answer: String,
}

/// Orchestrates parsing and manual authoring into persisted batches.
#[derive(Clone)]
pub struct BatchAuthoringService {
    clock: Clock,
    parser: TextParser,
    batches: Arc<dyn BatchRepository>,
}

impl BatchAuthoringService {
    #[must_use]
    pub fn new(clock: Clock, batches: Arc<dyn BatchRepository>) -> Self {
        Self {
            clock,
            parser: TextParser::new(),
            batches,
        }
    }

    /// Parse raw text and persist every candidate as one batch.
    ///
    /// Text without any usable question still produces an empty batch.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Batch` for an invalid title or limit, and
    /// `AuthoringError::Storage` if persistence fails.
    pub async fn create_from_text(
        &self,
        title: &str,
        raw_text: &str,
        source: BatchSource,
        question_limit: Option<u32>,
    ) -> Result<TextImport, AuthoringError> {
        let outcome = self.parser.parse_with_strategy(raw_text);
        let structured = outcome.is_structured();
        let questions = validate_all(outcome.candidates)?;

        let draft = BatchDraft::new(title, source, raw_text).with_question_limit(question_limit);
        let validated = draft.validate(self.clock.now())?;
        let (batch, questions) = self.batches.create_batch(validated, questions).await?;

        info!(
            batch_id = %batch.id(),
            source = batch.source().as_str(),
            questions = questions.len(),
            structured,
            "created batch from text"
        );

        Ok(TextImport {
            batch,
            questions,
            structured,
        })
    }

    /// Persist manually authored questions as one batch.
    ///
    /// The question limit defaults to the number of questions.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoQuestions` for an empty list,
    /// `AuthoringError::InvalidQuestion` naming the first bad question, and
    /// `AuthoringError::Storage` if persistence fails. Nothing is stored on
    /// error.
    pub async fn create_manual(
        &self,
        title: &str,
        questions: Vec<QuestionDraft>,
        question_limit: Option<u32>,
    ) -> Result<BatchWithQuestions, AuthoringError> {
        if questions.is_empty() {
            return Err(AuthoringError::NoQuestions);
        }
        let questions = validate_all(questions)?;

        let limit = match question_limit {
            Some(limit) => limit,
            None => u32::try_from(questions.len()).unwrap_or(u32::MAX),
        };
        let validated = BatchDraft::new(title, BatchSource::ManualEntry, MANUAL_CONTENT)
            .with_question_limit(Some(limit))
            .validate(self.clock.now())?;

        let (batch, questions) = self.batches.create_batch(validated, questions).await?;
        info!(batch_id = %batch.id(), questions = questions.len(), "created manual batch");

        Ok(BatchWithQuestions { batch, questions })
    }

    /// Turn pasted multiple-choice blocks into drafts for manual review.
    ///
    /// Unlike uploads, the correct answer is left empty so the author has to
    /// pick one before saving.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NothingParsed` when no block is found.
    pub fn parse_bulk(&self, text: &str) -> Result<Vec<QuestionDraft>, AuthoringError> {
        let drafts: Vec<QuestionDraft> = self
            .parser
            .parse_structured(text)
            .into_iter()
            .map(|mut draft| {
                draft.correct_answer.clear();
                draft
            })
            .collect();

        if drafts.is_empty() {
            return Err(AuthoringError::NothingParsed);
        }
        Ok(drafts)
    }

    /// Overwrite reviewed correct answers within one batch.
    ///
    /// Question ids that do not belong to the batch are skipped. Every answer
    /// is checked before anything is written. Returns the number of questions
    /// updated.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::BatchNotFound` for an unknown batch,
    /// `AuthoringError::InvalidAnswer` for a blank answer or one that is not
    /// among a question's choices, and `AuthoringError::Storage` on
    /// persistence failures.
    pub async fn update_answers(
        &self,
        batch_id: BatchId,
        updates: &[AnswerUpdate],
    ) -> Result<usize, AuthoringError> {
        if self.batches.get_batch(batch_id).await?.is_none() {
            return Err(AuthoringError::BatchNotFound(batch_id));
        }

        let mut by_id: HashMap<QuestionId, Question> = self
            .batches
            .get_questions(batch_id)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();

        let mut pending = Vec::with_capacity(updates.len());
        for update in updates {
            let Some(question) = by_id.get_mut(&update.question_id) else {
                debug!(question_id = %update.question_id, %batch_id, "skipping unknown question");
                continue;
            };
            question
                .set_correct_answer(&update.correct_answer)
                .map_err(|source| AuthoringError::InvalidAnswer {
                    id: update.question_id,
                    source,
                })?;
            pending.push((question.id, question.correct_answer.clone()));
        }

        let mut updated = 0;
        for (id, answer) in pending {
            if self.batches.update_correct_answer(id, &answer).await? {
                updated += 1;
            }
        }

        info!(%batch_id, updated, "updated correct answers");
        Ok(updated)
    }

    /// Save reviewed answers when the caller only knows question ids.
    ///
    /// The batch is the one owning the first known question.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoQuestions` for an empty list,
    /// `AuthoringError::QuestionsNotFound` when no id is known, and the errors
    /// of [`BatchAuthoringService::update_answers`].
    pub async fn save_reviewed_answers(
        &self,
        updates: &[AnswerUpdate],
    ) -> Result<(Batch, usize), AuthoringError> {
        if updates.is_empty() {
            return Err(AuthoringError::NoQuestions);
        }

        let mut owner = None;
        for update in updates {
            if let Some(question) = self.batches.get_question(update.question_id).await? {
                owner = Some(question.batch_id);
                break;
            }
        }
        let batch_id = owner.ok_or(AuthoringError::QuestionsNotFound)?;

        let updated = self.update_answers(batch_id, updates).await?;
        let batch = self
            .batches
            .get_batch(batch_id)
            .await?
            .ok_or(AuthoringError::BatchNotFound(batch_id))?;
        Ok((batch, updated))
    }

    /// Delete batches with their questions and quiz history.
    ///
    /// Known ids are deleted even when some ids are missing; the missing ones
    /// are reported afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoBatchIds` for an empty set,
    /// `AuthoringError::BatchesNotFound` listing unknown ids, and
    /// `AuthoringError::Storage` on persistence failures.
    pub async fn delete_batches(&self, ids: &[BatchId]) -> Result<u64, AuthoringError> {
        let ids: BTreeSet<BatchId> = ids.iter().copied().collect();
        if ids.is_empty() {
            return Err(AuthoringError::NoBatchIds);
        }

        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            if self.batches.get_batch(id).await?.is_some() {
                found.push(id);
            } else {
                missing.push(id);
            }
        }

        let deleted = self.batches.delete_batches(&found).await?;
        info!(deleted, missing = missing.len(), "deleted batches");

        if missing.is_empty() {
            Ok(deleted)
        } else {
            Err(AuthoringError::BatchesNotFound(IdList(missing)))
        }
    }

    /// List batches, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Storage` if repository access fails.
    pub async fn list_batches(&self) -> Result<Vec<Batch>, AuthoringError> {
        Ok(self.batches.list_batches().await?)
    }

    /// Fetch a batch with its questions.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::BatchNotFound` when the batch does not exist.
    pub async fn get_batch(&self, id: BatchId) -> Result<BatchWithQuestions, AuthoringError> {
        let batch = self
            .batches
            .get_batch(id)
            .await?
            .ok_or(AuthoringError::BatchNotFound(id))?;
        let questions = self.batches.get_questions(id).await?;
        Ok(BatchWithQuestions { batch, questions })
    }

    /// Every batch with its questions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Storage` if repository access fails.
    pub async fn list_batches_with_questions(
        &self,
    ) -> Result<Vec<BatchWithQuestions>, AuthoringError> {
        let batches = self.batches.list_batches().await?;
        let mut out = Vec::with_capacity(batches.len());
        for batch in batches {
            let questions = self.batches.get_questions(batch.id()).await?;
            out.push(BatchWithQuestions { batch, questions });
        }
        Ok(out)
    }
}

fn validate_all(drafts: Vec<QuestionDraft>) -> Result<Vec<ValidatedQuestion>, AuthoringError> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| {
            draft
                .validate()
                .map_err(|source| AuthoringError::InvalidQuestion {
                    index: i + 1,
                    source,
                })
        })
        .collect()
}
