use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{BatchSource, NewQuizHistory, QuizHistory};
use quiz_core::time::fixed_now;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{AppServices, Clock, QuizError, QuizHistoryService, QuizRunner, QuizState};
use storage::repository::{QuizHistoryRepository, StorageError};

const BLOCKS: &str = "\
What is the capital of France?
A. Paris
B. London

Which planet is largest?
A. Mars
B. Jupiter

What gas do plants absorb?
A. Oxygen
B. Carbon dioxide
";

struct FailingHistories;

#[async_trait]
impl QuizHistoryRepository for FailingHistories {
    async fn append_history(
        &self,
        _record: NewQuizHistory,
        _created_at: DateTime<Utc>,
    ) -> Result<QuizHistory, StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn list_history(&self) -> Result<Vec<QuizHistory>, StorageError> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn finished_quiz_is_scored_timed_and_recorded() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let import = app
        .authoring()
        .create_from_text("Science", BLOCKS, BatchSource::TextInput, None)
        .await
        .unwrap();

    let mut runner = app.quiz_runner();
    runner
        .start_with_rng(
            &import.batch,
            import.questions.clone(),
            10,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
    assert_eq!(runner.session().len(), 3);
    assert!(runner.is_timer_running());

    // answer every question with its stored (placeholder) answer
    let expected: Vec<String> = runner
        .session()
        .questions()
        .iter()
        .map(|q| q.correct_answer.clone())
        .collect();
    for (i, answer) in expected.into_iter().enumerate() {
        runner.answer(i, answer).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(4_200)).await;
    let result = runner.finish().await.unwrap();

    assert_eq!(result.correct_answers, 3);
    assert!((result.percentage - 100.0).abs() < f64::EPSILON);
    assert_eq!(result.time_taken_secs, 4);
    assert!(!runner.is_timer_running());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(runner.elapsed_secs(), 4);

    let histories = app.history().list_history().await.unwrap();
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].batch_id(), import.batch.id());
    assert_eq!(histories[0].batch_title(), "Science");
    assert_eq!(histories[0].time_taken_secs(), 4);
    assert_eq!(histories[0].answers().len(), 3);
}

#[tokio::test]
async fn history_failure_does_not_hide_result() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let import = app
        .authoring()
        .create_from_text("Science", BLOCKS, BatchSource::TextInput, None)
        .await
        .unwrap();

    let history = Arc::new(QuizHistoryService::new(
        Clock::fixed(fixed_now()),
        Arc::new(FailingHistories),
    ));
    let mut runner = QuizRunner::new(history);
    runner.start(&import.batch, import.questions, 2).unwrap();

    let result = runner.finish().await.unwrap();
    assert_eq!(result.total_questions, 2);
    assert_eq!(result.correct_answers, 0);
    assert_eq!(runner.session().state(), QuizState::Finished);
}

#[tokio::test]
async fn reset_stops_timer_and_allows_restart() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let import = app
        .authoring()
        .create_from_text("Science", BLOCKS, BatchSource::TextInput, None)
        .await
        .unwrap();

    let mut runner = app.quiz_runner();
    runner
        .start(&import.batch, import.questions.clone(), 3)
        .unwrap();
    assert_eq!(
        runner.start(&import.batch, import.questions.clone(), 3),
        Err(QuizError::AlreadyInProgress)
    );

    runner.reset();
    assert!(!runner.is_timer_running());
    assert_eq!(runner.session().state(), QuizState::NotStarted);

    runner.start(&import.batch, import.questions, 1).unwrap();
    assert_eq!(runner.session().len(), 1);
    assert!(app.history().list_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn finish_without_start_is_rejected() {
    let app = AppServices::in_memory(Clock::default());
    let mut runner = app.quiz_runner();
    assert_eq!(runner.finish().await, Err(QuizError::NotInProgress));
}
