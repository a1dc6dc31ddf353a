use chrono::Duration;
use quiz_core::model::{
    AnswerMap, BatchDraft, BatchId, BatchSource, Difficulty, NewQuizHistory, QuestionDraft,
    QuestionKind, ValidatedBatch, ValidatedQuestion,
};
use quiz_core::time::fixed_now;
use storage::repository::{BatchRepository, QuizHistoryRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn pdf_batch(title: &str) -> ValidatedBatch {
    BatchDraft::new(
        title,
        BatchSource::Pdf {
            file_name: "cells.pdf".into(),
        },
        "Cells are the unit of life.",
    )
    .with_question_limit(Some(5))
    .validate(fixed_now())
    .unwrap()
}

fn questions() -> Vec<ValidatedQuestion> {
    vec![
        QuestionDraft::multiple_choice(
            "What is the capital of France?",
            vec!["Paris".into(), "London".into()],
            "Paris",
        )
        .validate()
        .unwrap(),
        QuestionDraft::text_answer("Name the powerhouse of the cell?", "Mitochondria")
            .with_difficulty(Difficulty::Hard)
            .validate()
            .unwrap(),
    ]
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_batch_and_questions() {
    let repo = connect("memdb_roundtrip").await;

    let (batch, stored) = repo
        .create_batch(pdf_batch("Biology"), questions())
        .await
        .unwrap();
    assert_eq!(batch.question_count(), 2);

    let fetched = repo.get_batch(batch.id()).await.unwrap().expect("batch");
    assert_eq!(fetched, batch);
    assert_eq!(fetched.source().file_path(), "pdfs/cells.pdf");
    assert_eq!(fetched.question_limit(), 5);

    let fetched_questions = repo.get_questions(batch.id()).await.unwrap();
    assert_eq!(fetched_questions, stored);
    assert_eq!(
        fetched_questions[0].kind,
        QuestionKind::MultipleChoice {
            choices: vec!["Paris".into(), "London".into()]
        }
    );
    assert_eq!(fetched_questions[1].kind, QuestionKind::TextAnswer);
    assert_eq!(fetched_questions[1].difficulty, Difficulty::Hard);
}

#[tokio::test]
async fn sqlite_lists_batches_newest_first() {
    let repo = connect("memdb_listing").await;

    let older = pdf_batch("Older");
    let mut newer = pdf_batch("Newer");
    newer.created_at = fixed_now() + Duration::hours(1);

    repo.create_batch(older, vec![]).await.unwrap();
    repo.create_batch(newer, vec![]).await.unwrap();

    let titles: Vec<String> = repo
        .list_batches()
        .await
        .unwrap()
        .iter()
        .map(|b| b.title().to_owned())
        .collect();
    assert_eq!(titles, ["Newer", "Older"]);
}

#[tokio::test]
async fn sqlite_updates_correct_answer() {
    let repo = connect("memdb_update_answer").await;
    let (_, stored) = repo
        .create_batch(pdf_batch("Geo"), questions())
        .await
        .unwrap();

    assert!(repo.update_correct_answer(stored[0].id, "London").await.unwrap());
    let q = repo.get_question(stored[0].id).await.unwrap().unwrap();
    assert_eq!(q.correct_answer, "London");

    let missing = quiz_core::model::QuestionId::new(9_999);
    assert!(!repo.update_correct_answer(missing, "x").await.unwrap());
}

#[tokio::test]
async fn sqlite_delete_cascades_to_questions_and_histories() {
    let repo = connect("memdb_cascade").await;
    let (batch, stored) = repo
        .create_batch(pdf_batch("Doomed"), questions())
        .await
        .unwrap();

    let mut answers = AnswerMap::new();
    answers.insert(0, "Paris".to_owned());
    let record = NewQuizHistory::new(batch.id(), batch.title(), 2, 1, 50.0, 75, answers).unwrap();
    let history = repo.append_history(record, fixed_now()).await.unwrap();
    assert_eq!(history.answers().get(&0).map(String::as_str), Some("Paris"));
    assert_eq!(repo.list_history().await.unwrap(), vec![history]);

    let deleted = repo
        .delete_batches(&[batch.id(), BatchId::new(4_242)])
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    assert!(repo.get_batch(batch.id()).await.unwrap().is_none());
    assert!(repo.get_question(stored[0].id).await.unwrap().is_none());
    assert!(repo.list_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_history_for_missing_batch_is_not_found() {
    let repo = connect("memdb_history_fk").await;
    let record =
        NewQuizHistory::new(BatchId::new(77), "Ghost", 1, 0, 0.0, 5, AnswerMap::new()).unwrap();

    let err = repo.append_history(record, fixed_now()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn storage_sqlite_wires_both_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");

    let (batch, _) = storage
        .batches
        .create_batch(pdf_batch("Wired"), vec![])
        .await
        .unwrap();
    let record =
        NewQuizHistory::new(batch.id(), "Wired", 0, 0, 0.0, 0, AnswerMap::new()).unwrap();
    storage
        .histories
        .append_history(record, fixed_now())
        .await
        .unwrap();

    assert_eq!(storage.histories.list_history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}
