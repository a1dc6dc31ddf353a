use quiz_core::model::{BatchSource, QuestionDraft};
use quiz_core::time::fixed_now;
use services::{AnswerUpdate, AppServices, AuthoringError, Clock};

const BLOCKS: &str = "\
What is the capital of France?
A. London
B. Paris

Which planet is largest?
A. Mars
B. Jupiter
";

#[tokio::test]
async fn upload_review_and_list_flow() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let authoring = app.authoring();

    let import = authoring
        .create_from_text(
            "Upload",
            BLOCKS,
            BatchSource::Pdf {
                file_name: "quiz.pdf".into(),
            },
            Some(5),
        )
        .await
        .unwrap();
    assert_eq!(import.questions[0].correct_answer, "London");

    let (batch, updated) = authoring
        .save_reviewed_answers(&[
            AnswerUpdate {
                question_id: import.questions[0].id,
                correct_answer: "Paris".into(),
            },
            AnswerUpdate {
                question_id: import.questions[1].id,
                correct_answer: "Jupiter".into(),
            },
        ])
        .await
        .unwrap();
    assert_eq!(batch.id(), import.batch.id());
    assert_eq!(updated, 2);

    let stored = authoring.get_batch(batch.id()).await.unwrap();
    let answers: Vec<&str> = stored
        .questions
        .iter()
        .map(|q| q.correct_answer.as_str())
        .collect();
    assert_eq!(answers, ["Paris", "Jupiter"]);
    assert_eq!(stored.batch.source().file_path(), "pdfs/quiz.pdf");
}

#[tokio::test]
async fn bulk_paste_then_manual_save() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let authoring = app.authoring();

    let mut drafts = authoring.parse_bulk(BLOCKS).unwrap();
    let err = authoring
        .create_manual("Pasted", drafts.clone(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthoringError::InvalidQuestion { index: 1, .. }));

    drafts[0].correct_answer = "Paris".into();
    drafts[1].correct_answer = "Jupiter".into();
    drafts.push(QuestionDraft::text_answer("Who wrote Hamlet?", "Shakespeare"));

    let created = authoring
        .create_manual("Pasted", drafts, Some(2))
        .await
        .unwrap();
    assert_eq!(created.batch.question_count(), 3);
    assert_eq!(created.batch.question_limit(), 2);

    let listed = authoring.list_batches_with_questions().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].questions.len(), 3);
}

#[tokio::test]
async fn delete_removes_batch_questions_and_history() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let authoring = app.authoring();
    let import = authoring
        .create_from_text("Doomed", BLOCKS, BatchSource::TextInput, None)
        .await
        .unwrap();

    let mut runner = app.quiz_runner();
    runner
        .start(&import.batch, import.questions.clone(), 2)
        .unwrap();
    runner.finish().await.unwrap();
    assert_eq!(app.history().list_history().await.unwrap().len(), 1);

    let deleted = authoring.delete_batches(&[import.batch.id()]).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(authoring.get_batch(import.batch.id()).await.unwrap_err().is_not_found());
    assert!(app.history().list_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn save_reviewed_answers_with_unknown_ids_is_not_found() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    let err = app
        .authoring()
        .save_reviewed_answers(&[AnswerUpdate {
            question_id: quiz_core::model::QuestionId::new(5),
            correct_answer: "x".into(),
        }])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthoringError::QuestionsNotFound));
}
