mod batch;
mod history;
mod ids;
mod question;

pub use ids::{BatchId, HistoryId, ParseIdError, QuestionId};

pub use batch::{
    Batch, BatchDraft, BatchError, BatchSource, DEFAULT_QUESTION_LIMIT, MAX_TITLE_LEN,
    ValidatedBatch,
};
pub use history::{AnswerMap, HistoryError, NewQuizHistory, QuizHistory, score_percentage};
pub use question::{
    Difficulty, Question, QuestionDraft, QuestionError, QuestionKind, ValidatedQuestion,
};
