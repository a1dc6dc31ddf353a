#![forbid(unsafe_code)]

pub mod app_services;
pub mod authoring_service;
pub mod error;
pub mod history_service;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use authoring_service::{AnswerUpdate, BatchAuthoringService, BatchWithQuestions, TextImport};
pub use error::{AppServicesError, AuthoringError, HistoryServiceError, QuizError};
pub use history_service::QuizHistoryService;
pub use quiz::{QuizResult, QuizRunner, QuizSession, QuizState, QuizTimer, format_elapsed};
