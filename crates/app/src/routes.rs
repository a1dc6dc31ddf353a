use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use quiz_core::model::{BatchError, BatchId, BatchSource, MAX_TITLE_LEN, NewQuizHistory};
use services::{AuthoringError, HistoryServiceError};

use crate::AppState;
use crate::dto::{
    AppJson, AppPath, BatchSummaryDto, CreateManualRequest, DeleteBatchesRequest, HistoryDto,
    ModuleDto, QuestionDto, SaveBatchRequest, SaveHistoryRequest, questions_to_dto,
};
use crate::error::{AppError, AppResult};
use crate::extract::extract_blocking;

/// Build the HTTP router over `state`.
pub fn router(state: AppState) -> Router {
    let limit = state.upload.limit_bytes;

    let api = Router::new()
        .route("/upload-pdf", post(upload_pdf))
        .route("/batches", get(list_batches))
        .route("/modules", get(list_modules))
        .route("/questions/{batch_id}", get(list_questions))
        .route("/save-batch", post(save_batch))
        .route("/create-manual-questions", post(create_manual_questions))
        .route("/save-quiz-history", post(save_quiz_history))
        .route("/quiz-history", get(list_quiz_history))
        .route("/delete-batches", delete(delete_batches));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

//
// ─── UPLOAD ────────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    text: Option<String>,
    question_limit: Option<u32>,
    pdf: Option<(String, Vec<u8>)>,
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => form.title = Some(field.text().await?),
            Some("text") => form.text = Some(field.text().await?),
            Some("question_limit") => {
                let raw = field.text().await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let limit = raw.parse().map_err(|_| {
                        AppError::Validation(format!("question_limit must be a positive number, got {raw:?}"))
                    })?;
                    form.question_limit = Some(limit);
                }
            }
            Some("pdf") => {
                let name = field
                    .file_name()
                    .and_then(|n| FsPath::new(n).file_name())
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload.pdf")
                    .to_owned();
                let bytes = field.bytes().await?;
                form.pdf = Some((name, bytes.to_vec()));
            }
            _ => {}
        }
    }
    Ok(form)
}

fn check_title(title: &str) -> AppResult<()> {
    let err = if title.trim().is_empty() {
        BatchError::EmptyTitle
    } else if title.chars().count() > MAX_TITLE_LEN {
        BatchError::TitleTooLong {
            len: title.chars().count(),
        }
    } else {
        return Ok(());
    };
    Err(AppError::Validation(err.to_string()))
}

async fn upload_pdf(State(state): State<AppState>, multipart: Multipart) -> AppResult<Json<Value>> {
    let form = read_upload_form(multipart).await?;
    let title = form.title.unwrap_or_default();
    check_title(&title)?;

    let (content, source) = match (form.pdf, form.text) {
        (Some((name, bytes)), _) => {
            let content = extract_blocking(Arc::clone(&state.extractor), bytes.clone()).await?;
            let stored_name = format!("{}_{name}", chrono::Utc::now().timestamp());
            if let Some(dir) = &state.upload.dir {
                store_pdf(dir, &stored_name, &bytes).await?;
            }
            (content, BatchSource::Pdf { file_name: stored_name })
        }
        (None, Some(text)) => (text, BatchSource::TextInput),
        (None, None) => {
            return Err(AppError::Validation(
                "Please provide either a PDF file or text content".to_owned(),
            ));
        }
    };

    let import = state
        .services
        .authoring()
        .create_from_text(&title, &content, source, form.question_limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "module": ModuleDto::from(&import.batch),
        "questions": questions_to_dto(&import.questions),
        "parsed": import.structured,
    })))
}

async fn store_pdf(dir: &FsPath, stored_name: &str, bytes: &[u8]) -> AppResult<()> {
    let pdf_dir = dir.join("pdfs");
    tokio::fs::create_dir_all(&pdf_dir)
        .await
        .map_err(|e| AppError::Internal(format!("create {}: {e}", pdf_dir.display())))?;
    let path = pdf_dir.join(stored_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::Internal(format!("write {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "stored uploaded pdf");
    Ok(())
}

//
// ─── BATCHES ───────────────────────────────────────────────────────────────────
//

async fn list_batches(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let batches = state.services.authoring().list_batches().await?;
    let batches: Vec<BatchSummaryDto> = batches.iter().map(BatchSummaryDto::from).collect();
    Ok(Json(json!({
        "success": true,
        "batches": batches,
    })))
}

async fn list_modules(State(state): State<AppState>) -> AppResult<Json<Vec<ModuleDto>>> {
    let modules = state
        .services
        .authoring()
        .list_batches_with_questions()
        .await?;
    Ok(Json(modules.iter().map(ModuleDto::from).collect()))
}

async fn list_questions(
    State(state): State<AppState>,
    AppPath(batch_id): AppPath<u64>,
) -> AppResult<Json<Vec<QuestionDto>>> {
    let item = state
        .services
        .authoring()
        .get_batch(BatchId::new(batch_id))
        .await?;
    Ok(Json(questions_to_dto(&item.questions)))
}

async fn save_batch(
    State(state): State<AppState>,
    AppJson(req): AppJson<SaveBatchRequest>,
) -> AppResult<Json<Value>> {
    check_title(&req.title)?;
    let (batch, updated) = state
        .services
        .authoring()
        .save_reviewed_answers(&req.updates())
        .await?;
    tracing::debug!(batch_id = %batch.id(), updated, "saved reviewed batch");

    Ok(Json(json!({
        "success": true,
        "message": "Batch saved successfully",
        "batch": {
            "id": batch.id().value(),
            "title": req.title,
            "question_count": req.questions.len(),
        },
    })))
}

async fn create_manual_questions(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateManualRequest>,
) -> AppResult<Json<Value>> {
    let drafts = req
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            q.into_draft().map_err(|source| AuthoringError::InvalidQuestion {
                index: i + 1,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let created = state
        .services
        .authoring()
        .create_manual(&req.title, drafts, req.question_limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "module": ModuleDto::from(&created.batch),
        "questions": questions_to_dto(&created.questions),
    })))
}

async fn delete_batches(
    State(state): State<AppState>,
    AppJson(req): AppJson<DeleteBatchesRequest>,
) -> AppResult<Json<Value>> {
    let deleted = state
        .services
        .authoring()
        .delete_batches(&req.ids())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Batches deleted successfully",
        "deleted": deleted,
    })))
}

//
// ─── HISTORY ───────────────────────────────────────────────────────────────────
//

async fn save_quiz_history(
    State(state): State<AppState>,
    AppJson(req): AppJson<SaveHistoryRequest>,
) -> AppResult<Json<Value>> {
    let record = NewQuizHistory::new(
        BatchId::new(req.pdf_module_id),
        req.batch_title,
        req.total_questions,
        req.correct_answers,
        req.percentage,
        req.time_taken,
        req.answers,
    )
    .map_err(HistoryServiceError::from)?;

    let history = state.services.history().record(record).await?;
    Ok(Json(json!({
        "success": true,
        "history": HistoryDto::new(&history, None),
    })))
}

async fn list_quiz_history(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let histories = state.services.history().list_history().await?;
    let batches: HashMap<BatchId, _> = state
        .services
        .authoring()
        .list_batches()
        .await?
        .into_iter()
        .map(|b| (b.id(), b))
        .collect();

    let histories: Vec<HistoryDto> = histories
        .iter()
        .map(|h| HistoryDto::new(h, batches.get(&h.batch_id())))
        .collect();
    Ok(Json(json!({
        "success": true,
        "histories": histories,
    })))
}

