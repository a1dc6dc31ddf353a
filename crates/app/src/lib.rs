#![forbid(unsafe_code)]

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use services::AppServices;

use crate::config::UploadConfig;
use crate::extract::TextExtractor;

pub use routes::router;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub extractor: Arc<dyn TextExtractor>,
    pub upload: UploadConfig,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices, extractor: Arc<dyn TextExtractor>, upload: UploadConfig) -> Self {
        Self {
            services,
            extractor,
            upload,
        }
    }
}
