//! Annotation orchestration: input checks, cache-first lookup, generation, store.

use crate::error::ApiError;
use crate::generation::{CommentaryGenerator, CommentaryRequest};
use crate::language::Language;
use crate::level::AbstractionLevel;
use crate::store::CommentStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Commentary for one (file, level), fresh from the model or from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub path: PathBuf,
    pub level: AbstractionLevel,
    pub comments: Vec<String>,
    pub model: String,
    pub language: String,
    pub cached: bool,
    pub generated_at: DateTime<Utc>,
}

/// A readable, supported source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub language: Language,
}

impl SourceFile {
    /// Read `path` and check that it can be annotated. No network involved.
    pub fn read(path: &Path) -> Result<Self, ApiError> {
        if !path.is_file() {
            return Err(ApiError::MissingInput(path.to_path_buf()));
        }
        let language = Language::from_path(path);
        if !language.is_supported() {
            return Err(ApiError::UnsupportedFile(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|_| ApiError::MissingInput(path.to_path_buf()))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
            language,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

pub struct Annotator {
    store: CommentStore,
    generator: Result<CommentaryGenerator, String>,
}

impl Annotator {
    pub fn new(store: CommentStore, generator: CommentaryGenerator) -> Self {
        Self {
            store,
            generator: Ok(generator),
        }
    }

    /// Annotator that serves cached commentary only. Cache misses fail with
    /// `ProviderNotConfigured(reason)`.
    pub fn cache_only(store: CommentStore, reason: impl Into<String>) -> Self {
        Self {
            store,
            generator: Err(reason.into()),
        }
    }

    pub fn generator(&self) -> Option<&CommentaryGenerator> {
        self.generator.as_ref().ok()
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CommentStore {
        &mut self.store
    }

    /// Fresh cached commentary for (path, level) generated from `content`.
    pub fn cached(&self, path: &Path, level: AbstractionLevel, content: &str) -> Option<Annotation> {
        if !self.store.has_valid_entry(path, level, content) {
            return None;
        }
        let entry = self.store.entry(path, level)?;
        Some(Annotation {
            path: path.to_path_buf(),
            level,
            comments: entry.comments.clone(),
            model: entry.model.clone(),
            language: entry.language.clone(),
            cached: true,
            generated_at: entry.generated_at,
        })
    }

    /// Annotate `path` at `level`, reusing the cache unless `force`.
    pub async fn annotate(
        &mut self,
        path: &Path,
        level: AbstractionLevel,
        force: bool,
    ) -> Result<Annotation, ApiError> {
        let source = SourceFile::read(path)?;

        if !force {
            if let Some(hit) = self.cached(path, level, &source.content) {
                debug!(path = %path.display(), level = %level, "Using cached commentary");
                return Ok(hit);
            }
        }

        let generator = self
            .generator
            .as_ref()
            .map_err(|reason| ApiError::ProviderNotConfigured(reason.clone()))?;

        let request = CommentaryRequest {
            code: source.content.clone(),
            language: source.language,
            file_name: source.file_name(),
            abstraction_level: level,
        };
        let response = generator.generate(&request).await;
        if !response.success {
            return Err(ApiError::GenerationFailed(
                response
                    .error
                    .unwrap_or_else(|| "Unknown generation error".to_string()),
            ));
        }

        let language = source.language.tag();
        self.store.put_entry(
            path,
            level,
            response.comments.clone(),
            &source.content,
            &response.model,
            language,
        );
        info!(
            path = %path.display(),
            level = %level,
            comments = response.comments.len(),
            "Commentary generated"
        );

        let generated_at = self
            .store
            .entry(path, level)
            .map(|entry| entry.generated_at)
            .unwrap_or_else(Utc::now);
        Ok(Annotation {
            path: path.to_path_buf(),
            level,
            comments: response.comments,
            model: response.model,
            language: language.to_string(),
            cached: false,
            generated_at,
        })
    }
}
