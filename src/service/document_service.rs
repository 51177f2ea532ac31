use std::sync::Arc;

use tracing::{error, info, warn};

use crate::agent::prompts::extraction_prompt;
use crate::agent::{ChatModel, CompletionRequest};
use crate::documents::{self, DocumentKind};
use crate::errors::AppError;
use crate::workspace::Workspace;

/// Characters of raw text kept when the model cannot structure a document.
const FALLBACK_CHARS: usize = 1000;
const EXTRACTION_TEMPERATURE: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Turns uploads into the user's knowledge base.
#[derive(Clone)]
pub struct DocumentService {
    model: Arc<dyn ChatModel>,
    workspace: Workspace,
}

fn fallback_text(raw: &str) -> String {
    if raw.chars().count() > FALLBACK_CHARS {
        let head: String = raw.chars().take(FALLBACK_CHARS).collect();
        format!("{head}...")
    } else {
        raw.to_string()
    }
}

impl DocumentService {
    pub fn new(model: Arc<dyn ChatModel>, workspace: Workspace) -> Self {
        Self { model, workspace }
    }

    /// Parses and structures every supported file, then replaces the user's
    /// knowledge base with the result.
    pub async fn ingest(&self, username: &str, files: Vec<UploadedFile>) -> Result<String, AppError> {
        let mut knowledge_base = String::new();

        for file in files {
            let Some(kind) = DocumentKind::detect(&file.filename, file.content_type.as_deref()) else {
                warn!("Skipping unsupported upload '{}'", file.filename);
                continue;
            };

            let raw = match self.parse(kind, &file).await {
                Ok(text) => text,
                Err(e) => {
                    error!("{e}");
                    continue;
                }
            };
            if raw.trim().is_empty() {
                warn!("No text found in '{}'", file.filename);
                continue;
            }

            let structured = self.structure(&file.filename, &raw).await;
            knowledge_base.push_str(&format!(
                "\n\n--- Extracted from {} ---\n\n{structured}",
                file.filename
            ));
        }

        self.workspace.set_knowledge_base(username, knowledge_base.clone()).await;
        info!(user = %username, chars = knowledge_base.len(), "Knowledge base replaced");
        Ok(knowledge_base)
    }

    async fn parse(&self, kind: DocumentKind, file: &UploadedFile) -> Result<String, AppError> {
        let filename = file.filename.clone();
        let bytes = file.bytes.clone();
        tokio::task::spawn_blocking(move || documents::extract_text(kind, &filename, &bytes))
            .await
            .map_err(|e| AppError::DocumentParse {
                filename: file.filename.clone(),
                message: e.to_string(),
            })?
    }

    async fn structure(&self, filename: &str, raw: &str) -> String {
        let request = CompletionRequest::new(extraction_prompt(raw)).with_temperature(EXTRACTION_TEMPERATURE);
        match self.model.complete(request).await {
            Ok(completion) if !completion.content.trim().is_empty() => completion.content,
            Ok(_) => fallback_text(raw),
            Err(e) => {
                warn!("Structured extraction of '{filename}' failed, keeping raw text: {e}");
                fallback_text(raw)
            }
        }
    }
}
