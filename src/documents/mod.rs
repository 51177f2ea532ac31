//! Plain-text extraction from uploaded documents.

pub mod csv_parser;
pub mod excel;
pub mod pdf;

use crate::errors::AppError;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Excel,
    Csv,
}

impl DocumentKind {
    /// Detects the kind from the declared content type, then from the file extension.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Option<Self> {
        let by_mime = content_type.and_then(|ct| {
            let ct = ct.split(';').next().unwrap_or(ct).trim().to_lowercase();
            match ct.as_str() {
                "application/pdf" => Some(DocumentKind::Pdf),
                XLSX_MIME | XLS_MIME => Some(DocumentKind::Excel),
                "text/csv" | "application/csv" => Some(DocumentKind::Csv),
                _ => None,
            }
        });

        by_mime.or_else(|| {
            let ext = filename.rsplit_once('.')?.1.to_lowercase();
            match ext.as_str() {
                "pdf" => Some(DocumentKind::Pdf),
                "xlsx" | "xls" => Some(DocumentKind::Excel),
                "csv" => Some(DocumentKind::Csv),
                _ => None,
            }
        })
    }
}

/// Extracts the text of one document. CPU-bound; call from a blocking task.
pub fn extract_text(kind: DocumentKind, filename: &str, bytes: &[u8]) -> Result<String, AppError> {
    let parsed = match kind {
        DocumentKind::Pdf => pdf::extract_text(bytes),
        DocumentKind::Excel => excel::extract_text(bytes),
        DocumentKind::Csv => csv_parser::extract_text(bytes),
    };
    parsed.map_err(|e| AppError::DocumentParse { filename: filename.to_string(), message: e.to_string() })
}
