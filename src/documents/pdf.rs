use anyhow::{anyhow, Result};

/// Extracts the text of every page of a PDF held in memory.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| anyhow!("PDF extraction failed: {e}"))
}
