//! Pulls structured pieces out of model answers: markdown tables and fenced code.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::MarkdownTable;

/// Extracts every markdown table from `text`.
///
/// Consecutive non-blank lines containing `|` form a block. The first line is
/// the header, an optional separator row (`|---|:--:|`) is skipped, and data
/// rows whose cell count differs from the header are dropped. Blocks without
/// any surviving data row produce no table.
pub fn extract_tables(text: &str) -> Vec<MarkdownTable> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if !line.is_empty() && line.contains('|') {
            current.push(line);
        } else if !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks.into_iter().filter_map(|block| table_from_block(&block)).collect()
}

fn table_from_block(block: &[&str]) -> Option<MarkdownTable> {
    if block.len() < 2 {
        return None;
    }

    let headers = split_cells(block[0]);
    let body = if is_separator(block[1]) { &block[2..] } else { &block[1..] };

    let data: Vec<Vec<String>> = body
        .iter()
        .filter(|row| !is_separator(row))
        .map(|row| split_cells(row))
        .filter(|cells| cells.len() == headers.len())
        .collect();

    if data.is_empty() {
        return None;
    }
    Some(MarkdownTable { headers, data })
}

fn split_cells(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = row.strip_suffix('|').unwrap_or(row);
    row.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_separator(row: &str) -> bool {
    let cells = split_cells(row);
    cells.iter().any(|c| c.contains('-'))
        && cells
            .iter()
            .all(|c| c.chars().all(|ch| ch == '-' || ch == ':' || ch == ' '))
}

fn fenced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:python|py)?[ \t]*\r?\n(.*?)```").expect("fenced code pattern is valid")
    })
}

/// Returns the body of the first fenced code block, or the whole text when there is none.
pub fn extract_code(text: &str) -> String {
    match fenced_code_re().captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => text.trim().to_string(),
    }
}
