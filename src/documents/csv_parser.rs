use anyhow::Result;
use csv::ReaderBuilder;

/// Renders a CSV document as text: header line, then one ` | `-joined line per record.
/// Records may have differing field counts.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let mut content = String::new();
    let headers = reader.headers()?.clone();
    content.push_str(&headers.iter().collect::<Vec<_>>().join(" | "));
    content.push('\n');

    for result in reader.records() {
        let record = result?;
        content.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
        content.push('\n');
    }

    Ok(content)
}
