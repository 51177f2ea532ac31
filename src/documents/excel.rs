use std::io::Cursor;

use anyhow::{anyhow, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Renders every sheet of an `.xlsx`/`.xls` workbook as text: a
/// `--- Sheet: <name> ---` line followed by one ` | `-joined line per non-empty row.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| anyhow!("Failed to open workbook: {e}"))?;

    let mut out = String::new();
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    for name in sheet_names {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!("Skipping unreadable sheet '{name}': {e}");
                continue;
            }
        };

        out.push_str(&format!("\n--- Sheet: {name} ---\n"));
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
    }

    if out.trim().is_empty() {
        return Err(anyhow!("Workbook contains no sheets"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_formats_values() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("x".into())), "x");
        assert_eq!(cell_text(&Data::Int(3)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }

    fn media_plan_workbook() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Plan").unwrap();
            sheet.write_string(0, 0, "Medium").unwrap();
            sheet.write_string(0, 1, "Budget").unwrap();
            sheet.write_string(2, 0, "TikTok").unwrap();
            sheet.write_number(2, 1, 15000.0).unwrap();
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Notes").unwrap();
            sheet.write_string(0, 0, "Q3 launch").unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn renders_each_sheet_and_skips_blank_rows() {
        let text = extract_text(&media_plan_workbook()).unwrap();
        assert_eq!(
            text,
            "\n--- Sheet: Plan ---\nMedium | Budget\nTikTok | 15000\n\n--- Sheet: Notes ---\nQ3 launch\n"
        );
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        assert!(extract_text(b"definitely not a spreadsheet").is_err());
    }
}
