//! Spreadsheet rendering: workbook bytes → markdown tables.
//!
//! The first row of each sheet is the header; every following row is a data
//! row. The rendered table is a summary for the model, not a byte-exact dump.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use super::ExtractionError;

/// Rows rendered per sheet before the rest is summarized as a count.
const MAX_DATA_ROWS: usize = 5_000;

/// Marker line placed under the file header of spreadsheet blocks.
pub const DATA_SUMMARY_MARKER: &str = "[Data Summary]";

/// Render every sheet of a workbook as a markdown table, in workbook order.
pub fn render_workbook(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ExtractionError::SpreadsheetParsing(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(ExtractionError::SpreadsheetParsing(
            "workbook has no sheets".into(),
        ));
    }

    let mut out = String::new();
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| ExtractionError::SpreadsheetParsing(format!("{sheet_name}: {e}")))?;

        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("### Sheet: {sheet_name}\n"));
        out.push_str(&render_table(&range));
    }

    tracing::debug!(sheets = sheet_names.len(), "Workbook rendered");
    Ok(out)
}

/// Render one sheet. The column count is the sheet width.
pub fn render_table(range: &Range<Data>) -> String {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return "(empty sheet)\n".to_string();
    }

    let mut rows = range.rows();
    let mut out = String::new();

    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let text = cell_text(cell);
                if text.is_empty() {
                    format!("Column {}", i + 1)
                } else {
                    text
                }
            })
            .collect(),
        None => return "(empty sheet)\n".to_string(),
    };
    out.push_str(&table_row(&header));
    out.push_str(&table_row(&vec!["---".to_string(); width]));

    let data_rows = height - 1;
    for cells in rows.take(MAX_DATA_ROWS) {
        let row: Vec<String> = cells.iter().map(cell_text).collect();
        out.push_str(&table_row(&row));
    }

    if data_rows > MAX_DATA_ROWS {
        out.push_str(&format!(
            "\n({} more rows not shown)\n",
            data_rows - MAX_DATA_ROWS
        ));
    }

    out
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |\n", cells.join(" | "))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other
            .to_string()
            .replace('|', "\\|")
            .replace(['\r', '\n'], " ")
            .trim()
            .to_string(),
    }
}

/// Minimal single-sheet xlsx built with inline strings and numeric cells.
#[cfg(test)]
pub(crate) fn make_xlsx(rows: &[Vec<&str>]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn column_letter(index: usize) -> char {
        (b'A' + index as u8) as char
    }

    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(c), r + 1);
            if value.parse::<f64>().is_ok() {
                sheet_rows.push_str(&format!("<c r=\"{cell_ref}\"><v>{value}</v></c>"));
            } else {
                sheet_rows.push_str(&format!(
                    "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t>{value}</t></is></c>"
                ));
            }
        }
        sheet_rows.push_str("</row>");
    }

    let files: Vec<(&str, String)> = vec![
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                .to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                .to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
            ),
        ),
    ];

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default();
        for (path, content) in &files {
            writer.start_file(*path, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}
