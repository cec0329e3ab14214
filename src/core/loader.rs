use crate::utils::error::{BannerError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Header of the column holding the storefront domains.
pub const DOMAIN_COLUMN: &str = "domain";

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Read the `domain` column of a spreadsheet, in row order.
///
/// Empty cells are dropped and values are trimmed. Duplicates are kept.
pub fn load_domains(path: &Path) -> Result<Vec<String>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let domains = match extension.as_str() {
        "csv" => load_csv(path)?,
        ext if WORKBOOK_EXTENSIONS.contains(&ext) => load_workbook(path)?,
        _ => {
            return Err(BannerError::UnsupportedFormatError {
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    extension
                },
            })
        }
    };

    tracing::debug!("Loaded {} domains from {}", domains.len(), path.display());
    Ok(domains)
}

fn load_csv(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = find_domain_column(headers.iter())?;

    let mut domains = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(value) = row.get(column).and_then(clean_cell) {
            domains.push(value);
        }
    }
    Ok(domains)
}

fn load_workbook(path: &Path) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| BannerError::EmptySpreadsheetError {
            path: path.display().to_string(),
        })??;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| BannerError::EmptySpreadsheetError {
        path: path.display().to_string(),
    })?;
    let header: Vec<String> = header.iter().map(cell_text).collect();
    let column = find_domain_column(header.iter().map(String::as_str))?;

    Ok(rows
        .filter_map(|row| row.get(column))
        .filter_map(|cell| clean_cell(&cell_text(cell)))
        .collect())
}

fn find_domain_column<'a>(mut headers: impl Iterator<Item = &'a str>) -> Result<usize> {
    headers
        .position(|header| header.trim() == DOMAIN_COLUMN)
        .ok_or_else(|| BannerError::MissingColumnError {
            column: DOMAIN_COLUMN.to_string(),
        })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn clean_cell(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

    /// Minimal `.xlsx` with one worksheet; empty strings leave the cell out.
    fn xlsx_file(rows: &[&[&str]]) -> NamedTempFile {
        let mut strings = Vec::new();
        let mut sheet_rows = String::new();
        for (r, row) in rows.iter().enumerate() {
            sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let cell = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                sheet_rows.push_str(&format!(r#"<c r="{}" t="s"><v>{}</v></c>"#, cell, strings.len()));
                strings.push(format!(r#"<si><t xml:space="preserve">{}</t></si>"#, value));
            }
            sheet_rows.push_str("</row>");
        }

        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#.to_string(),
            ),
            (
                "_rels/.rels",
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#, PKG_REL_NS, REL_NS),
            ),
            (
                "xl/workbook.xml",
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{}" xmlns:r="{}"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#, SHEET_NS, REL_NS),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#, PKG_REL_NS, REL_NS, REL_NS),
            ),
            (
                "xl/sharedStrings.xml",
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{}" count="{n}" uniqueCount="{n}">{}</sst>"#, SHEET_NS, strings.concat(), n = strings.len()),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#, SHEET_NS, sheet_rows),
            ),
        ];

        let file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
        for (name, content) in parts {
            writer
                .start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        file
    }

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_domains_keeps_order_and_duplicates() {
        let file = csv_file("name,domain\nA,b.com\nB,a.com\nC,b.com\n");
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(domains, vec!["b.com", "a.com", "b.com"]);
    }

    #[test]
    fn test_load_domains_drops_empty_cells() {
        let file = csv_file("domain,notes\nshop.example.com,x\n,missing\n   ,blank\nother.example.com,\n");
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(domains, vec!["shop.example.com", "other.example.com"]);
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let file = csv_file("id,domain\n1\n2,a.com\n");
        assert_eq!(load_domains(file.path()).unwrap(), vec!["a.com"]);
    }

    #[test]
    fn test_missing_domain_column_fails() {
        let file = csv_file("site,notes\na.com,x\n");
        let err = load_domains(file.path()).unwrap_err();
        assert!(matches!(err, BannerError::MissingColumnError { .. }));
    }

    #[test]
    fn test_unsupported_extension_fails() {
        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = load_domains(file.path()).unwrap_err();
        assert!(matches!(err, BannerError::UnsupportedFormatError { .. }));
    }

    #[test]
    fn test_load_domains_from_workbook() {
        let file = xlsx_file(&[
            &["name", " domain "],
            &["Shop", "  shop.example.com "],
            &["Gap", ""],
            &["Blank", "   "],
            &["B", "b.com"],
            &["Again", "shop.example.com"],
        ]);
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(domains, vec!["shop.example.com", "b.com", "shop.example.com"]);
    }

    #[test]
    fn test_workbook_without_domain_column_fails() {
        let file = xlsx_file(&[&["site", "notes"], &["a.com", "x"]]);
        let err = load_domains(file.path()).unwrap_err();
        assert!(matches!(err, BannerError::MissingColumnError { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unreadable_workbook_fails() {
        let mut file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"definitely not a zip container").unwrap();
        let err = load_domains(file.path()).unwrap_err();
        assert!(err.is_client_error());
    }
}
