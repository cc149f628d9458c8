//! Minimal XLSX reading and writing
//!
//! Imports only need the cell grid of the first worksheet, and exports
//! only need inline-string cells, so this stays on the workspace zip and
//! XML stack instead of pulling in a spreadsheet crate. Shared strings,
//! inline strings and plain values are all resolved on read.

use std::io::{Cursor, Read, Write};

use polydoc_common::errors::{AppError, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Read the first worksheet as a row-major grid of strings
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(|e| AppError::ImportParse {
        message: format!("Invalid XLSX package: {}", e),
    })?;

    let shared = match read_entry(&mut zip, "xl/sharedStrings.xml")? {
        Some(data) => parse_shared_strings(&data)?,
        None => Vec::new(),
    };

    let sheet_name = first_sheet_name(&zip).ok_or_else(|| AppError::ImportParse {
        message: "XLSX package has no worksheet".to_string(),
    })?;
    let sheet = read_entry(&mut zip, &sheet_name)?.unwrap_or_default();

    parse_sheet(&sheet, &shared)
}

fn read_entry<R: Read + std::io::Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    if !zip.file_names().any(|n| n == name) {
        return Ok(None);
    }
    let mut file = zip.by_name(name).map_err(|e| AppError::ImportParse {
        message: format!("Invalid XLSX entry {}: {}", name, e),
    })?;
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)
        .map_err(|e| AppError::ImportParse {
            message: format!("Failed to read XLSX entry {}: {}", name, e),
        })?;
    Ok(Some(data))
}

fn first_sheet_name<R: Read + std::io::Seek>(zip: &ZipArchive<R>) -> Option<String> {
    let mut sheets: Vec<String> = zip
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    sheets.sort();
    sheets.into_iter().next()
}

fn parse_shared_strings(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(bytes);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(current.clone());
                }
                b"t" => in_t = false,
                _ => {}
            },
            Event::Text(ref t) if in_t => {
                current.push_str(&t.unescape().map_err(xml_err)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

fn parse_sheet(bytes: &[u8], shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(bytes);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut in_row = false;
    let mut in_cell = false;
    let mut in_value = false;
    let mut cell_type = String::new();
    let mut cell_column: Option<usize> = None;
    let mut value = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(xml_err)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"row" => {
                        in_row = true;
                        row = Vec::new();
                        if empty {
                            rows.push(std::mem::take(&mut row));
                            in_row = false;
                        }
                    }
                    b"c" if in_row => {
                        in_cell = true;
                        cell_type = "n".to_string();
                        cell_column = None;
                        value.clear();
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| AppError::ImportParse {
                                message: format!("Invalid XLSX cell attribute: {}", e),
                            })?;
                            match attr.key.as_ref() {
                                b"t" => {
                                    cell_type =
                                        String::from_utf8_lossy(attr.value.as_ref()).into_owned();
                                }
                                b"r" => {
                                    cell_column = column_index(&String::from_utf8_lossy(
                                        attr.value.as_ref(),
                                    ));
                                }
                                _ => {}
                            }
                        }
                        if empty {
                            place_cell(&mut row, cell_column, String::new());
                            in_cell = false;
                        }
                    }
                    b"v" if in_cell && !empty => in_value = true,
                    b"t" if in_cell && !empty => in_value = true,
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = false;
                    rows.push(std::mem::take(&mut row));
                }
                b"c" => {
                    in_cell = false;
                    let resolved = resolve_cell(&cell_type, &value, shared)?;
                    place_cell(&mut row, cell_column, resolved);
                }
                b"v" | b"t" => in_value = false,
                _ => {}
            },
            Event::Text(ref t) if in_value => {
                value.push_str(&t.unescape().map_err(xml_err)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

fn resolve_cell(cell_type: &str, value: &str, shared: &[String]) -> Result<String> {
    match cell_type {
        "s" => {
            let index: usize = value.trim().parse().map_err(|_| AppError::ImportParse {
                message: format!("Invalid shared string index: {}", value),
            })?;
            shared
                .get(index)
                .cloned()
                .ok_or_else(|| AppError::ImportParse {
                    message: format!("Shared string index {} out of range", index),
                })
        }
        _ => Ok(value.to_string()),
    }
}

fn place_cell(row: &mut Vec<String>, column: Option<usize>, value: String) {
    match column {
        Some(index) => {
            while row.len() < index {
                row.push(String::new());
            }
            if row.len() == index {
                row.push(value);
            } else {
                row[index] = value;
            }
        }
        None => row.push(value),
    }
}

fn xml_err(e: quick_xml::Error) -> AppError {
    AppError::ImportParse {
        message: format!("Invalid XLSX XML: {}", e),
    }
}

/// 0-based column index from a cell reference like "B7"
fn column_index(cell_ref: &str) -> Option<usize> {
    let mut index = 0usize;
    let mut seen = false;
    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            seen = true;
            index = index * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
        } else {
            break;
        }
    }
    if seen {
        Some(index - 1)
    } else {
        None
    }
}

/// 1-based cell reference like "B7" from 0-based coordinates
fn cell_ref(row: usize, column: usize) -> String {
    let mut letters = String::new();
    let mut col = column + 1;
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    format!("{}{}", letters, row + 1)
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Write a row-major grid as a single-sheet workbook with inline strings
pub fn write_rows(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, cells) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in cells.iter().enumerate() {
            sheet.push_str(&format!(
                r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                cell_ref(r, c),
                escape(cell.as_str())
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let entries = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ];
    for (name, data) in entries {
        zout.start_file(name, opts).map_err(zip_err)?;
        zout.write_all(data.as_bytes())
            .map_err(|e| AppError::Internal {
                message: format!("XLSX write failed: {}", e),
            })?;
    }
    let cursor = zout.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

fn zip_err(e: zip::result::ZipError) -> AppError {
    AppError::Internal {
        message: format!("XLSX write failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let rows = vec![
            vec!["fr".to_string(), "en".to_string()],
            vec!["Bonjour".to_string(), "Hello".to_string()],
            vec!["Caf\u{e9} & th\u{e9}".to_string(), String::new()],
        ];
        let bytes = write_rows(&rows).unwrap();
        let reread = read_rows(&bytes).unwrap();
        assert_eq!(reread, rows);
    }

    #[test]
    fn shared_strings_are_resolved() {
        let shared = br#"<sst><si><t>alpha</t></si><si><r><t>be</t></r><r><t>ta</t></r></si></sst>"#;
        let strings = parse_shared_strings(shared).unwrap();
        assert_eq!(strings, vec!["alpha", "beta"]);

        let sheet = br#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row></sheetData></worksheet>"#;
        let rows = parse_sheet(sheet, &strings).unwrap();
        assert_eq!(rows, vec![vec!["alpha".to_string(), "beta".to_string()]]);
    }

    #[test]
    fn sparse_rows_are_padded() {
        let sheet = br#"<worksheet><sheetData><row r="1"><c r="C1" t="inlineStr"><is><t>only</t></is></c></row></sheetData></worksheet>"#;
        let rows = parse_sheet(sheet, &[]).unwrap();
        assert_eq!(rows, vec![vec!["".to_string(), "".to_string(), "only".to_string()]]);
    }

    #[test]
    fn numeric_cells_come_back_as_text() {
        let sheet = br#"<worksheet><sheetData><row r="1"><c r="A1"><v>42</v></c></row></sheetData></worksheet>"#;
        let rows = parse_sheet(sheet, &[]).unwrap();
        assert_eq!(rows, vec![vec!["42".to_string()]]);
    }

    #[test]
    fn column_references() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("B7"), Some(1));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("7"), None);
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(6, 1), "B7");
        assert_eq!(cell_ref(2, 26), "AA3");
    }

    #[test]
    fn out_of_range_shared_index_is_an_error() {
        let sheet =
            br#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>5</v></c></row></sheetData></worksheet>"#;
        let err = parse_sheet(sheet, &[]).unwrap_err();
        assert!(matches!(err, AppError::ImportParse { .. }));
    }
}
