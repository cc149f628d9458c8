use crate::package::DocxPackage;
use crate::xml::{XmlEvent, XmlPart};

/// Visible text of one paragraph. Run text is concatenated in order;
/// text found inside `w:drawing` shapes is collected separately because
/// shapes use `a:t` nodes and are matched as their own units.
#[derive(Debug, Clone, Default)]
pub struct ParagraphText {
    pub text: String,
    pub drawing_texts: Vec<String>,
}

/// Visible text of one table cell. Paragraph texts are joined with
/// newlines, mirroring how word processors expose cell content.
#[derive(Debug, Clone, Default)]
pub struct CellText {
    pub text: String,
    pub drawing_texts: Vec<String>,
}

/// One top-level block of a document part, in document order
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(ParagraphText),
    Table(Vec<Vec<CellText>>),
}

/// Structural text view over a docx package
#[derive(Debug, Clone, Default)]
pub struct DocumentView {
    pub body: Vec<Block>,
    pub headers: Vec<Vec<ParagraphText>>,
    pub footers: Vec<Vec<ParagraphText>>,
}

impl DocumentView {
    pub fn from_package(package: &DocxPackage) -> anyhow::Result<Self> {
        let mut view = Self::default();

        for name in package.text_part_names() {
            let part = package.parse_part(&name)?;
            if name == "word/document.xml" {
                view.body = blocks_for_part(&part);
            } else {
                let paragraphs = paragraphs_for_part(&part);
                if name.starts_with("word/header") {
                    view.headers.push(paragraphs);
                } else {
                    view.footers.push(paragraphs);
                }
            }
        }

        Ok(view)
    }
}

/// Top-level blocks of a part. Paragraphs inside tables are consumed by
/// the table walker, so only body-level paragraphs appear as blocks.
fn blocks_for_part(part: &XmlPart) -> Vec<Block> {
    let ev = &part.events;
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < ev.len() {
        match &ev[i] {
            XmlEvent::Start { name, .. } if name == "w:p" => {
                let (para, next) = parse_paragraph(ev, i + 1);
                blocks.push(Block::Paragraph(para));
                i = next;
            }
            XmlEvent::Start { name, .. } if name == "w:tbl" => {
                let (rows, next) = parse_table(ev, i + 1);
                blocks.push(Block::Table(rows));
                i = next;
            }
            _ => i += 1,
        }
    }
    blocks
}

fn paragraphs_for_part(part: &XmlPart) -> Vec<ParagraphText> {
    blocks_for_part(part)
        .into_iter()
        .flat_map(|block| match block {
            Block::Paragraph(p) => vec![p],
            // Header and footer tables are rare; flatten their cells into
            // paragraph-shaped units so their text is not lost.
            Block::Table(rows) => rows
                .into_iter()
                .flatten()
                .map(|cell| ParagraphText {
                    text: cell.text,
                    drawing_texts: cell.drawing_texts,
                })
                .collect(),
        })
        .collect()
}

/// Parse from just after a `w:p` start to its matching end.
/// Text boxes nest paragraphs, so same-name depth is tracked.
fn parse_paragraph(ev: &[XmlEvent], mut i: usize) -> (ParagraphText, usize) {
    let mut depth = 1usize;
    let mut drawing_depth = 0usize;
    let mut stack: Vec<&str> = Vec::new();
    let mut out = ParagraphText::default();

    while i < ev.len() {
        match &ev[i] {
            XmlEvent::Start { name, .. } => {
                if name == "w:p" {
                    depth += 1;
                }
                if name == "w:drawing" {
                    drawing_depth += 1;
                }
                stack.push(name.as_str());
            }
            XmlEvent::End { name } => {
                if name == "w:p" {
                    depth -= 1;
                    if depth == 0 {
                        return (out, i + 1);
                    }
                }
                if name == "w:drawing" {
                    drawing_depth = drawing_depth.saturating_sub(1);
                }
                stack.pop();
            }
            XmlEvent::Text { text } => match stack.last().copied() {
                Some("w:t") if drawing_depth == 0 => out.text.push_str(text),
                Some("a:t") if drawing_depth > 0 => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        out.drawing_texts.push(trimmed.to_string());
                    }
                }
                _ => {}
            },
            _ => {}
        }
        i += 1;
    }

    (out, i)
}

fn parse_table(ev: &[XmlEvent], mut i: usize) -> (Vec<Vec<CellText>>, usize) {
    let mut rows: Vec<Vec<CellText>> = Vec::new();

    while i < ev.len() {
        match &ev[i] {
            XmlEvent::Start { name, .. } if name == "w:tr" => {
                rows.push(Vec::new());
                i += 1;
            }
            XmlEvent::Start { name, .. } if name == "w:tc" => {
                let (cell, next) = parse_cell(ev, i + 1);
                if let Some(row) = rows.last_mut() {
                    row.push(cell);
                }
                i = next;
            }
            XmlEvent::End { name } if name == "w:tbl" => {
                return (rows, i + 1);
            }
            _ => i += 1,
        }
    }

    (rows, i)
}

/// Parse from just after a `w:tc` start to its matching end. Nested
/// tables fold their cell text into the enclosing cell.
fn parse_cell(ev: &[XmlEvent], mut i: usize) -> (CellText, usize) {
    let mut depth = 1usize;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut drawing_texts: Vec<String> = Vec::new();

    while i < ev.len() {
        match &ev[i] {
            XmlEvent::Start { name, .. } if name == "w:p" => {
                let (para, next) = parse_paragraph(ev, i + 1);
                paragraphs.push(para.text);
                drawing_texts.extend(para.drawing_texts);
                i = next;
            }
            XmlEvent::Start { name, .. } if name == "w:tc" => {
                depth += 1;
                i += 1;
            }
            XmlEvent::End { name } if name == "w:tc" => {
                depth -= 1;
                if depth == 0 {
                    return (
                        CellText {
                            text: paragraphs.join("\n"),
                            drawing_texts,
                        },
                        i + 1,
                    );
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    (
        CellText {
            text: paragraphs.join("\n"),
            drawing_texts,
        },
        i,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::test_support::build_package;

    fn view_of(document_xml: &str) -> DocumentView {
        let bytes = build_package(&[("word/document.xml", document_xml)]);
        let pkg = DocxPackage::read(&bytes).expect("read");
        DocumentView::from_package(&pkg).expect("view")
    }

    #[test]
    fn paragraph_concatenates_runs() {
        let view = view_of(
            r#"<w:document><w:body><w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p></w:body></w:document>"#,
        );
        assert_eq!(view.body.len(), 1);
        match &view.body[0] {
            Block::Paragraph(p) => assert_eq!(p.text, "Hello world"),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn drawing_text_is_collected_separately() {
        let view = view_of(
            r#"<w:document><w:body><w:p><w:r><w:t>Caption</w:t></w:r><w:r><w:drawing><a:t> Shape label </a:t></w:drawing></w:r></w:p></w:body></w:document>"#,
        );
        match &view.body[0] {
            Block::Paragraph(p) => {
                assert_eq!(p.text, "Caption");
                assert_eq!(p.drawing_texts, vec!["Shape label"]);
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn table_cells_join_paragraphs_with_newline() {
        let view = view_of(
            r#"<w:document><w:body><w:tbl><w:tr><w:tc><w:p><w:r><w:t>one</w:t></w:r></w:p><w:p><w:r><w:t>two</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>three</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>"#,
        );
        match &view.body[0] {
            Block::Table(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0][0].text, "one\ntwo");
                assert_eq!(rows[0][1].text, "three");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn table_paragraphs_do_not_leak_into_body() {
        let view = view_of(
            r#"<w:document><w:body><w:p><w:r><w:t>before</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>inside</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>"#,
        );
        assert_eq!(view.body.len(), 2);
        assert!(matches!(&view.body[0], Block::Paragraph(p) if p.text == "before"));
        assert!(matches!(&view.body[1], Block::Table(_)));
    }

    #[test]
    fn headers_and_footers_are_read() {
        let bytes = build_package(&[
            (
                "word/document.xml",
                r#"<w:document><w:body><w:p><w:r><w:t>body</w:t></w:r></w:p></w:body></w:document>"#,
            ),
            (
                "word/header1.xml",
                r#"<w:hdr><w:p><w:r><w:t>header text</w:t></w:r></w:p></w:hdr>"#,
            ),
            (
                "word/footer1.xml",
                r#"<w:ftr><w:p><w:r><w:t>footer text</w:t></w:r></w:p></w:ftr>"#,
            ),
        ]);
        let pkg = DocxPackage::read(&bytes).expect("read");
        let view = DocumentView::from_package(&pkg).expect("view");
        assert_eq!(view.headers[0][0].text, "header text");
        assert_eq!(view.footers[0][0].text, "footer text");
    }
}
