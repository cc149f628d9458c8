use std::collections::HashSet;

use serde::Serialize;

use crate::document::{Block, DocumentView};
use crate::segment::SentenceSplitter;

/// How much text goes into one translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Whole paragraphs, table cells and shape labels
    Block,
    /// Blocks split into sentences before collection
    Sentence,
}

/// One unit of extracted text. Ordinals are 1-based and reflect
/// first-seen order across the whole document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedUnit {
    pub ordinal: usize,
    pub text: String,
}

struct Collector<'a> {
    granularity: Granularity,
    splitter: &'a dyn SentenceSplitter,
    seen: HashSet<String>,
    units: Vec<ExtractedUnit>,
}

impl<'a> Collector<'a> {
    fn new(granularity: Granularity, splitter: &'a dyn SentenceSplitter) -> Self {
        Self {
            granularity,
            splitter,
            seen: HashSet::new(),
            units: Vec::new(),
        }
    }

    fn push(&mut self, raw: &str) {
        match self.granularity {
            Granularity::Block => self.push_trimmed(raw),
            Granularity::Sentence => {
                for sentence in self.splitter.split(raw) {
                    self.push_trimmed(&sentence);
                }
            }
        }
    }

    fn push_trimmed(&mut self, raw: &str) {
        let text = raw.trim();
        if text.is_empty() || self.seen.contains(text) {
            return;
        }
        self.seen.insert(text.to_string());
        self.units.push(ExtractedUnit {
            ordinal: self.units.len() + 1,
            text: text.to_string(),
        });
    }
}

/// Collect deduplicated translation units from a document.
///
/// Traversal order is body paragraphs (with their shape labels), then
/// table cells, then headers, then footers. A text that appears in
/// several places is collected once, at its first position.
pub fn extract_units(
    view: &DocumentView,
    granularity: Granularity,
    splitter: &dyn SentenceSplitter,
) -> Vec<ExtractedUnit> {
    let mut collector = Collector::new(granularity, splitter);

    for block in &view.body {
        if let Block::Paragraph(p) = block {
            collector.push(&p.text);
            for drawing in &p.drawing_texts {
                collector.push(drawing);
            }
        }
    }

    for block in &view.body {
        if let Block::Table(rows) = block {
            for row in rows {
                for cell in row {
                    collector.push(&cell.text);
                    for drawing in &cell.drawing_texts {
                        collector.push(drawing);
                    }
                }
            }
        }
    }

    for part in view.headers.iter().chain(view.footers.iter()) {
        for paragraph in part {
            collector.push(&paragraph.text);
            for drawing in &paragraph.drawing_texts {
                collector.push(drawing);
            }
        }
    }

    collector.units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CellText, ParagraphText};
    use crate::segment::IcuSplitter;

    fn para(text: &str) -> Block {
        Block::Paragraph(ParagraphText {
            text: text.to_string(),
            drawing_texts: Vec::new(),
        })
    }

    fn texts(units: &[ExtractedUnit]) -> Vec<&str> {
        units.iter().map(|u| u.text.as_str()).collect()
    }

    #[test]
    fn paragraphs_come_before_tables() {
        let view = DocumentView {
            body: vec![
                Block::Table(vec![vec![CellText {
                    text: "cell".to_string(),
                    drawing_texts: Vec::new(),
                }]]),
                para("paragraph"),
            ],
            headers: Vec::new(),
            footers: Vec::new(),
        };
        let units = extract_units(&view, Granularity::Block, &IcuSplitter);
        assert_eq!(texts(&units), vec!["paragraph", "cell"]);
        assert_eq!(units[0].ordinal, 1);
        assert_eq!(units[1].ordinal, 2);
    }

    #[test]
    fn duplicates_keep_first_position() {
        let view = DocumentView {
            body: vec![para("Repeated"), para("Unique"), para("  Repeated  ")],
            headers: vec![vec![ParagraphText {
                text: "Repeated".to_string(),
                drawing_texts: Vec::new(),
            }]],
            footers: Vec::new(),
        };
        let units = extract_units(&view, Granularity::Block, &IcuSplitter);
        assert_eq!(texts(&units), vec!["Repeated", "Unique"]);
    }

    #[test]
    fn drawing_text_follows_its_paragraph() {
        let view = DocumentView {
            body: vec![Block::Paragraph(ParagraphText {
                text: "Caption".to_string(),
                drawing_texts: vec!["Shape".to_string()],
            })],
            headers: Vec::new(),
            footers: Vec::new(),
        };
        let units = extract_units(&view, Granularity::Block, &IcuSplitter);
        assert_eq!(texts(&units), vec!["Caption", "Shape"]);
    }

    #[test]
    fn empty_blocks_are_skipped() {
        let view = DocumentView {
            body: vec![para(""), para("   "), para("kept")],
            headers: Vec::new(),
            footers: Vec::new(),
        };
        let units = extract_units(&view, Granularity::Block, &IcuSplitter);
        assert_eq!(texts(&units), vec!["kept"]);
        assert_eq!(units[0].ordinal, 1);
    }

    #[test]
    fn sentence_granularity_splits_blocks() {
        let view = DocumentView {
            body: vec![para("One sentence. Another sentence."), para("One sentence.")],
            headers: Vec::new(),
            footers: Vec::new(),
        };
        let units = extract_units(&view, Granularity::Sentence, &IcuSplitter);
        assert_eq!(texts(&units), vec!["One sentence.", "Another sentence."]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let view = DocumentView {
            body: vec![
                para("First sentence. Second sentence."),
                Block::Table(vec![vec![CellText {
                    text: "cell".to_string(),
                    drawing_texts: vec!["shape".to_string()],
                }]]),
                para("First sentence. Second sentence."),
            ],
            headers: vec![vec![ParagraphText {
                text: "header".to_string(),
                drawing_texts: Vec::new(),
            }]],
            footers: Vec::new(),
        };
        for granularity in [Granularity::Block, Granularity::Sentence] {
            let first = extract_units(&view, granularity, &IcuSplitter);
            let second = extract_units(&view, granularity, &IcuSplitter);
            assert_eq!(texts(&first), texts(&second));
            let ordinals: Vec<usize> = first.iter().map(|u| u.ordinal).collect();
            assert_eq!(ordinals, second.iter().map(|u| u.ordinal).collect::<Vec<_>>());
        }
    }
}
