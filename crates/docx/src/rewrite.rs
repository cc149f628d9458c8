use std::collections::HashMap;

use crate::package::DocxPackage;
use crate::xml::{write_xml_part, XmlEvent, XmlPart};

/// Result of a rewrite pass over a package
pub struct RewriteOutcome {
    /// The rewritten docx
    pub bytes: Vec<u8>,
    /// Number of runs whose text changed
    pub substitutions: usize,
}

/// Replace run text across body, tables, headers and footers.
///
/// A run is replaced only when its complete text equals a key in the
/// substitution map. No substring matching and no joining of adjacent
/// runs, so partial formatting inside a sentence never mismatches.
pub fn rewrite_package(
    package: &DocxPackage,
    substitutions: &HashMap<String, String>,
) -> anyhow::Result<RewriteOutcome> {
    let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
    let mut total = 0usize;

    for name in package.text_part_names() {
        let mut part = package.parse_part(&name)?;
        let replaced = rewrite_part(&mut part, substitutions);
        if replaced > 0 {
            replacements.insert(name, write_xml_part(&part)?);
            total += replaced;
        }
    }

    tracing::debug!(substitutions = total, "Rewrote document runs");

    Ok(RewriteOutcome {
        bytes: package.write_with_replacements(&replacements)?,
        substitutions: total,
    })
}

/// Apply substitutions to every `w:r` run of one part. Returns the
/// number of runs changed.
fn rewrite_part(part: &mut XmlPart, substitutions: &HashMap<String, String>) -> usize {
    let mut replaced = 0usize;
    let mut i = 0;

    while i < part.events.len() {
        if matches!(&part.events[i], XmlEvent::Start { name, .. } if name == "w:r") {
            let end = run_end(&part.events, i + 1);
            if apply_to_run(part, i + 1, end, substitutions) {
                replaced += 1;
            }
            i = end;
        } else {
            i += 1;
        }
    }

    replaced
}

fn run_end(events: &[XmlEvent], mut i: usize) -> usize {
    while i < events.len() {
        if matches!(&events[i], XmlEvent::End { name } if name == "w:r") {
            return i;
        }
        i += 1;
    }
    i
}

/// Match and replace the text of one run spanning events [start, end).
///
/// The run's text is the concatenation of its `w:t` payloads. On a match
/// the first payload receives the full replacement and the rest are
/// blanked, which preserves the first payload's formatting context.
fn apply_to_run(
    part: &mut XmlPart,
    start: usize,
    end: usize,
    substitutions: &HashMap<String, String>,
) -> bool {
    // (w:t start index, its Text event index)
    let mut text_slots: Vec<(usize, usize)> = Vec::new();
    let mut run_text = String::new();

    let mut i = start;
    while i < end {
        if matches!(&part.events[i], XmlEvent::Start { name, .. } if name == "w:t") {
            if let Some(XmlEvent::Text { text }) = part.events.get(i + 1) {
                run_text.push_str(text);
                text_slots.push((i, i + 1));
            }
        }
        i += 1;
    }

    let Some(replacement) = substitutions.get(&run_text) else {
        return false;
    };
    if text_slots.is_empty() || replacement == &run_text {
        return false;
    }

    for (slot_index, (elem_idx, text_idx)) in text_slots.iter().enumerate() {
        let new_text = if slot_index == 0 {
            replacement.clone()
        } else {
            String::new()
        };
        if let Some(XmlEvent::Text { text }) = part.events.get_mut(*text_idx) {
            *text = new_text;
        }
        if slot_index == 0 && (replacement.starts_with(' ') || replacement.ends_with(' ')) {
            part.events[*elem_idx].set_attr("xml:space", "preserve");
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::test_support::build_package;

    fn doc(body: &str) -> DocxPackage {
        let xml = format!(
            r#"<?xml version="1.0"?><w:document><w:body>{body}</w:body></w:document>"#
        );
        let bytes = build_package(&[("word/document.xml", &xml)]);
        DocxPackage::read(&bytes).expect("read")
    }

    fn subs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn document_xml(outcome: &RewriteOutcome) -> String {
        let pkg = DocxPackage::read(&outcome.bytes).expect("reread");
        String::from_utf8(pkg.entry("word/document.xml").unwrap().data.clone()).expect("utf8")
    }

    #[test]
    fn whole_run_match_is_replaced() {
        let pkg = doc(r#"<w:p><w:r><w:t>Bonjour</w:t></w:r></w:p>"#);
        let outcome = rewrite_package(&pkg, &subs(&[("Bonjour", "Hello")])).expect("rewrite");
        assert_eq!(outcome.substitutions, 1);
        assert!(document_xml(&outcome).contains("<w:t>Hello</w:t>"));
    }

    #[test]
    fn substring_match_is_not_replaced() {
        let pkg = doc(r#"<w:p><w:r><w:t>Bonjour tout le monde</w:t></w:r></w:p>"#);
        let outcome = rewrite_package(&pkg, &subs(&[("Bonjour", "Hello")])).expect("rewrite");
        assert_eq!(outcome.substitutions, 0);
        assert!(document_xml(&outcome).contains("Bonjour tout le monde"));
    }

    #[test]
    fn run_shorter_than_key_is_not_replaced() {
        let pkg = doc(r#"<w:p><w:r><w:t>Bonjour</w:t></w:r></w:p>"#);
        let outcome =
            rewrite_package(&pkg, &subs(&[("Bonjour tout le monde", "Hello everyone")]))
                .expect("rewrite");
        assert_eq!(outcome.substitutions, 0);
        assert!(document_xml(&outcome).contains("<w:t>Bonjour</w:t>"));
    }

    #[test]
    fn split_run_payloads_collapse_into_first() {
        let pkg = doc(r#"<w:p><w:r><w:t>Bon</w:t><w:t>jour</w:t></w:r></w:p>"#);
        let outcome = rewrite_package(&pkg, &subs(&[("Bonjour", "Hello")])).expect("rewrite");
        assert_eq!(outcome.substitutions, 1);
        let xml = document_xml(&outcome);
        assert!(xml.contains("<w:t>Hello</w:t>"));
        assert!(xml.contains("<w:t></w:t>"));
    }

    #[test]
    fn whitespace_edges_get_space_preserve() {
        let pkg = doc(r#"<w:p><w:r><w:t>Bonjour</w:t></w:r></w:p>"#);
        let outcome = rewrite_package(&pkg, &subs(&[("Bonjour", " Hello ")])).expect("rewrite");
        assert!(document_xml(&outcome).contains(r#"<w:t xml:space="preserve"> Hello </w:t>"#));
    }

    #[test]
    fn untouched_parts_keep_their_bytes() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>Bonjour</w:t></w:r></w:p></w:body></w:document>"#;
        let bytes = build_package(&[("word/document.xml", xml), ("word/styles.xml", "<s/>")]);
        let pkg = DocxPackage::read(&bytes).expect("read");
        let outcome = rewrite_package(&pkg, &subs(&[("Bonjour", "Hello")])).expect("rewrite");
        let reread = DocxPackage::read(&outcome.bytes).expect("reread");
        assert_eq!(reread.entry("word/styles.xml").unwrap().data, b"<s/>");
    }

    #[test]
    fn headers_and_footers_are_rewritten() {
        let bytes = build_package(&[
            (
                "word/document.xml",
                r#"<w:document><w:body><w:p><w:r><w:t>body</w:t></w:r></w:p></w:body></w:document>"#,
            ),
            (
                "word/footer1.xml",
                r#"<w:ftr><w:p><w:r><w:t>Page</w:t></w:r></w:p></w:ftr>"#,
            ),
        ]);
        let pkg = DocxPackage::read(&bytes).expect("read");
        let outcome = rewrite_package(&pkg, &subs(&[("Page", "Sayfa")])).expect("rewrite");
        assert_eq!(outcome.substitutions, 1);
        let reread = DocxPackage::read(&outcome.bytes).expect("reread");
        let footer =
            String::from_utf8(reread.entry("word/footer1.xml").unwrap().data.clone()).unwrap();
        assert!(footer.contains("Sayfa"));
    }

    #[test]
    fn identity_replacement_counts_nothing() {
        let pkg = doc(r#"<w:p><w:r><w:t>Same</w:t></w:r></w:p>"#);
        let outcome = rewrite_package(&pkg, &subs(&[("Same", "Same")])).expect("rewrite");
        assert_eq!(outcome.substitutions, 0);
    }
}
