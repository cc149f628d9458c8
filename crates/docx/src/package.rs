use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::xml::{parse_xml_part, XmlPart};

/// An opened docx package held fully in memory.
///
/// Entry order, compression method and timestamps are preserved so a
/// rewrite differs from the input only in the parts that were replaced.
pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl DocxPackage {
    pub fn read(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).context("read docx zip")?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    /// Serialize the package, swapping in replacement bytes by part name
    pub fn write_with_replacements(
        &self,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<Vec<u8>> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        for ent in &self.entries {
            let data = replacements
                .get(&ent.name)
                .map(|d| d.as_slice())
                .unwrap_or(&ent.data);
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(&ent.name, opts)
                    .with_context(|| format!("add zip dir: {}", ent.name))?;
            } else {
                zout.start_file(&ent.name, opts)
                    .with_context(|| format!("start zip file: {}", ent.name))?;
                zout.write_all(data)
                    .with_context(|| format!("write zip file: {}", ent.name))?;
            }
        }
        let cursor = zout.finish().context("finish zip")?;
        Ok(cursor.into_inner())
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Parse one XML part by name
    pub fn parse_part(&self, name: &str) -> anyhow::Result<XmlPart> {
        let entry = self
            .entry(name)
            .with_context(|| format!("missing part: {name}"))?;
        parse_xml_part(name, &entry.data)
    }

    /// Names of the parts that carry visible text, in traversal order:
    /// the body first, then headers, then footers.
    pub fn text_part_names(&self) -> Vec<String> {
        let mut headers: Vec<String> = Vec::new();
        let mut footers: Vec<String> = Vec::new();
        for ent in &self.entries {
            let name = ent.name.as_str();
            if name.starts_with("word/header") && name.ends_with(".xml") {
                headers.push(ent.name.clone());
            } else if name.starts_with("word/footer") && name.ends_with(".xml") {
                footers.push(ent.name.clone());
            }
        }
        headers.sort();
        footers.sort();

        let mut names = Vec::with_capacity(headers.len() + footers.len() + 1);
        if self.entry("word/document.xml").is_some() {
            names.push("word/document.xml".to_string());
        }
        names.extend(headers);
        names.extend(footers);
        names
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a minimal docx package from (name, xml) pairs
    pub fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, xml) in parts {
            zout.start_file(*name, opts).expect("start file");
            zout.write_all(xml.as_bytes()).expect("write file");
        }
        zout.finish().expect("finish").into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build_package;
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?><w:document><w:body><w:p/></w:body></w:document>"#;

    #[test]
    fn read_and_round_trip() {
        let bytes = build_package(&[("word/document.xml", DOC), ("word/styles.xml", "<s/>")]);
        let pkg = DocxPackage::read(&bytes).expect("read");
        assert_eq!(pkg.entries.len(), 2);

        let out = pkg
            .write_with_replacements(&HashMap::new())
            .expect("write");
        let reread = DocxPackage::read(&out).expect("reread");
        assert_eq!(reread.entries.len(), 2);
        assert_eq!(reread.entry("word/styles.xml").unwrap().data, b"<s/>");
    }

    #[test]
    fn replacement_swaps_only_named_part() {
        let bytes = build_package(&[("word/document.xml", DOC), ("word/styles.xml", "<s/>")]);
        let pkg = DocxPackage::read(&bytes).expect("read");

        let mut replacements = HashMap::new();
        replacements.insert("word/document.xml".to_string(), b"<d/>".to_vec());
        let out = pkg.write_with_replacements(&replacements).expect("write");

        let reread = DocxPackage::read(&out).expect("reread");
        assert_eq!(reread.entry("word/document.xml").unwrap().data, b"<d/>");
        assert_eq!(reread.entry("word/styles.xml").unwrap().data, b"<s/>");
    }

    #[test]
    fn text_parts_ordered_body_headers_footers() {
        let bytes = build_package(&[
            ("word/footer1.xml", "<f/>"),
            ("word/header2.xml", "<h/>"),
            ("word/document.xml", DOC),
            ("word/header1.xml", "<h/>"),
        ]);
        let pkg = DocxPackage::read(&bytes).expect("read");
        assert_eq!(
            pkg.text_part_names(),
            vec![
                "word/document.xml",
                "word/header1.xml",
                "word/header2.xml",
                "word/footer1.xml"
            ]
        );
    }
}
