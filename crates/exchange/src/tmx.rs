//! TMX 1.4 reading and writing
//!
//! Reading only needs the `tu`/`tuv`/`seg` skeleton: each variant is the
//! tag-stripped text of its `seg`, keyed by the `xml:lang` attribute.

use polydoc_common::db::MemoryRecord;
use polydoc_common::errors::{AppError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// One translation unit: language code to segment text
#[derive(Debug, Clone, Default)]
pub struct TmxUnit {
    pub variants: Vec<(String, String)>,
}

impl TmxUnit {
    pub fn text_for(&self, lang: &str) -> Option<&str> {
        self.variants
            .iter()
            .find(|(l, _)| l == lang)
            .map(|(_, t)| t.as_str())
    }
}

pub fn parse_tmx(bytes: &[u8]) -> Result<Vec<TmxUnit>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut units: Vec<TmxUnit> = Vec::new();
    let mut current_unit: Option<TmxUnit> = None;
    let mut current_lang: Option<String> = None;
    let mut seg_depth = 0usize;
    let mut seg_text = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            AppError::ImportParse {
                message: format!("Invalid TMX: {}", e),
            }
        })?;
        match event {
            Event::Start(ref e) => match local_name(e.name().as_ref()) {
                b"tu" => current_unit = Some(TmxUnit::default()),
                b"tuv" => {
                    current_lang = lang_attr(e)?;
                }
                b"seg" if current_lang.is_some() => {
                    seg_depth = 1;
                    seg_text.clear();
                }
                _ if seg_depth > 0 => seg_depth += 1,
                _ => {}
            },
            Event::End(ref e) => match local_name(e.name().as_ref()) {
                b"tu" => {
                    if let Some(unit) = current_unit.take() {
                        units.push(unit);
                    }
                }
                b"tuv" => current_lang = None,
                b"seg" if seg_depth == 1 => {
                    seg_depth = 0;
                    if let (Some(unit), Some(lang)) = (current_unit.as_mut(), current_lang.as_ref())
                    {
                        unit.variants
                            .push((lang.clone(), seg_text.trim().to_string()));
                    }
                }
                _ if seg_depth > 0 => seg_depth -= 1,
                _ => {}
            },
            Event::Text(ref t) if seg_depth > 0 => {
                let text = t.unescape().map_err(|e| AppError::ImportParse {
                    message: format!("Invalid TMX text: {}", e),
                })?;
                seg_text.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(units)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn lang_attr(e: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| AppError::ImportParse {
            message: format!("Invalid TMX attribute: {}", e),
        })?;
        let key = attr.key.as_ref();
        if key == b"xml:lang" || key == b"lang" {
            let value = attr.unescape_value().map_err(|e| AppError::ImportParse {
                message: format!("Invalid TMX attribute value: {}", e),
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Serialize records as a TMX document. The header's srclang comes from
/// the first record; an empty input produces a valid empty body.
pub fn write_tmx(records: &[MemoryRecord]) -> Result<Vec<u8>> {
    let srclang = records
        .first()
        .map(|r| r.source_language.as_str())
        .unwrap_or("en");

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(io_err)?;

    let mut tmx = BytesStart::new("tmx");
    tmx.push_attribute(("version", "1.4"));
    writer.write_event(Event::Start(tmx)).map_err(io_err)?;

    let mut header = BytesStart::new("header");
    header.push_attribute(("creationtool", "polydoc"));
    header.push_attribute(("srclang", srclang));
    header.push_attribute(("datatype", "plaintext"));
    header.push_attribute(("segtype", "block"));
    writer.write_event(Event::Empty(header)).map_err(io_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .map_err(io_err)?;

    for record in records {
        writer
            .write_event(Event::Start(BytesStart::new("tu")))
            .map_err(io_err)?;
        for (lang, text) in [
            (&record.source_language, &record.source_text),
            (&record.target_language, &record.target_text),
        ] {
            let mut tuv = BytesStart::new("tuv");
            tuv.push_attribute(("xml:lang", lang.as_str()));
            writer.write_event(Event::Start(tuv)).map_err(io_err)?;
            writer
                .write_event(Event::Start(BytesStart::new("seg")))
                .map_err(io_err)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(io_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("seg")))
                .map_err(io_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("tuv")))
                .map_err(io_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("tu")))
            .map_err(io_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .map_err(io_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("tmx")))
        .map_err(io_err)?;

    Ok(writer.into_inner())
}

fn io_err(e: std::io::Error) -> AppError {
    AppError::Internal {
        message: format!("TMX write failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units_by_language() {
        let tmx = br#"<?xml version="1.0"?>
<tmx version="1.4"><header srclang="fr"/><body>
  <tu>
    <tuv xml:lang="fr"><seg>Bonjour</seg></tuv>
    <tuv xml:lang="en"><seg>Hello</seg></tuv>
  </tu>
  <tu>
    <tuv xml:lang="fr"><seg>Merci</seg></tuv>
    <tuv xml:lang="tr"><seg>Tesekkurler</seg></tuv>
  </tu>
</body></tmx>"#;
        let units = parse_tmx(tmx).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text_for("fr"), Some("Bonjour"));
        assert_eq!(units[0].text_for("en"), Some("Hello"));
        assert_eq!(units[1].text_for("tr"), Some("Tesekkurler"));
        assert_eq!(units[1].text_for("en"), None);
    }

    #[test]
    fn seg_text_is_tag_stripped() {
        let tmx = br#"<tmx><body><tu>
  <tuv xml:lang="fr"><seg>Avant <bpt i="1">b</bpt>milieu<ept i="1">/b</ept> apres</seg></tuv>
</tu></body></tmx>"#;
        let units = parse_tmx(tmx).unwrap();
        assert_eq!(units[0].text_for("fr"), Some("Avant bmilieu/b apres"));
    }

    #[test]
    fn malformed_xml_is_an_import_error() {
        let err = parse_tmx(b"<tmx><body></tu></tmx>").unwrap_err();
        assert!(matches!(err, AppError::ImportParse { .. }));
    }

    #[test]
    fn written_tmx_round_trips() {
        let records = vec![MemoryRecord {
            id: 1,
            name: "batch".to_string(),
            source_language: "fr".to_string(),
            target_language: "en".to_string(),
            source_text: "Bonjour & bienvenue".to_string(),
            target_text: "Hello & welcome".to_string(),
        }];
        let bytes = write_tmx(&records).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains(r#"srclang="fr""#));

        let units = parse_tmx(&bytes).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text_for("fr"), Some("Bonjour & bienvenue"));
        assert_eq!(units[0].text_for("en"), Some("Hello & welcome"));
    }

    #[test]
    fn empty_export_defaults_srclang() {
        let bytes = write_tmx(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#"srclang="en""#));
        assert!(text.contains("<body>"));
    }
}
