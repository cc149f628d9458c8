use std::sync::OnceLock;

use icu_segmenter::SentenceSegmenter;
use regex::Regex;

/// Splits a block of text into sentences for sentence-level extraction
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Pick a splitter for a language code. Turkish gets a rule-based
/// splitter tuned for its punctuation habits, everything else uses the
/// UAX #29 segmenter.
pub fn segmenter_for(language_code: &str) -> Box<dyn SentenceSplitter> {
    match language_code {
        "tr" => Box::new(TurkishSplitter),
        _ => Box::new(IcuSplitter),
    }
}

/// UAX #29 sentence segmentation
pub struct IcuSplitter;

impl SentenceSplitter for IcuSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let segmenter = SentenceSegmenter::new(Default::default());
        let breakpoints: Vec<usize> = segmenter.segment_str(text).collect();

        breakpoints
            .windows(2)
            .filter_map(|pair| {
                let sentence = text[pair[0]..pair[1]].trim();
                if sentence.is_empty() {
                    None
                } else {
                    Some(sentence.to_string())
                }
            })
            .collect()
    }
}

/// Rule-based Turkish sentence splitter. Cuts after terminal punctuation
/// followed by whitespace, which handles suffixed abbreviations better
/// than locale-less UAX #29 does.
pub struct TurkishSplitter;

fn turkish_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?\u{2026}]+\s+").unwrap())
}

impl SentenceSplitter for TurkishSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut last = 0;
        for m in turkish_boundary().find_iter(text) {
            let sentence = text[last..m.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            last = m.end();
        }
        let tail = text[last..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icu_splits_english_sentences() {
        let splitter = IcuSplitter;
        let sentences = splitter.split("First sentence. Second one! And a third?");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "First sentence.");
        assert_eq!(sentences[2], "And a third?");
    }

    #[test]
    fn icu_keeps_single_sentence_whole() {
        let splitter = IcuSplitter;
        let sentences = splitter.split("No terminal punctuation here");
        assert_eq!(sentences, vec!["No terminal punctuation here"]);
    }

    #[test]
    fn turkish_splits_on_terminal_punctuation() {
        let splitter = TurkishSplitter;
        let sentences = splitter.split("Merhaba dünya. Nasılsın? İyiyim.");
        assert_eq!(
            sentences,
            vec!["Merhaba dünya.", "Nasılsın?", "İyiyim."]
        );
    }

    #[test]
    fn turkish_empty_input_yields_nothing() {
        let splitter = TurkishSplitter;
        assert!(splitter.split("   ").is_empty());
    }

    #[test]
    fn selector_picks_turkish_for_tr() {
        let splitter = segmenter_for("tr");
        assert_eq!(splitter.split("Bir. İki.").len(), 2);
        let generic = segmenter_for("en");
        assert_eq!(generic.split("One. Two.").len(), 2);
    }
}
