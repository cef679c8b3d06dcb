use terrabot_core::{LanguageDetector, CEBUANO, ENGLISH};

/// Common Cebuano function words and question words.
const CEBUANO_MARKERS: &[&str] = &[
    "unsa", "unsaon", "asa", "kinsa", "ngano", "kanus-a", "pila", "sa", "ang", "nga", "ug", "og",
    "ko", "ako", "nako", "ikaw", "ka", "imong", "akong", "naa", "wala", "dili", "mao", "kini",
    "kana", "palihug", "salamat", "kumusta", "maayong", "yuta", "titulo", "buhis", "unta", "ba",
    "gyud", "lang", "pud", "usab", "kay", "para", "mga", "niini", "adunay", "gusto",
];

/// Keyword detector: Cebuano when enough marker words appear, English otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordDetector;

impl KeywordDetector {
    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

impl LanguageDetector for KeywordDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let tokens = Self::tokens(text);
        if tokens.is_empty() {
            return None;
        }
        let hits = tokens
            .iter()
            .filter(|t| CEBUANO_MARKERS.contains(&t.as_str()))
            .count();
        // Short messages need only one marker.
        let cebuano = hits >= 2 || (hits == 1 && tokens.len() <= 2);
        Some(if cebuano { CEBUANO } else { ENGLISH }.to_string())
    }
}
