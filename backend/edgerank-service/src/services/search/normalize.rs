/// Typographic quotes stripped alongside ASCII punctuation.
const CURLY_QUOTES: [char; 4] = ['\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Canonical index form of a single word: trimmed, punctuation removed,
/// lower-cased. May be empty for tokens made only of punctuation.
pub fn normalize_word(word: &str) -> String {
    word.trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !CURLY_QUOTES.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalize every whitespace-separated word of `text` and join the non-empty
/// results with single spaces.
pub fn normalize_message(text: &str) -> String {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
