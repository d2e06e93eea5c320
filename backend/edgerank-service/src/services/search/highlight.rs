//! Terminal highlighting of matched words.

/// ANSI red foreground.
pub const HIGHLIGHT_START: &str = "\x1b[31m";
/// ANSI reset.
pub const HIGHLIGHT_END: &str = "\x1b[0m";

/// Wrap every case-insensitive occurrence of `word` in `text`.
pub fn highlight(word: &str, text: &str) -> String {
    highlight_all(&[word], text)
}

/// Wrap every case-insensitive occurrence of any of `words` in `text`.
///
/// Occurrences are found left to right and may overlap; overlapping or
/// touching occurrences are merged into a single highlighted span so markers
/// never nest.
pub fn highlight_all<S: AsRef<str>>(words: &[S], text: &str) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let mut spans: Vec<(usize, usize)> = Vec::new();
    for word in words {
        let needle: Vec<char> = word.as_ref().chars().collect();
        if needle.is_empty() || needle.len() > chars.len() {
            continue;
        }
        for start in 0..=chars.len() - needle.len() {
            let matches = needle.iter().enumerate().all(|(offset, expected)| {
                chars[start + offset]
                    .1
                    .to_lowercase()
                    .eq(expected.to_lowercase())
            });
            if matches {
                spans.push((start, start + needle.len()));
            }
        }
    }

    if spans.is_empty() {
        return text.to_string();
    }

    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let byte_at = |index: usize| chars.get(index).map_or(text.len(), |(byte, _)| *byte);

    let mut output = String::with_capacity(
        text.len() + merged.len() * (HIGHLIGHT_START.len() + HIGHLIGHT_END.len()),
    );
    let mut cursor = 0;
    for (start, end) in merged {
        let (start, end) = (byte_at(start), byte_at(end));
        output.push_str(&text[cursor..start]);
        output.push_str(HIGHLIGHT_START);
        output.push_str(&text[start..end]);
        output.push_str(HIGHLIGHT_END);
        cursor = end;
    }
    output.push_str(&text[cursor..]);
    output
}
