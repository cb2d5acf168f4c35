//! Sentence excerpts for search results.

/// Split text into trimmed, non-empty sentences.
///
/// A run of `.`, `!` or `?` ends a sentence only when followed by whitespace
/// or the end of the text, so decimals such as `0.02` stay intact. The
/// terminator stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        while let Some(&(_, next)) = chars.peek() {
            if matches!(next, '.' | '!' | '?') {
                chars.next();
            } else {
                break;
            }
        }
        let end = chars.peek().map_or(text.len(), |&(i, _)| i);
        let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, raw: &'a str) {
    let sentence = raw.trim();
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

/// Up to `max` distinct sentences of `text` containing any query term.
///
/// Terms are expected lower-cased; sentences are compared lower-cased.
pub fn highlights(text: Option<&str>, terms: &[String], max: usize) -> Vec<String> {
    let Some(text) = text else {
        return Vec::new();
    };
    if terms.is_empty() || max == 0 {
        return Vec::new();
    }

    let mut found: Vec<String> = Vec::new();
    for sentence in split_sentences(text) {
        let lowered = sentence.to_lowercase();
        if !terms.iter().any(|term| lowered.contains(term.as_str())) {
            continue;
        }
        if found.iter().any(|existing| existing == sentence) {
            continue;
        }
        found.push(sentence.to_string());
        if found.len() == max {
            break;
        }
    }
    found
}
