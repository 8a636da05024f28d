/// Characters that terminate a sentence for splitting purposes.
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Split free text into sentences, keeping the terminator attached.
///
/// Sentences of one character or less are dropped, which also collapses
/// runs of consecutive terminators.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if SENTENCE_ENDINGS.contains(&ch) && !current.trim().is_empty() {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }

    sentences.retain(|s| s.chars().count() > 1);
    sentences
}

pub fn is_sentence_ending(ch: char) -> bool {
    SENTENCE_ENDINGS.contains(&ch)
}
