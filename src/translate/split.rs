/// Punctuation eligible as a chunk cut point.
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Split long text into translation-sized chunks.
///
/// Text within `target` characters stays whole. Otherwise the cursor
/// advances in `target`-sized steps and scans up to `max - target` further
/// characters for the nearest sentence-ending punctuation, cutting just
/// after it so sentences survive translation intact.
pub fn split_chunks(text: &str, target: usize, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= target {
        return vec![text.to_string()];
    }

    let slack = max.saturating_sub(target);
    let mut chunks = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let remaining = chars.len() - pos;
        if remaining <= target {
            chunks.push(chars[pos..].iter().collect());
            break;
        }

        let mut cut = pos + target;
        let scan_end = (cut + slack).min(chars.len());
        if let Some(offset) = chars[cut..scan_end]
            .iter()
            .position(|c| SENTENCE_ENDINGS.contains(c))
        {
            cut += offset + 1;
        }

        chunks.push(chars[pos..cut].iter().collect());
        pos = cut;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_chunks("hello world", 2000, 2400);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn test_exact_target_single_chunk() {
        let text = "a".repeat(2000);
        let chunks = split_chunks(&text, 2000, 2400);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_cut_at_sentence_boundary() {
        // 10 chars past target there is a period; cut should land after it.
        let text = format!("{}abcdefghi.{}", "x".repeat(100), "y".repeat(50));
        let chunks = split_chunks(&text, 100, 140);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks[0].chars().count(), 110);
        assert_eq!(chunks[1], "y".repeat(50));
    }

    #[test]
    fn test_hard_cut_without_punctuation() {
        let text = "z".repeat(250);
        let chunks = split_chunks(&text, 100, 140);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks[1].chars().count(), 100);
        assert_eq!(chunks[2].chars().count(), 50);
    }

    #[test]
    fn test_no_characters_lost() {
        let text: String = "这是一句话。".repeat(600);
        let chunks = split_chunks(&text, 2000, 2400);
        let rejoined: String = chunks.concat();
        assert_eq!(rejoined, text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 2400);
        }
    }

    #[test]
    fn test_cjk_punctuation_recognized() {
        let text = format!("{}结束。{}", "中".repeat(100), "后".repeat(30));
        let chunks = split_chunks(&text, 100, 140);
        assert!(chunks[0].ends_with('。'));
    }
}
