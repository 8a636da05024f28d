//! Fuzzy hotword correction applied to merged transcripts.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

/// Configuration for hotword post-processing.
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Minimum adjusted similarity for a fuzzy replacement.
    pub similarity_threshold: f64,
    /// Score substring containment as `min/max * 0.9`. Off by default;
    /// short tokens produce too many false positives.
    pub enable_substring: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.82,
            enable_substring: false,
        }
    }
}

/// One replacement that was applied.
#[derive(Debug, Clone, Serialize)]
pub struct HotwordMatch {
    pub original: String,
    pub hotword: String,
    pub similarity: f64,
    /// Token position for fuzzy matches; None for literal table hits.
    pub position: Option<usize>,
}

/// Corrected text plus the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct PostProcessReport {
    pub text: String,
    pub matches: Vec<HotwordMatch>,
    pub corrections: usize,
    pub hotwords_applied: usize,
}

/// Correct ASR drift on domain terms.
///
/// Tokens are compared against every hotword with a sequence-matching ratio
/// scaled by a length-balance factor; winners at or above the threshold
/// replace the token. A curated literal table then fixes known phonetic
/// confusions. The input text is returned untouched when nothing matches.
pub fn apply_hotwords(
    text: &str,
    hotwords: &[String],
    config: &PostProcessConfig,
) -> PostProcessReport {
    if text.trim().is_empty() || hotwords.is_empty() {
        return PostProcessReport {
            text: text.to_string(),
            matches: Vec::new(),
            corrections: 0,
            hotwords_applied: hotwords.len(),
        };
    }

    let mut matches = Vec::new();
    let mut corrections = 0usize;

    // Pass 1: token-level fuzzy matching.
    let mut out = String::with_capacity(text.len());
    for (position, token) in tokenize(text).into_iter().enumerate() {
        match token {
            Token::Separator(s) => out.push_str(s),
            Token::Word(word) => {
                match best_match(word, hotwords, config) {
                    Some((hotword, similarity)) if hotword != word => {
                        debug!("Replacing {word:?} with {hotword:?} ({similarity:.3})");
                        out.push_str(hotword);
                        matches.push(HotwordMatch {
                            original: word.to_string(),
                            hotword: hotword.to_string(),
                            similarity,
                            position: Some(position),
                        });
                        corrections += 1;
                    }
                    _ => out.push_str(word),
                }
            }
        }
    }

    // Pass 2: curated literal replacements for phonetic confusions. One
    // scan over the text, longest pattern first, so a replacement can never
    // re-match text produced by an earlier one.
    let table = literal_replacements(hotwords);
    if !table.is_empty() {
        let mut patterns: Vec<&String> = table.keys().collect();
        patterns.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));

        let mut replaced = String::with_capacity(out.len());
        let mut rest = out.as_str();
        'scan: while !rest.is_empty() {
            for pattern in &patterns {
                if let Some(stripped) = rest.strip_prefix(pattern.as_str()) {
                    let hotword = &table[*pattern];
                    replaced.push_str(hotword);
                    corrections += 1;
                    matches.push(HotwordMatch {
                        original: (*pattern).clone(),
                        hotword: hotword.clone(),
                        similarity: 1.0,
                        position: None,
                    });
                    rest = stripped;
                    continue 'scan;
                }
            }
            let ch = rest.chars().next().expect("non-empty");
            replaced.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        out = replaced;
    }

    if corrections > 0 {
        info!("Hotword post-processing corrected {corrections} spans");
    }

    PostProcessReport {
        text: out,
        matches,
        corrections,
        hotwords_applied: hotwords.len(),
    }
}

enum Token<'a> {
    Word(&'a str),
    Separator(&'a str),
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

fn char_class(c: char) -> u8 {
    if is_cjk(c) {
        1
    } else if c.is_alphanumeric() {
        2
    } else {
        0
    }
}

/// Split text into word tokens and the separators between them, so the
/// corrected text preserves all original spacing and punctuation.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0usize;
    let mut class = None;

    for (idx, c) in text.char_indices() {
        let current = char_class(c);
        match class {
            Some(prev) if prev == current => {}
            Some(prev) => {
                push_token(&mut tokens, &text[start..idx], prev);
                start = idx;
                class = Some(current);
            }
            None => class = Some(current),
        }
    }
    if let Some(prev) = class {
        push_token(&mut tokens, &text[start..], prev);
    }
    tokens
}

fn push_token<'a>(tokens: &mut Vec<Token<'a>>, slice: &'a str, class: u8) {
    if slice.is_empty() {
        return;
    }
    if class == 0 {
        tokens.push(Token::Separator(slice));
    } else {
        tokens.push(Token::Word(slice));
    }
}

fn best_match<'a>(
    word: &str,
    hotwords: &'a [String],
    config: &PostProcessConfig,
) -> Option<(&'a str, f64)> {
    if word.is_empty() {
        return None;
    }

    let mut best: Option<(&str, f64)> = None;
    for hotword in hotwords {
        if word == hotword {
            return Some((hotword, 1.0));
        }

        let word_len = word.chars().count();
        let hot_len = hotword.chars().count();
        let min_len = word_len.min(hot_len) as f64;
        let max_len = word_len.max(hot_len) as f64;

        if config.enable_substring && (word.contains(hotword.as_str()) || hotword.contains(word)) {
            let substring_score = min_len / max_len * 0.9;
            if best.map_or(true, |(_, s)| substring_score > s) {
                best = Some((hotword, substring_score));
            }
        }

        let ratio = sequence_ratio(&word.to_lowercase(), &hotword.to_lowercase());
        let adjusted = ratio * (0.7 + 0.3 * (min_len / max_len));
        if best.map_or(true, |(_, s)| adjusted > s) {
            best = Some((hotword, adjusted));
        }
    }

    best.filter(|(_, score)| *score >= config.similarity_threshold)
}

/// Sequence-matching ratio: `2*M / (len_a + len_b)` where `M` counts
/// characters covered by recursively taking the longest common substring.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Longest common substring via dynamic programming.
    let mut best_len = 0usize;
    let mut best_a = 0usize;
    let mut best_b = 0usize;
    let mut row = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut prev_diag = 0usize;
        for j in 0..b.len() {
            let prev = row[j + 1];
            if a[i] == b[j] {
                row[j + 1] = prev_diag + 1;
                if row[j + 1] > best_len {
                    best_len = row[j + 1];
                    best_a = i + 1 - best_len;
                    best_b = j + 1 - best_len;
                }
            } else {
                row[j + 1] = 0;
            }
            prev_diag = prev;
        }
    }

    if best_len == 0 {
        return 0;
    }
    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}

/// Curated phonetic-confusion table keyed off the active hotword set.
fn literal_replacements(hotwords: &[String]) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    fn insert_all(table: &mut BTreeMap<String, String>, patterns: &[&str], replacement: &str) {
        for p in patterns {
            table.insert(p.to_string(), replacement.to_string());
        }
    }

    for hotword in hotwords {
        match hotword.as_str() {
            h if h.eq_ignore_ascii_case("ultrathink") => insert_all(
                &mut table,
                &["乌托", "阿尔特拉", "奥特拉", "乌尔特拉", "奥拉", "ultra", "Ultra"],
                hotword,
            ),
            "Python" => insert_all(&mut table, &["派森", "派桑", "皮桑", "python"], "Python"),
            "编程" => insert_all(&mut table, &["便程", "编成", "变成"], "编程"),
            "机器学习" => insert_all(&mut table, &["机械学习", "机器雪洗", "机器血洗"], "机器学习"),
            "教程" => insert_all(&mut table, &["叫程", "较程"], "教程"),
            _ => {}
        }

        if hotword.chars().all(|c| c.is_ascii_alphabetic()) {
            for variant in phonetic_variants(hotword) {
                table.insert(variant.to_string(), hotword.clone());
            }
        }
    }
    table
}

/// Chinese phonetic renderings commonly produced for English tech terms.
fn phonetic_variants(english_word: &str) -> Vec<&'static str> {
    const PHONETIC_MAP: &[(&str, &[&str])] = &[
        ("ultra", &["乌尔特拉", "奥特拉", "阿尔特拉", "乌托拉"]),
        ("think", &["辛克", "思克", "听克", "滕克"]),
        ("python", &["派森", "派桑", "皮桑"]),
        ("java", &["加瓦", "佳瓦", "嘉瓦"]),
        ("docker", &["道克", "多克", "都克"]),
        ("kubernetes", &["库伯内蒂斯", "库贝内蒂斯"]),
        ("react", &["瑞艾克特", "里艾克特"]),
        ("angular", &["安古拉", "安格拉"]),
        ("github", &["吉特哈布", "基特哈布", "吉哈布"]),
    ];

    let word = english_word.to_lowercase();
    let mut variants = Vec::new();
    for (key, values) in PHONETIC_MAP {
        if word.contains(key) || key.contains(word.as_str()) {
            variants.extend_from_slice(values);
        }
    }
    variants
}
