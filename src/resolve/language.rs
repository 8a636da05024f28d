//! Language detection from platform metadata.

use super::VideoInfo;

/// Languages the pipeline can process end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Zh,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Zh => "zh",
            Lang::En => "en",
        }
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Detect the video language from metadata. Rules are checked in order and
/// the first positive match wins; anything that is neither Chinese nor
/// English resolves to None and skips transcription.
pub fn detect_language(info: &VideoInfo) -> Option<Lang> {
    // 1. CJK ideographs in the title.
    if info.title.chars().any(is_cjk) {
        return Some(Lang::Zh);
    }

    // 2. A mostly-Latin title.
    let latin_letters = info.title.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if latin_letters >= 5 {
        return Some(Lang::En);
    }

    // 3. Manual subtitle languages.
    let manual_has = |prefix: &str| {
        info.manual_subtitles
            .keys()
            .any(|k| k.to_lowercase().starts_with(prefix))
    };
    if manual_has("zh") {
        return Some(Lang::Zh);
    }
    if manual_has("en") {
        return Some(Lang::En);
    }

    // 4. Auto caption languages; `en-orig` marks the original audio track.
    let auto_has = |prefix: &str| {
        info.auto_captions
            .keys()
            .any(|k| k.to_lowercase().starts_with(prefix))
    };
    if info.auto_captions.contains_key("en-orig") || auto_has("en") {
        return Some(Lang::En);
    }
    if auto_has("zh") {
        return Some(Lang::Zh);
    }

    // 5. The declared language field.
    if let Some(declared) = &info.language {
        let declared = declared.to_lowercase();
        if declared.starts_with("zh") {
            return Some(Lang::Zh);
        }
        if declared.starts_with("en") {
            return Some(Lang::En);
        }
    }

    None
}
