//! Subtitle-vs-transcription strategy selection.

use tracing::info;

use crate::error::{Result, SubpipeError};

use super::{Lang, SubtitleMode, VideoInfo};

fn has_lang_prefix<V>(tracks: &std::collections::BTreeMap<String, V>, prefix: &str) -> bool {
    tracks.keys().any(|k| k.to_lowercase().starts_with(prefix))
}

/// Decide between downloading subtitles and transcribing the audio, and the
/// subtitle language priority to use either way.
///
/// Chinese only trusts manual tracks; machine captions for Chinese are too
/// rough to publish. English accepts manual or auto tracks, preferring the
/// `en-orig` original-audio track when only the auto set matched.
pub fn choose_strategy(
    language: Option<Lang>,
    info: &VideoInfo,
) -> Result<(SubtitleMode, Vec<String>)> {
    let language = language.ok_or_else(|| {
        SubpipeError::NoUsableSource("unsupported language, transcription skipped".to_string())
    })?;

    let (mode, priority) = match language {
        Lang::Zh => {
            let priority = vec!["zh-Hans".to_string(), "zh-Hant".to_string(), "zh".to_string()];
            if has_lang_prefix(&info.manual_subtitles, "zh") {
                (SubtitleMode::Subtitle, priority)
            } else {
                (SubtitleMode::Transcribe, priority)
            }
        }
        Lang::En => {
            if has_lang_prefix(&info.manual_subtitles, "en") {
                (SubtitleMode::Subtitle, vec!["en".to_string()])
            } else if info.auto_captions.contains_key("en-orig")
                || has_lang_prefix(&info.auto_captions, "en")
            {
                (
                    SubtitleMode::Subtitle,
                    vec!["en-orig".to_string(), "en".to_string()],
                )
            } else {
                (SubtitleMode::Transcribe, vec!["en".to_string()])
            }
        }
    };

    info!(
        "Strategy for {}: {:?} with priority {:?}",
        language.as_str(),
        mode,
        priority
    );
    Ok((mode, priority))
}
