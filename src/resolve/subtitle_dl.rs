//! Subtitle track selection, download and decoding.

use std::collections::BTreeMap;

use encoding_rs::{Encoding, GB18030, GBK, UTF_8};
use tracing::{debug, info, warn};

use crate::error::{Result, SubpipeError};

use super::{Platform, SubtitleTrack};

/// Preference order of track container formats.
fn format_rank(ext: &str) -> u8 {
    match ext.to_lowercase().as_str() {
        "srt" => 0,
        "json3" => 1,
        "vtt" => 2,
        "ttml" => 3,
        e if e.starts_with("srv") => 4,
        _ => 5,
    }
}

/// Pick the first track in priority order, preferring better formats within
/// a language. Keys match exactly first, then case-insensitively, then by
/// primary subtag ("zh" also matches "zh-CN").
pub fn select_track<'a>(
    priority: &[String],
    tracks: &'a BTreeMap<String, Vec<SubtitleTrack>>,
) -> Option<(String, &'a SubtitleTrack)> {
    for wanted in priority {
        let wanted_lower = wanted.to_lowercase();
        let matched_key = tracks
            .keys()
            .find(|k| *k == wanted)
            .or_else(|| tracks.keys().find(|k| k.to_lowercase() == wanted_lower))
            .or_else(|| {
                tracks
                    .keys()
                    .find(|k| k.to_lowercase().starts_with(&format!("{wanted_lower}-")))
            });

        if let Some(key) = matched_key {
            let best = tracks[key]
                .iter()
                .filter(|t| !t.url.is_empty())
                .min_by_key(|t| format_rank(&t.ext));
            if let Some(track) = best {
                debug!("Selected {key} track in format {}", track.ext);
                return Some((key.clone(), track));
            }
        }
    }
    None
}

/// Download a track with platform headers and decode it to a string.
pub async fn download_track(
    client: &reqwest::Client,
    track: &SubtitleTrack,
    platform: Platform,
) -> Result<String> {
    let mut request = client.get(&track.url);
    if let Some(origin) = platform.origin() {
        request = request
            .header(reqwest::header::ORIGIN, origin)
            .header(reqwest::header::REFERER, format!("{origin}/"));
    }

    let response = request.send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    info!("Downloaded subtitle track ({} bytes)", bytes.len());
    decode_subtitle_bytes(&bytes)
}

/// Decode subtitle bytes: BOM first, then UTF-8, then the common Chinese
/// encodings in decreasing coverage order.
pub fn decode_subtitle_bytes(bytes: &[u8]) -> Result<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _, had_errors) = encoding.decode(&bytes[bom_len..]);
        if !had_errors {
            debug!("Decoded subtitle via BOM as {}", encoding.name());
            return Ok(text.into_owned());
        }
        warn!("BOM said {} but decode had errors", encoding.name());
    }

    // GB18030 is a superset of GBK and GB2312; trying GBK separately still
    // catches files that GB18030 maps to different codepoints.
    for encoding in [UTF_8, GB18030, GBK] {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if !had_errors {
            debug!("Decoded subtitle as {}", encoding.name());
            return Ok(text.into_owned());
        }
    }

    Err(SubpipeError::InvalidSrt(
        "undecodable subtitle encoding".to_string(),
    ))
}
