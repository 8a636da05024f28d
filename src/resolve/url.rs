//! Canonicalization of platform video URLs.

use tracing::debug;
use url::Url;

use crate::error::{Result, SubpipeError};

use super::Platform;

/// Normalize a video URL to `{platform, video_id}`.
///
/// Short links (`b23.tv`) are resolved by following a single HEAD redirect;
/// everything else is recognized from the URL alone.
pub async fn normalize_url(client: &reqwest::Client, raw: &str) -> Result<(Platform, String)> {
    let parsed = parse(raw)?;
    if let Some(result) = classify(&parsed) {
        return Ok(result);
    }

    if is_short_link(&parsed) {
        let target = follow_redirect(client, raw).await?;
        let resolved = parse(&target)?;
        debug!("Short link {raw} -> {target}");
        return classify(&resolved).ok_or_else(|| {
            SubpipeError::UnsupportedPlatform(format!("short link resolved to {target}"))
        });
    }

    Err(SubpipeError::UnsupportedPlatform(
        parsed.host_str().unwrap_or("unknown host").to_string(),
    ))
}

fn parse(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| SubpipeError::InvalidUrl(format!("{raw}: {e}")))
}

fn host(url: &Url) -> &str {
    url.host_str().unwrap_or("")
}

fn is_short_link(url: &Url) -> bool {
    matches!(host(url), "b23.tv" | "www.b23.tv")
}

/// Recognize the long-form URL patterns of each platform.
fn classify(url: &Url) -> Option<(Platform, String)> {
    let host = host(url).trim_start_matches("www.").trim_start_matches("m.");
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "youtube.com" | "music.youtube.com" => {
            // /watch?v=<id>, /shorts/<id>, /live/<id>
            if segments.first() == Some(&"watch") {
                let id = url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.to_string())?;
                return Some((Platform::Youtube, id));
            }
            if let ["shorts" | "live" | "embed", id] = segments.as_slice() {
                return Some((Platform::Youtube, id.to_string()));
            }
            None
        }
        "youtu.be" => segments
            .first()
            .map(|id| (Platform::Youtube, id.to_string())),
        "bilibili.com" => {
            if let ["video", id] = segments.as_slice() {
                return Some((Platform::Bilibili, id.to_string()));
            }
            None
        }
        "acfun.cn" => {
            if let ["v", id] = segments.as_slice() {
                if id.starts_with("ac") {
                    return Some((Platform::Acfun, id.to_string()));
                }
            }
            None
        }
        _ => None,
    }
}

/// Follow exactly one redirect hop without fetching the body.
async fn follow_redirect(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .head(url)
        .send()
        .await
        .map_err(SubpipeError::Http)?;

    if response.status().is_redirection() {
        if let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        {
            return Ok(location.to_string());
        }
    }
    // Some clients auto-follow; the final URL is just as good.
    Ok(response.url().to_string())
}
