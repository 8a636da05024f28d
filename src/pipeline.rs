//! Request orchestration: resolve, prepare, transcribe, build, translate.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::asr::{AsrCoordinator, BackendPool, MergedTranscript};
use crate::audio::{chunk, convert, ChunkLimits};
use crate::config::Config;
use crate::error::{Result, SubpipeError};
use crate::hotword::{
    apply_hotwords, HotwordGenerator, HotwordMode, HotwordRequest, HotwordSet,
    HotwordSettingsStore, PostProcessConfig, PostProcessReport,
};
use crate::resolve::{
    MediaProber, ResolvedArtifact, SourceRequest, SourceResolver, SubtitleMode,
};
use crate::subtitle::{build_cues, parse_srt, SrtDocument};
use crate::translate::{ProviderAttempt, TranslationRouter};

/// Facts about the audio behind a transcription result.
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub chunks: usize,
}

/// Everything the caller may want to know beyond the artifact itself.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// True when a strict subset of chunks produced the transcript.
    pub partial: bool,
    pub translation_attempts: Vec<ProviderAttempt>,
    pub hotword_report: Option<PostProcessReport>,
}

/// Result of a full `process` run.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub srt: SrtDocument,
    pub mode: SubtitleMode,
    pub audio_info: Option<AudioInfo>,
    pub translation: Option<String>,
    pub diagnostics: Diagnostics,
}

/// The wired-up subtitle pipeline. One instance serves many requests; each
/// request runs sequentially through its stages.
pub struct Pipeline {
    config: Config,
    resolver: SourceResolver,
    coordinator: AsrCoordinator,
    router: TranslationRouter,
    hotword_settings: Arc<HotwordSettingsStore>,
    hotword_generator: HotwordGenerator,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let prober = MediaProber::new(config.cookies.clone());
        let pool = BackendPool::new(
            config.transcribe_backends(),
            Duration::from_secs(config.servers.transcribe.timeout),
        );
        let router = TranslationRouter::from_config(&config);
        let hotword_settings = Arc::new(HotwordSettingsStore::load(settings_path()));
        let hotword_generator = HotwordGenerator::load(Path::new(config_dir()));

        Self {
            config,
            resolver: SourceResolver::new(prober),
            coordinator: AsrCoordinator::new(pool),
            router,
            hotword_settings,
            hotword_generator,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hotword_settings(&self) -> Arc<HotwordSettingsStore> {
        self.hotword_settings.clone()
    }

    pub fn translator(&self) -> &TranslationRouter {
        &self.router
    }

    fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Process one request end to end.
    pub async fn process(
        &self,
        request: &SourceRequest,
        cancelled: Arc<AtomicBool>,
    ) -> Result<ProcessOutcome> {
        let work_dir = TempDir::new()?;
        check_cancel(&cancelled)?;

        // Stage 1: resolve the source and obtain the artifact.
        let pb = self.spinner("Resolving source...");
        let plan = self.resolver.resolve(request, work_dir.path()).await?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!("Resolved via {:?}", plan.mode));
        }
        check_cancel(&cancelled)?;

        let source_lang = plan
            .language
            .map(|l| l.as_str().to_string())
            .unwrap_or_else(|| "en".to_string());

        let (srt, audio_info, mut diagnostics) = match &plan.artifact {
            ResolvedArtifact::SubtitleText(text) => {
                info!("Parsing downloaded subtitle track");
                (parse_srt(text), None, Diagnostics::default())
            }
            ResolvedArtifact::AudioFile(audio_path) => {
                let hotwords = self.resolve_hotwords(request, &plan);
                let hotword_terms = hotwords.term_list();
                let (transcript, audio_info) = self
                    .transcribe_file(
                        audio_path,
                        work_dir.path(),
                        Some(hotword_terms.as_slice()),
                        &cancelled,
                    )
                    .await?;
                check_cancel(&cancelled)?;

                let mut diagnostics = Diagnostics {
                    partial: transcript.partial,
                    ..Default::default()
                };

                let settings = self.hotword_settings.get();
                let text = if settings.post_process && !hotwords.is_empty() {
                    let report = apply_hotwords(
                        &transcript.text,
                        &hotword_terms,
                        &PostProcessConfig::default(),
                    );
                    let corrected = report.text.clone();
                    diagnostics.hotword_report = Some(report);
                    corrected
                } else {
                    transcript.text.clone()
                };

                let pb = self.spinner("Building subtitles...");
                let srt = build_cues(
                    &text,
                    transcript.timestamps.as_deref(),
                    Some(transcript.duration_seconds()),
                );
                if let Some(pb) = pb {
                    pb.finish_with_message(format!("Built {} cues", srt.len()));
                }

                (srt, Some(audio_info), diagnostics)
            }
        };
        check_cancel(&cancelled)?;

        // Optional post-stage: translation of the full text.
        let translation = match &request.translate_to {
            Some(target) if !srt.is_empty() => {
                let full_text = srt
                    .cues
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let report = self
                    .router
                    .translate_detailed(&full_text, &source_lang, target)
                    .await;
                diagnostics.translation_attempts = report.attempts;
                Some(report.text)
            }
            _ => None,
        };

        Ok(ProcessOutcome {
            srt,
            mode: plan.mode,
            audio_info,
            translation,
            diagnostics,
        })
    }

    /// Transcribe a local media file: convert, chunk, submit, merge.
    pub async fn transcribe_file(
        &self,
        input: &Path,
        work_dir: &Path,
        hotwords: Option<&[String]>,
        cancelled: &AtomicBool,
    ) -> Result<(MergedTranscript, AudioInfo)> {
        let pb = self.spinner("Preparing audio...");
        let wav_path = work_dir.join("audio.wav");
        let buffer = convert::prepare_wav(input, &wav_path).await?;
        let duration = buffer.duration();
        if let Some(pb) = pb {
            pb.finish_with_message(format!("Audio ready ({:.1}s)", duration.as_secs_f64()));
        }
        check_cancel(cancelled)?;

        let file_size = std::fs::metadata(&buffer.path)?.len();
        let limits = ChunkLimits::default();
        let plans = chunk::plan_chunks(duration, file_size, &limits);
        if plans.is_empty() {
            return Err(SubpipeError::AudioDecode("empty audio".to_string()));
        }
        debug!("Planned {} chunks", plans.len());

        let chunks = if plans.len() == 1 {
            // No cutting needed; feed the converted file directly.
            vec![crate::audio::AudioChunk {
                plan: plans[0].clone(),
                path: buffer.path.clone(),
            }]
        } else {
            chunk::create_chunks(&buffer.path, &plans, &work_dir.join("chunks"), &limits).await?
        };
        check_cancel(cancelled)?;

        let pb = self.spinner(&format!("Transcribing {} chunk(s)...", chunks.len()));
        let result = self
            .coordinator
            .transcribe_chunks(&chunks, hotwords, cancelled)
            .await;
        if plans.len() > 1 {
            chunk::cleanup_chunks(&chunks);
        }
        let transcript = result?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!(
                "Transcribed {}/{} chunks",
                transcript.chunks_succeeded, transcript.chunks_total
            ));
        }

        let audio_info = AudioInfo {
            duration_seconds: transcript.duration_seconds(),
            sample_rate: buffer.sample_rate,
            chunks: transcript.chunks_total,
        };
        Ok((transcript, audio_info))
    }

    /// Assemble the hotword list for a request according to the runtime
    /// settings: user terms always count; generated terms join in when auto
    /// hotwords are enabled and the mode allows them.
    fn resolve_hotwords(
        &self,
        request: &SourceRequest,
        plan: &crate::resolve::ResolvedPlan,
    ) -> HotwordSet {
        let settings = self.hotword_settings.get();
        let max = request
            .max_hotwords
            .unwrap_or(settings.max_count as usize)
            .min(settings.max_count as usize);

        let user = HotwordSet::from_user(&request.hotwords);
        if !settings.auto_hotwords || settings.mode == HotwordMode::UserOnly {
            return user.truncated(max);
        }

        let info = plan.info.as_ref();
        let generated = self.hotword_generator.generate(&HotwordRequest {
            title: info.map(|i| i.title.as_str()),
            tags: &request.tags,
            channel: info.and_then(|i| i.uploader.as_deref()),
            platform: Some(plan.platform.as_str()),
            max_hotwords: Some(max),
        });

        let mut combined: Vec<(String, f64)> = user
            .terms
            .into_iter()
            .map(|t| (t.term, t.weight + 1.0))
            .collect();
        combined.extend(generated.terms.into_iter().map(|t| (t.term, t.weight)));
        HotwordSet::new(combined, crate::hotword::HotwordSource::AutoGenerated).truncated(max)
    }
}

fn check_cancel(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(SubpipeError::Cancelled);
    }
    Ok(())
}

fn config_dir() -> &'static str {
    if Path::new("/app/config").is_dir() {
        "/app/config/hotwords"
    } else {
        "config/hotwords"
    }
}

fn settings_path() -> &'static str {
    if Path::new("/app/config").is_dir() {
        "/app/config/hotword_settings.json"
    } else {
        "config/hotword_settings.json"
    }
}

/// Print a human summary of a finished request.
pub fn print_summary(outcome: &ProcessOutcome) {
    println!();
    println!("  Mode:        {:?}", outcome.mode);
    println!("  Cues:        {}", outcome.srt.len());
    if let Some(info) = &outcome.audio_info {
        println!(
            "  Audio:       {:.1}s in {} chunk(s)",
            info.duration_seconds, info.chunks
        );
    }
    if outcome.diagnostics.partial {
        println!("  Note:        partial result (some chunks failed)");
    }
    if let Some(report) = &outcome.diagnostics.hotword_report {
        println!("  Hotwords:    {} corrections", report.corrections);
    }
    if outcome.translation.is_some() {
        println!(
            "  Translation: {} provider attempt(s)",
            outcome.diagnostics.translation_attempts.len()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_cancel() {
        let flag = AtomicBool::new(false);
        assert!(check_cancel(&flag).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(check_cancel(&flag), Err(SubpipeError::Cancelled)));
    }

    #[test]
    fn test_diagnostics_default() {
        let d = Diagnostics::default();
        assert!(!d.partial);
        assert!(d.translation_attempts.is_empty());
        assert!(d.hotword_report.is_none());
    }
}
