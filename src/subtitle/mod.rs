pub mod build;
pub mod sentence;
pub mod srt;
pub mod time;

pub use build::{build_cues, cues_from_plain_text};
pub use srt::{format_srt, parse_srt};

/// One subtitle entry. Times are seconds in the global audio timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleCue {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// An ordered list of cues with contiguous 1-based indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SrtDocument {
    pub cues: Vec<SubtitleCue>,
}

impl SrtDocument {
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Re-assign contiguous 1-based indices after filtering or merging.
    pub fn renumber(&mut self) {
        for (i, cue) in self.cues.iter_mut().enumerate() {
            cue.index = i + 1;
        }
    }

    pub fn to_srt(&self) -> String {
        srt::format_srt(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumber() {
        let mut doc = SrtDocument::new(vec![
            SubtitleCue {
                index: 5,
                start: 0.0,
                end: 1.0,
                text: "one".to_string(),
            },
            SubtitleCue {
                index: 9,
                start: 1.0,
                end: 2.0,
                text: "two".to_string(),
            },
        ]);
        doc.renumber();
        assert_eq!(doc.cues[0].index, 1);
        assert_eq!(doc.cues[1].index, 2);
    }

    #[test]
    fn test_cue_duration() {
        let cue = SubtitleCue {
            index: 1,
            start: 0.5,
            end: 2.0,
            text: "x".to_string(),
        };
        assert!((cue.duration() - 1.5).abs() < f64::EPSILON);
    }
}
