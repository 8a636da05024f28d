pub mod generate;
pub mod postprocess;
pub mod settings;

pub use generate::{HotwordGenerator, HotwordRequest};
pub use postprocess::{apply_hotwords, PostProcessConfig, PostProcessReport};
pub use settings::{HotwordMode, HotwordSettings, HotwordSettingsStore};

/// Where a hotword list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotwordSource {
    User,
    AutoGenerated,
    Curated,
}

/// A weighted term kept for recognition hinting and post-correction.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

/// A deduplicated, weight-ordered hotword list scoped to one request.
#[derive(Debug, Clone)]
pub struct HotwordSet {
    pub terms: Vec<WeightedTerm>,
    pub source: HotwordSource,
}

impl HotwordSet {
    /// Build a set from raw terms: trims, drops empties, deduplicates
    /// case-sensitively keeping the first occurrence.
    pub fn new(terms: Vec<(String, f64)>, source: HotwordSource) -> Self {
        let mut seen = std::collections::HashSet::new();
        let terms = terms
            .into_iter()
            .filter_map(|(term, weight)| {
                let term = term.trim().to_string();
                if term.is_empty() || !seen.insert(term.clone()) {
                    None
                } else {
                    Some(WeightedTerm { term, weight })
                }
            })
            .collect();
        Self { terms, source }
    }

    pub fn from_user(terms: &[String]) -> Self {
        Self::new(
            terms.iter().map(|t| (t.clone(), 1.0)).collect(),
            HotwordSource::User,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Cap to the strongest `max` terms.
    pub fn truncated(mut self, max: usize) -> Self {
        self.terms.truncate(max);
        self
    }

    pub fn term_list(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.term.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_is_case_sensitive() {
        let set = HotwordSet::new(
            vec![
                ("Python".to_string(), 1.0),
                ("python".to_string(), 0.5),
                ("Python".to_string(), 0.3),
            ],
            HotwordSource::User,
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_trims_and_drops_empty() {
        let set = HotwordSet::new(
            vec![("  rust  ".to_string(), 1.0), ("   ".to_string(), 1.0)],
            HotwordSource::User,
        );
        assert_eq!(set.term_list(), vec!["rust"]);
    }

    #[test]
    fn test_truncated() {
        let set = HotwordSet::new(
            vec![
                ("a".to_string(), 3.0),
                ("b".to_string(), 2.0),
                ("c".to_string(), 1.0),
            ],
            HotwordSource::AutoGenerated,
        )
        .truncated(2);
        assert_eq!(set.term_list(), vec!["a", "b"]);
    }
}
