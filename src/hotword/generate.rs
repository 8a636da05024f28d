//! Hotword generation from title, tags and channel metadata.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{HotwordSet, HotwordSource};

/// Tokens shorter than this are never useful as hotwords.
const DEFAULT_MIN_KEYWORD_LENGTH: usize = 2;
const DEFAULT_MAX_HOTWORDS: usize = 20;

/// Filler words that dominate titles without carrying domain meaning.
const STOPWORDS: &[&str] = &[
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这", "the",
    "and", "for", "with", "how", "what", "this", "that", "you",
];

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_methods")]
    pub enabled_methods: Vec<String>,
    #[serde(default = "default_max_hotwords")]
    pub max_hotwords: usize,
    #[serde(default = "default_min_length")]
    pub min_keyword_length: usize,
}

fn default_methods() -> Vec<String> {
    vec![
        "category_based".to_string(),
        "title_extraction".to_string(),
        "tag_based".to_string(),
        "learned".to_string(),
    ]
}

fn default_max_hotwords() -> usize {
    DEFAULT_MAX_HOTWORDS
}

fn default_min_length() -> usize {
    DEFAULT_MIN_KEYWORD_LENGTH
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            enabled_methods: default_methods(),
            max_hotwords: DEFAULT_MAX_HOTWORDS,
            min_keyword_length: DEFAULT_MIN_KEYWORD_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_w_category")]
    pub category_based: f64,
    #[serde(default = "default_w_title")]
    pub title_extraction: f64,
    #[serde(default = "default_w_tag")]
    pub tag_based: f64,
    #[serde(default = "default_w_learned")]
    pub learned: f64,
}

fn default_w_category() -> f64 {
    0.4
}
fn default_w_title() -> f64 {
    0.3
}
fn default_w_tag() -> f64 {
    0.2
}
fn default_w_learned() -> f64 {
    0.1
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            category_based: 0.4,
            title_extraction: 0.3,
            tag_based: 0.2,
            learned: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryMapping {
    #[serde(default)]
    pub keywords: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub channels: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub category_mapping: CategoryMapping,
}

#[derive(Debug, Deserialize)]
struct GeneratorConfigFile {
    #[serde(default)]
    hotwords: GeneratorConfig,
}

/// One category file: subcategory word lists plus per-subcategory weights
/// scaling how many words are drawn.
#[derive(Debug, Clone, Default)]
pub struct CategoryHotwords {
    pub subcategories: Vec<(String, Vec<String>)>,
    pub weights: HashMap<String, f64>,
}

impl CategoryHotwords {
    fn from_yaml(category_name: &str, value: &serde_yaml::Value) -> Self {
        let mut result = Self::default();
        let Some(map) = value.as_mapping() else {
            return result;
        };

        for (key, val) in map {
            let Some(key) = key.as_str() else { continue };
            if key == "weights" {
                if let Ok(weights) = serde_yaml::from_value(val.clone()) {
                    result.weights = weights;
                }
            } else if key == category_name {
                if let Some(subs) = val.as_mapping() {
                    for (sub, words) in subs {
                        let (Some(sub), Ok(words)) = (
                            sub.as_str(),
                            serde_yaml::from_value::<Vec<String>>(words.clone()),
                        ) else {
                            continue;
                        };
                        result.subcategories.push((sub.to_string(), words));
                    }
                }
            }
        }
        result
    }
}

/// Inputs for generating one request's hotword list.
#[derive(Debug, Default)]
pub struct HotwordRequest<'a> {
    pub title: Option<&'a str>,
    pub tags: &'a [String],
    pub channel: Option<&'a str>,
    pub platform: Option<&'a str>,
    pub max_hotwords: Option<usize>,
}

/// Weighted hotword generation from four candidate sources.
pub struct HotwordGenerator {
    config: GeneratorConfig,
    categories: HashMap<String, CategoryHotwords>,
}

impl Default for HotwordGenerator {
    fn default() -> Self {
        Self {
            config: GeneratorConfig::default(),
            categories: HashMap::new(),
        }
    }
}

impl HotwordGenerator {
    pub fn new(config: GeneratorConfig, categories: HashMap<String, CategoryHotwords>) -> Self {
        Self { config, categories }
    }

    /// Load `hotwords_config.yml` and `categories/*.yml` from a config dir;
    /// anything missing falls back to defaults.
    pub fn load(config_dir: &Path) -> Self {
        let config = match std::fs::read_to_string(config_dir.join("hotwords_config.yml")) {
            Ok(contents) => match serde_yaml::from_str::<GeneratorConfigFile>(&contents) {
                Ok(file) => file.hotwords,
                Err(e) => {
                    warn!("Bad hotword config, using defaults: {e}");
                    GeneratorConfig::default()
                }
            },
            Err(_) => {
                debug!("No hotword config file, using defaults");
                GeneratorConfig::default()
            }
        };

        let mut categories = HashMap::new();
        let categories_dir = config_dir.join("categories");
        if let Ok(entries) = std::fs::read_dir(&categories_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let is_yaml = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "yml" || e == "yaml");
                if !is_yaml {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                match std::fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|c| serde_yaml::from_str(&c).map_err(|e| e.to_string()))
                {
                    Ok(value) => {
                        categories.insert(name.to_string(), CategoryHotwords::from_yaml(name, &value));
                    }
                    Err(e) => warn!("Skipping category file {}: {e}", path.display()),
                }
            }
        }

        if !categories.is_empty() {
            info!("Loaded {} hotword categories", categories.len());
        }
        Self::new(config, categories)
    }

    fn method_enabled(&self, method: &str) -> bool {
        self.config
            .strategy
            .enabled_methods
            .iter()
            .any(|m| m == method)
    }

    /// Produce the deduplicated, weight-ordered hotword list for a request.
    pub fn generate(&self, request: &HotwordRequest) -> HotwordSet {
        let mut candidates: BTreeMap<String, f64> = BTreeMap::new();
        let mut add = |words: Vec<String>, weight: f64| {
            for word in words {
                let word = word.trim().to_string();
                if !word.is_empty() {
                    *candidates.entry(word).or_insert(0.0) += weight;
                }
            }
        };

        if self.method_enabled("category_based") && !self.categories.is_empty() {
            add(
                self.category_based_words(request),
                self.config.weights.category_based,
            );
        }

        if self.method_enabled("title_extraction") {
            if let Some(title) = request.title {
                add(
                    self.extract_keywords(title),
                    self.config.weights.title_extraction,
                );
            }
        }

        if self.method_enabled("tag_based") && !request.tags.is_empty() {
            add(self.tag_based_words(request.tags), self.config.weights.tag_based);
        }

        if self.method_enabled("learned") {
            add(self.learned_words(), self.config.weights.learned);
        }

        let mut ranked: Vec<(String, f64)> = candidates.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let max = request
            .max_hotwords
            .unwrap_or(self.config.strategy.max_hotwords);
        ranked.truncate(max);

        info!("Generated {} hotwords", ranked.len());
        HotwordSet::new(ranked, HotwordSource::AutoGenerated)
    }

    fn category_based_words(&self, request: &HotwordRequest) -> Vec<String> {
        let mut matched: Vec<&str> = Vec::new();
        let search_text = format!(
            "{} {}",
            request.title.unwrap_or(""),
            request.channel.unwrap_or("")
        )
        .to_lowercase();

        for (category, keywords) in &self.config.category_mapping.keywords {
            if keywords
                .iter()
                .any(|k| search_text.contains(&k.to_lowercase()))
            {
                matched.push(category);
            }
        }

        if let Some(channel) = request.channel {
            let channel = channel.to_lowercase();
            for (category, keywords) in &self.config.category_mapping.channels {
                if keywords.iter().any(|k| channel.contains(&k.to_lowercase())) {
                    matched.push(category);
                }
            }
        }

        for tag in request.tags {
            let tag = tag.to_lowercase();
            for (category, keywords) in &self.config.category_mapping.keywords {
                if keywords.iter().any(|k| {
                    let k = k.to_lowercase();
                    k.contains(&tag) || tag.contains(&k)
                }) {
                    matched.push(category);
                }
            }
        }

        matched.sort_unstable();
        matched.dedup();

        let mut words = Vec::new();
        for category in matched {
            let Some(hotwords) = self.categories.get(category) else {
                continue;
            };
            for (subcategory, sub_words) in &hotwords.subcategories {
                let weight = hotwords.weights.get(subcategory).copied().unwrap_or(1.0);
                let count = ((sub_words.len() as f64 * weight) as usize).max(1);
                words.extend(sub_words.iter().take(count).cloned());
            }
        }
        debug!("Category matching produced {} words", words.len());
        words
    }

    fn extract_keywords(&self, title: &str) -> Vec<String> {
        let min_length = self.config.strategy.min_keyword_length;
        tokenize_words(title)
            .into_iter()
            .filter(|word| {
                word.chars().count() >= min_length
                    && !word.chars().all(|c| c.is_ascii_digit())
                    && !STOPWORDS.contains(&word.to_lowercase().as_str())
            })
            .collect()
    }

    fn tag_based_words(&self, tags: &[String]) -> Vec<String> {
        let mut words: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| t.chars().count() >= 2)
            .collect();

        // Tags also pull in the leading words of related subcategories.
        for tag in tags {
            let tag = tag.to_lowercase();
            for hotwords in self.categories.values() {
                for (subcategory, sub_words) in &hotwords.subcategories {
                    let sub = subcategory.to_lowercase();
                    let related = sub.contains(&tag)
                        || tag.contains(&sub)
                        || sub_words.iter().take(3).any(|w| {
                            let w = w.to_lowercase();
                            w.contains(&tag) || tag.contains(&w)
                        });
                    if related {
                        words.extend(sub_words.iter().take(3).cloned());
                    }
                }
            }
        }
        words
    }

    /// Reserved extension point for learned corrections.
    fn learned_words(&self) -> Vec<String> {
        vec!["视频".to_string(), "内容".to_string()]
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Split text into word tokens: CJK runs and alphanumeric runs, scripts
/// kept separate.
pub fn tokenize_words(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_cjk = false;

    for c in text.chars() {
        if is_cjk(c) || c.is_alphanumeric() {
            let cjk = is_cjk(c);
            if !current.is_empty() && cjk != current_cjk {
                tokens.push(std::mem::take(&mut current));
            }
            current_cjk = cjk;
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech_categories() -> HashMap<String, CategoryHotwords> {
        let mut categories = HashMap::new();
        categories.insert(
            "tech".to_string(),
            CategoryHotwords {
                subcategories: vec![
                    (
                        "languages".to_string(),
                        vec!["Python".to_string(), "Rust".to_string(), "Go".to_string()],
                    ),
                    ("tools".to_string(), vec!["Docker".to_string()]),
                ],
                weights: [("languages".to_string(), 1.0), ("tools".to_string(), 1.0)]
                    .into_iter()
                    .collect(),
            },
        );
        categories
    }

    fn tech_config() -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config
            .category_mapping
            .keywords
            .insert("tech".to_string(), vec!["编程".to_string(), "coding".to_string()]);
        config
    }

    #[test]
    fn test_tokenize_mixed_scripts() {
        let tokens = tokenize_words("Python编程教程 2024 edition");
        assert_eq!(tokens, vec!["Python", "编程教程", "2024", "edition"]);
    }

    #[test]
    fn test_title_extraction_filters() {
        let generator = HotwordGenerator::default();
        let keywords = generator.extract_keywords("的 2024 Rust 编程教程 a");
        // Stopword, pure digits and one-char tokens are gone.
        assert_eq!(keywords, vec!["Rust", "编程教程"]);
    }

    #[test]
    fn test_category_words_via_title_keyword() {
        let generator = HotwordGenerator::new(tech_config(), tech_categories());
        let request = HotwordRequest {
            title: Some("编程入门"),
            ..Default::default()
        };
        let set = generator.generate(&request);
        let terms = set.term_list();
        assert!(terms.contains(&"Python".to_string()));
        assert!(terms.contains(&"Docker".to_string()));
    }

    #[test]
    fn test_subcategory_weight_limits_word_count() {
        let mut categories = tech_categories();
        categories
            .get_mut("tech")
            .unwrap()
            .weights
            .insert("languages".to_string(), 0.4);

        let generator = HotwordGenerator::new(tech_config(), categories);
        let request = HotwordRequest {
            title: Some("coding"),
            ..Default::default()
        };
        let terms = set_terms(&generator, &request);
        // 3 words * 0.4 -> 1 word drawn from the languages subcategory.
        assert!(terms.contains(&"Python".to_string()));
        assert!(!terms.contains(&"Rust".to_string()));
    }

    fn set_terms(generator: &HotwordGenerator, request: &HotwordRequest) -> Vec<String> {
        generator.generate(request).term_list()
    }

    #[test]
    fn test_user_tags_become_hotwords() {
        let generator = HotwordGenerator::default();
        let tags = vec!["机器学习".to_string(), "x".to_string()];
        let request = HotwordRequest {
            tags: &tags,
            ..Default::default()
        };
        let terms = set_terms(&generator, &request);
        assert!(terms.contains(&"机器学习".to_string()));
        // One-char tag dropped.
        assert!(!terms.contains(&"x".to_string()));
    }

    #[test]
    fn test_accumulated_weight_orders_terms() {
        let generator = HotwordGenerator::default();
        let tags = vec!["Rust".to_string()];
        let request = HotwordRequest {
            // "Rust" appears in both title and tags: 0.3 + 0.2.
            title: Some("Rust 异步详解"),
            tags: &tags,
            ..Default::default()
        };
        let terms = set_terms(&generator, &request);
        assert_eq!(terms[0], "Rust");
    }

    #[test]
    fn test_max_hotwords_cap() {
        let generator = HotwordGenerator::default();
        let request = HotwordRequest {
            title: Some("字幕 翻译 转录 热词 识别 模型 部署 服务 教程 入门 进阶 实战"),
            max_hotwords: Some(3),
            ..Default::default()
        };
        assert!(set_terms(&generator, &request).len() <= 3);
    }

    #[test]
    fn test_learned_fallback_present() {
        let generator = HotwordGenerator::default();
        let request = HotwordRequest::default();
        let terms = set_terms(&generator, &request);
        assert_eq!(terms, vec!["内容".to_string(), "视频".to_string()]);
    }

    #[test]
    fn test_category_file_parsing() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            r#"
tech:
  languages: [Python, Rust]
weights:
  languages: 0.5
"#,
        )
        .unwrap();
        let parsed = CategoryHotwords::from_yaml("tech", &yaml);
        assert_eq!(parsed.subcategories.len(), 1);
        assert_eq!(parsed.weights.get("languages"), Some(&0.5));
    }
}
