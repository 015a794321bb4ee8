//! Maps freeform topic strings produced by the LLM onto the fixed
//! sixteen-tag vocabulary, so two items about the same subject always
//! aggregate under the same topic regardless of how the model phrased it.

use regex::Regex;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::topic::CANONICAL_TOPICS;

fn synonyms() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("housing", &["affordable housing", "rent", "tenant", "eviction", "apartment"]),
        ("zoning", &["rezoning", "land use", "variance", "setback"]),
        ("transportation", &["traffic", "transit", "bike lane", "parking", "roadway", "sidewalk"]),
        ("budget", &["appropriation", "fiscal", "expenditure", "fy budget"]),
        ("public_safety", &["police", "fire department", "emergency services", "crime"]),
        ("environment", &["climate", "sustainability", "emissions", "pollution"]),
        ("parks", &["recreation", "open space", "playground", "trail"]),
        ("utilities", &["water", "sewer", "electric utility", "stormwater"]),
        ("economic_development", &["business incentive", "redevelopment", "economic growth"]),
        ("education", &["school district", "curriculum", "school board"]),
        ("health", &["public health", "mental health", "hospital"]),
        ("planning", &["general plan", "master plan", "comprehensive plan"]),
        ("permits", &["building permit", "license", "permitting"]),
        ("contracts", &["procurement", "rfp", "vendor agreement", "bid award"]),
        ("appointments", &["appointment", "commission seat", "board vacancy"]),
    ]
}

/// Matches freeform topics against the canonical vocabulary and logs misses
/// to an append-only file for later taxonomy review.
pub struct TopicNormalizer {
    word_boundary_patterns: Vec<(&'static str, Vec<Regex>)>,
    unknown_log_path: PathBuf,
    unknown_log: Mutex<()>,
}

impl TopicNormalizer {
    pub fn new(unknown_log_path: impl Into<PathBuf>) -> Self {
        let word_boundary_patterns = synonyms()
            .iter()
            .map(|(canonical, syns)| {
                let patterns = syns
                    .iter()
                    .filter_map(|s| Regex::new(&format!(r"\b{}\b", regex::escape(s))).ok())
                    .collect();
                (*canonical, patterns)
            })
            .collect();

        Self {
            word_boundary_patterns,
            unknown_log_path: unknown_log_path.into(),
            unknown_log: Mutex::new(()),
        }
    }

    /// Normalizes a batch of topics into a sorted, deduplicated canonical set.
    pub fn normalize(&self, raw_topics: &[String]) -> Vec<String> {
        let mut canonical = BTreeSet::new();
        for raw in raw_topics {
            if let Some(tag) = self.match_one(raw) {
                canonical.insert(tag.to_string());
            } else {
                self.log_unknown(raw);
            }
        }
        canonical.into_iter().collect()
    }

    fn match_one(&self, raw: &str) -> Option<&'static str> {
        let cleaned = raw.trim().to_lowercase();
        if cleaned.is_empty() {
            return None;
        }

        if let Some(&tag) = CANONICAL_TOPICS.iter().find(|&&t| t == cleaned) {
            return Some(tag);
        }
        for (canonical, syns) in synonyms() {
            if syns.contains(&cleaned.as_str()) {
                return Some(canonical);
            }
        }

        for (canonical, patterns) in &self.word_boundary_patterns {
            if patterns.iter().any(|re| re.is_match(&cleaned)) {
                return Some(canonical);
            }
        }

        None
    }

    fn log_unknown(&self, raw: &str) {
        let _guard = self.unknown_log.lock().unwrap();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.unknown_log_path)
            .and_then(|mut f| writeln!(f, "{raw}"));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to append to unknown_topics.log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TopicNormalizer {
        TopicNormalizer::new(std::env::temp_dir().join("engagic_unknown_topics_test.log"))
    }

    #[test]
    fn direct_hit_on_canonical_tag() {
        let n = normalizer();
        assert_eq!(n.normalize(&["Housing".to_string()]), vec!["housing"]);
    }

    #[test]
    fn synonym_direct_hit() {
        let n = normalizer();
        assert_eq!(n.normalize(&["rezoning".to_string()]), vec!["zoning"]);
    }

    #[test]
    fn word_boundary_partial_match_does_not_overreach() {
        let n = normalizer();
        // "parking" must not match the "park" synonym family via substring.
        assert_eq!(n.normalize(&["street parking fees".to_string()]), vec!["transportation"]);
        assert!(n.normalize(&["parking".to_string()]).contains(&"transportation".to_string()));
    }

    #[test]
    fn unmatched_topic_is_dropped() {
        let n = normalizer();
        assert!(n.normalize(&["interstellar commerce".to_string()]).is_empty());
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let n = normalizer();
        let out = n.normalize(&[
            "zoning".to_string(),
            "housing".to_string(),
            "rezoning".to_string(),
        ]);
        assert_eq!(out, vec!["housing", "zoning"]);
    }
}
