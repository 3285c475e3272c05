//! Incremental log template clustering for one service
//!
//! Each incoming line is matched against existing templates with the same
//! token count using positional similarity. A good-enough match merges
//! into the template, wildcarding positions that differ; otherwise a new
//! template is created, evicting the least-recently-seen one when the
//! per-service cap is reached.
//!
//! Template ids are content-derived hashes of the creation-time token
//! sequence, so replaying the same stream reproduces the same ids and
//! counts.

use super::tokenize::{template_id, tokenize, WILDCARD};
use crate::models::{LogPatternOccurrence, LogSeverity, LogTemplate, SeverityCounts};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Similarity at or above which a line merges into a template
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.6;

/// Default per-service template cap
pub const DEFAULT_TEMPLATE_CAP: usize = 512;

/// Default retained sample lines per template
pub const DEFAULT_SAMPLE_CAPACITY: usize = 5;

/// A template with total count at or below this is flagged rare
const RARE_COUNT_THRESHOLD: u64 = 5;

/// Error/fatal occurrence ratio at or above which a template is flagged
/// as an error pattern
const ERROR_PATTERN_RATIO: f64 = 0.5;

/// Tunables for template mining, externally supplied
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub merge_threshold: f64,
    pub template_cap: usize,
    pub sample_capacity: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            template_cap: DEFAULT_TEMPLATE_CAP,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
        }
    }
}

/// Result of ingesting one line
#[derive(Debug, Clone)]
pub struct MineOutcome {
    pub template_id: String,
    /// True when the line created a brand-new template rather than merging
    pub created: bool,
    /// True when creating the template evicted another one
    pub evicted: Option<String>,
    pub occurrence: LogPatternOccurrence,
}

/// Per-service incremental template clusterer
///
/// Owned by exactly one worker; all mutation is sequential per service.
pub struct TemplateMiner {
    service: String,
    config: MinerConfig,
    templates: HashMap<String, LogTemplate>,
    /// Candidate index: token count -> template ids in creation order
    by_token_count: HashMap<usize, Vec<String>>,
}

impl TemplateMiner {
    pub fn new(service: impl Into<String>, config: MinerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            templates: HashMap::new(),
            by_token_count: HashMap::new(),
        }
    }

    /// Cluster one line into a template and update its statistics
    pub fn ingest(
        &mut self,
        timestamp: i64,
        severity: LogSeverity,
        body: &str,
        session_id: Option<String>,
    ) -> MineOutcome {
        let tokens = tokenize(body);

        let best = self.best_candidate(&tokens);

        let (id, created, evicted) = match best {
            Some((id, similarity)) if similarity >= self.config.merge_threshold => {
                (id, false, None)
            }
            _ => {
                let id = template_id(&tokens);
                if self.templates.contains_key(&id) {
                    // The exact token sequence already exists (recreated
                    // after its positions were generalized elsewhere)
                    (id, false, None)
                } else {
                    let evicted = self.evict_if_full();
                    self.insert_template(&id, &tokens, timestamp);
                    (id, true, evicted)
                }
            }
        };

        let template = self
            .templates
            .get_mut(&id)
            .expect("matched template must exist");

        let variables = merge_into_template(template, &tokens);

        template.total_count += 1;
        template.last_seen = timestamp;
        template.severity_counts.record(severity);
        template.sample_lines.push_back(body.to_string());
        while template.sample_lines.len() > self.config.sample_capacity {
            template.sample_lines.pop_front();
        }
        template.is_error_pattern =
            template.severity_counts.error_ratio() >= ERROR_PATTERN_RATIO;
        template.is_rare_pattern = template.total_count <= RARE_COUNT_THRESHOLD;

        let occurrence = LogPatternOccurrence {
            template_id: id.clone(),
            service: self.service.clone(),
            timestamp,
            session_id,
            extracted_variables: variables,
        };

        MineOutcome {
            template_id: id,
            created,
            evicted,
            occurrence,
        }
    }

    /// Highest-similarity template with the same token count.
    /// Candidates are scanned in creation order; ties keep the earliest.
    fn best_candidate(&self, tokens: &[String]) -> Option<(String, f64)> {
        let candidates = self.by_token_count.get(&tokens.len())?;

        let mut best: Option<(String, f64)> = None;
        for id in candidates {
            let template = &self.templates[id];
            let similarity = positional_similarity(&template.tokens, tokens);
            let better = match &best {
                Some((_, best_sim)) => similarity > *best_sim,
                None => true,
            };
            if better {
                best = Some((id.clone(), similarity));
            }
        }
        best
    }

    fn insert_template(&mut self, id: &str, tokens: &[String], timestamp: i64) {
        let template = LogTemplate {
            id: id.to_string(),
            service: self.service.clone(),
            tokens: tokens.to_vec(),
            total_count: 0,
            first_seen: timestamp,
            last_seen: timestamp,
            severity_counts: SeverityCounts::default(),
            sample_lines: VecDeque::new(),
            is_error_pattern: false,
            is_rare_pattern: true,
        };
        self.by_token_count
            .entry(tokens.len())
            .or_default()
            .push(id.to_string());
        self.templates.insert(id.to_string(), template);
    }

    /// Evict the least-recently-seen template when at the cap.
    /// Ties break on id so replays evict deterministically.
    fn evict_if_full(&mut self) -> Option<String> {
        if self.templates.len() < self.config.template_cap {
            return None;
        }

        let victim = self
            .templates
            .values()
            .min_by(|a, b| {
                a.last_seen
                    .cmp(&b.last_seen)
                    .then_with(|| a.id.cmp(&b.id))
            })?
            .id
            .clone();

        let template = self.templates.remove(&victim)?;
        if let Some(ids) = self.by_token_count.get_mut(&template.tokens.len()) {
            ids.retain(|id| *id != victim);
        }
        debug!(
            service = %self.service,
            template_id = %victim,
            "Template cap reached, evicted least-recently-seen template"
        );
        Some(victim)
    }

    pub fn template(&self, id: &str) -> Option<&LogTemplate> {
        self.templates.get(id)
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn templates(&self) -> impl Iterator<Item = &LogTemplate> {
        self.templates.values()
    }
}

/// Fraction of positions with identical tokens, ignoring positions the
/// template has already wildcarded. Different lengths never match; a
/// fully-wildcarded template matches everything of its length.
fn positional_similarity(template_tokens: &[String], line_tokens: &[String]) -> f64 {
    if template_tokens.len() != line_tokens.len() {
        return 0.0;
    }

    let mut comparable = 0usize;
    let mut matches = 0usize;
    for (t, l) in template_tokens.iter().zip(line_tokens) {
        if t == WILDCARD {
            continue;
        }
        comparable += 1;
        if t == l {
            matches += 1;
        }
    }

    if comparable == 0 {
        return 1.0;
    }
    matches as f64 / comparable as f64
}

/// Wildcard the template positions that differ from the line and return
/// the line's tokens at every wildcard position as extracted variables.
fn merge_into_template(template: &mut LogTemplate, line_tokens: &[String]) -> Vec<String> {
    let mut variables = Vec::new();
    for (position, line_token) in line_tokens.iter().enumerate() {
        let slot = &mut template.tokens[position];
        if *slot == WILDCARD {
            variables.push(line_token.clone());
        } else if slot != line_token {
            *slot = WILDCARD.to_string();
            variables.push(line_token.clone());
        }
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_similarity_ignores_wildcards() {
        let template = vec![
            "User".to_string(),
            WILDCARD.to_string(),
            "logged".to_string(),
            "in".to_string(),
        ];
        let line = vec![
            "User".to_string(),
            "789".to_string(),
            "logged".to_string(),
            "in".to_string(),
        ];
        assert!((positional_similarity(&template, &line) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_positional_similarity_length_mismatch() {
        let a = vec!["a".to_string()];
        let b = vec!["a".to_string(), "b".to_string()];
        assert_eq!(positional_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_all_wildcard_template_matches() {
        let template = vec![WILDCARD.to_string(), WILDCARD.to_string()];
        let line = vec!["x".to_string(), "y".to_string()];
        assert!((positional_similarity(&template, &line) - 1.0).abs() < f64::EPSILON);
    }
}
