//! Stage orchestration: KVD, frequency, lexical filter, singularization,
//! generation and scoring, with a bounded widening retry.

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::filter::kvd;
use crate::generate::{generate, GenerationPolicy};
use crate::llm::ChatClient;
use crate::model::{Candidate, FrequencyTable, KeywordTable, MatchedKeyword, ScoredCandidate};
use crate::score::score;
use crate::settings::Settings;
use crate::words::{remove_branded, singularize, tabulate};

/// Row counts around one stage of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct StageMetric {
    pub attempt: usize,
    pub stage: &'static str,
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    metrics: Vec<StageMetric>,
}

impl StageTracker {
    pub fn new() -> Self {
        StageTracker::default()
    }

    pub fn record(&mut self, attempt: usize, stage: &'static str, before: usize, after: usize) {
        info!(attempt, stage, before, after, removed = before.saturating_sub(after), "stage done");
        self.metrics.push(StageMetric { attempt, stage, before, after });
    }

    pub fn metrics(&self) -> &[StageMetric] {
        &self.metrics
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub app_name: String,
    pub market: String,
    pub difficulty_ceiling: f64,
    pub policy: GenerationPolicy,
}

impl GenerationRequest {
    pub fn new(app_name: impl Into<String>, market: impl Into<String>, settings: &Settings) -> Self {
        GenerationRequest {
            app_name: app_name.into(),
            market: market.into(),
            difficulty_ceiling: settings.difficulty_ceiling,
            policy: GenerationPolicy::default(),
        }
    }
}

/// Every table produced by the successful attempt.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub kvd: KeywordTable,
    pub frequency: FrequencyTable,
    pub unbranded: FrequencyTable,
    pub normalized: FrequencyTable,
    pub candidates: Vec<Candidate>,
    pub scored: Vec<ScoredCandidate>,
    pub matches: Vec<MatchedKeyword>,
    pub final_ceiling: f64,
    pub attempts: usize,
    pub tracker: StageTracker,
}

pub struct Pipeline<C> {
    settings: Settings,
    client: C,
}

impl<C: ChatClient> Pipeline<C> {
    pub fn new(settings: &Settings, client: C) -> Self {
        Pipeline { settings: settings.clone(), client }
    }

    /// Run every stage at the requested ceiling. When generation yields no
    /// usable candidates the ceiling is raised by `ceiling_step` and the run
    /// restarts from the KVD filter, at most `max_retries` more times.
    pub fn run(&self, universe: &KeywordTable, request: &GenerationRequest) -> Result<PipelineOutcome, PipelineError> {
        if universe.is_empty() {
            return Err(PipelineError::EmptyKeywordUniverse);
        }
        let mut tracker = StageTracker::new();
        let attempts = self.settings.max_retries + 1;
        let mut ceiling = request.difficulty_ceiling;

        for attempt in 1..=attempts {
            info!(attempt, ceiling, app = %request.app_name, market = %request.market, "pipeline attempt");

            let kvd_table = kvd(universe, ceiling);
            tracker.record(attempt, "kvd", universe.len(), kvd_table.len());

            let frequency = tabulate(&kvd_table, self.settings.frequency_provenance);
            tracker.record(attempt, "frequency", kvd_table.len(), frequency.len());

            let unbranded = remove_branded(&frequency, &self.client, &self.settings);
            tracker.record(attempt, "lexical", frequency.len(), unbranded.len());

            let normalized = singularize(&unbranded, &request.market, &self.client, &self.settings);
            tracker.record(attempt, "singularize", unbranded.len(), normalized.len());

            let generated = generate(&normalized, &request.app_name, &request.market, &self.client, &self.settings);
            let candidates = request.policy.screen(generated, &request.app_name);
            tracker.record(attempt, "generate", normalized.len(), candidates.len());

            if candidates.is_empty() {
                if attempt < attempts {
                    warn!(attempt, ceiling, next = ceiling + self.settings.ceiling_step, "no candidates, widening difficulty ceiling");
                    ceiling += self.settings.ceiling_step;
                }
                continue;
            }

            let (scored, matches) = score(&candidates, universe);
            tracker.record(attempt, "score", candidates.len(), scored.len());
            return Ok(PipelineOutcome {
                kvd: kvd_table,
                frequency,
                unbranded,
                normalized,
                candidates,
                scored,
                matches,
                final_ceiling: ceiling,
                attempts: attempt,
                tracker,
            });
        }

        Err(PipelineError::GenerationExhausted { attempts, last_ceiling: ceiling })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, IngestSource};
    use crate::llm::testing::ScriptedClient;
    use crate::words::ProvenanceMode;
    use std::path::PathBuf;

    const GOOD: &str = r#"{"data": [
        {"Title": "Tuna: Offline Music Player", "Subtitle": "Brain Games Word Puzzle Quiz"},
        {"Title": "Tuna Radio", "Subtitle": "Stations"}
    ]}"#;

    fn universe() -> KeywordTable {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/exports");
        ingest(&IngestSource::Folder { path, dedup: Default::default() }).unwrap()
    }

    fn request(policy: GenerationPolicy) -> GenerationRequest {
        GenerationRequest { policy, ..GenerationRequest::new("Tuna", "United States", &Settings::default()) }
    }

    #[test]
    fn first_attempt_success() {
        let client = ScriptedClient::new(["[]", "not a list", GOOD]);
        let out = Pipeline::new(&Settings::default(), &client).run(&universe(), &request(GenerationPolicy::Advisory)).unwrap();

        assert_eq!(out.attempts, 1);
        assert_eq!(out.final_ceiling, 30.0);
        assert_eq!(out.kvd.len(), 5);
        assert_eq!(out.frequency.rows()[0].word, "music");
        assert_eq!(out.normalized, out.unbranded);
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.scored.len(), 2);
        assert!(out.scored[0].matched_keywords.contains(&"music player".to_string()));
        assert!(out.scored[0].matched_keywords.contains(&"puzzle games".to_string()));
        assert!(out.matches.iter().any(|m| m.candidate == 1 && m.keyword == "radio stations"));
        assert_eq!(client.calls(), 3);
        assert_eq!(out.tracker.metrics().last().map(|m| m.stage), Some("score"));
    }

    #[test]
    fn empty_generation_widens_ceiling_and_retries() {
        let client = ScriptedClient::new(["[]", "[]", "garbage", "[]", "[]", GOOD]);
        let out = Pipeline::new(&Settings::default(), &client).run(&universe(), &request(GenerationPolicy::Advisory)).unwrap();
        assert_eq!(out.attempts, 2);
        assert_eq!(out.final_ceiling, 40.0);
        assert_eq!(client.calls(), 6);
        // difficulty 42 is still above the widened ceiling
        assert!(out.kvd.iter().all(|r| r.keyword != "puzzle games"));
    }

    #[test]
    fn retries_are_bounded() {
        let client = ScriptedClient::failing();
        let settings = Settings { max_retries: 2, ..Settings::default() };
        let err = Pipeline::new(&settings, &client)
            .run(&universe(), &request(GenerationPolicy::Advisory))
            .unwrap_err();
        match err {
            PipelineError::GenerationExhausted { attempts, last_ceiling } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_ceiling, 50.0);
            }
            other => panic!("unexpected error: {}", other),
        }
        // the failing brand call empties the table, so nothing else is asked
        assert_eq!(client.calls(), 3);
    }

    #[test]
    fn strict_policy_drops_violations() {
        let client = ScriptedClient::new(["[]", "[]", GOOD]);
        let out = Pipeline::new(&Settings::default(), &client).run(&universe(), &request(GenerationPolicy::Strict)).unwrap();
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].title, "Tuna: Offline Music Player");
    }

    #[test]
    fn provenance_mode_comes_from_settings() {
        let client = ScriptedClient::new(["[]", "[]", GOOD]);
        let settings = Settings { frequency_provenance: ProvenanceMode::TableWide, ..Settings::default() };
        let out = Pipeline::new(&settings, &client).run(&universe(), &request(GenerationPolicy::Advisory)).unwrap();
        let tags: Vec<_> = out.frequency.rows().iter().map(|r| r.provenance.as_deref()).collect();
        assert!(tags.iter().all(|t| *t == Some("Music")));
    }

    #[test]
    fn empty_universe_is_an_error() {
        let client = ScriptedClient::new(Vec::<String>::new());
        let result = Pipeline::new(&Settings::default(), &client).run(&KeywordTable::default(), &request(GenerationPolicy::Advisory));
        assert!(matches!(result, Err(PipelineError::EmptyKeywordUniverse)));
    }
}
