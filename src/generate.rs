//! Title/subtitle generation and keyword-field packing.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::llm::extract::parse_object;
use crate::llm::prompts::{title_system, title_user};
use crate::llm::{ChatClient, ChatRequest};
use crate::model::{Candidate, FrequencyTable};
use crate::settings::Settings;
use crate::utils::lower_tokens;

/// Number of title/subtitle pairs requested per generation.
pub const CANDIDATE_COUNT: usize = 5;

/// What to do with candidates that break the length or app-name rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPolicy {
    /// Log violations and keep every candidate.
    #[default]
    Advisory,
    /// Drop candidates with any violation.
    Strict,
}

impl GenerationPolicy {
    pub fn screen(self, candidates: Vec<Candidate>, app_name: &str) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| {
                let violations = c.violations(app_name);
                if violations.is_empty() {
                    return true;
                }
                for v in &violations {
                    warn!(title = %c.title, subtitle = %c.subtitle, "{}", v);
                }
                self == GenerationPolicy::Advisory
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct Envelope {
    data: Vec<Pair>,
}

#[derive(Deserialize)]
struct Pair {
    #[serde(rename = "Title", alias = "title")]
    title: String,
    #[serde(rename = "Subtitle", alias = "subtitle")]
    subtitle: String,
}

/// Comma-join the priority words not used in the title or subtitle, stopping at
/// the first word that would push the field past `budget` characters.
pub fn pack_unused_keywords(priority: &[&str], title: &str, subtitle: &str, budget: usize) -> String {
    let used: HashSet<String> = lower_tokens(title).into_iter().chain(lower_tokens(subtitle)).collect();
    let mut field = String::new();
    let mut field_len = 0;
    for word in priority.iter().filter(|w| !used.contains(&w.to_lowercase())) {
        let word_len = word.chars().count();
        let next_len = if field.is_empty() { word_len } else { field_len + 1 + word_len };
        if next_len > budget {
            break;
        }
        if !field.is_empty() {
            field.push(',');
        }
        field.push_str(word);
        field_len = next_len;
    }
    field
}

/// Ask for [`CANDIDATE_COUNT`] title/subtitle pairs built from the words in
/// `table`, highest frequency first.
///
/// Returns no candidates when the reply cannot be read; the pipeline treats
/// that as the signal to widen the difficulty ceiling and try again.
pub fn generate<C: ChatClient>(
    table: &FrequencyTable,
    app_name: &str,
    market: &str,
    client: &C,
    settings: &Settings,
) -> Vec<Candidate> {
    let mut rows: Vec<_> = table.rows().iter().collect();
    rows.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    let priority: Vec<&str> = rows.iter().map(|r| r.word.as_str()).collect();
    if priority.is_empty() {
        warn!("no keywords left to generate from");
        return Vec::new();
    }

    let request = ChatRequest::new(
        &settings.generator_model,
        title_system(app_name, market, CANDIDATE_COUNT),
        title_user(&priority, CANDIDATE_COUNT),
    )
    .with_temperature(settings.generator_temperature)
    .with_max_tokens(settings.generator_max_tokens)
    .with_timeout(settings.generator_timeout());

    let reply = match client.complete(&request) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "title generation call failed");
            return Vec::new();
        }
    };
    let mut pairs = match parse_object::<Envelope>(&reply) {
        Ok(env) => env.data,
        Err(e) => {
            warn!(error = %e, "title generation reply could not be parsed");
            debug!(reply = %reply, "unparsed generation reply");
            return Vec::new();
        }
    };

    if pairs.len() > CANDIDATE_COUNT {
        debug!(got = pairs.len(), "truncating extra title/subtitle pairs");
        pairs.truncate(CANDIDATE_COUNT);
    } else if pairs.len() < CANDIDATE_COUNT {
        warn!(got = pairs.len(), wanted = CANDIDATE_COUNT, "fewer title/subtitle pairs than requested");
    }

    let candidates: Vec<Candidate> = pairs
        .into_iter()
        .map(|p| {
            let field = pack_unused_keywords(&priority, &p.title, &p.subtitle, settings.keyword_budget);
            Candidate::new(p.title, p.subtitle, field)
        })
        .collect();
    info!(candidates = candidates.len(), keywords = priority.len(), "generated titles");
    candidates
}
