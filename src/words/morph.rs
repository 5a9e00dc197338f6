//! Plural-suffix removal through the chat service.

use tracing::{info, warn};

use crate::llm::extract::parse_string_array;
use crate::llm::prompts::{singular_system, singular_user};
use crate::llm::{ChatClient, ChatRequest};
use crate::model::{FrequencyTable, WordFrequency};
use crate::settings::Settings;

/// Reduce each word to its singular form and merge words that collapse together.
///
/// Frequencies are carried over positionally, never recounted. Any failure
/// (call error, unparseable reply, empty list) returns the input unchanged; a
/// reply whose length differs from the input is ignored and the original words
/// are kept.
pub fn singularize<C: ChatClient>(
    table: &FrequencyTable,
    market: &str,
    client: &C,
    settings: &Settings,
) -> FrequencyTable {
    if table.is_empty() {
        return table.clone();
    }
    let words = table.words();
    let request = ChatRequest::new(&settings.normalizer_model, singular_system(market), singular_user(&words))
        .with_timeout(settings.normalizer_timeout());

    let reply = match client.complete(&request) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "singularization call failed, keeping words as-is");
            return table.clone();
        }
    };
    let singular = match parse_string_array(&reply) {
        Ok(list) if !list.is_empty() => list,
        Ok(_) => {
            warn!("singularization reply was an empty list, keeping words as-is");
            return table.clone();
        }
        Err(e) => {
            warn!(error = %e, "singularization reply is not a JSON list, keeping words as-is");
            return table.clone();
        }
    };

    let base_forms: Vec<String> = if singular.len() == words.len() {
        singular
    } else {
        warn!(sent = words.len(), got = singular.len(), "singularization reply length mismatch, keeping words as-is");
        words.iter().map(|w| w.to_string()).collect()
    };

    let rows = table
        .rows()
        .iter()
        .zip(base_forms)
        .map(|(row, word)| WordFrequency { provenance: row.provenance.clone(), word, frequency: row.frequency })
        .collect();
    let merged = FrequencyTable::new(rows).aggregate();
    info!(before = table.len(), after = merged.len(), market, "singularized words");
    merged
}
