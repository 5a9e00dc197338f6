//! Stopword and brand/proper-noun removal.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::llm::extract::{parse_string_array, split_loose_list};
use crate::llm::prompts::{brand_user, BRAND_SYSTEM};
use crate::llm::{ChatClient, ChatRequest};
use crate::model::FrequencyTable;
use crate::settings::Settings;

/// English function words plus store boilerplate that never belongs in a title.
pub const STOPWORDS: &[&str] = &[
    "free", "new", "best", "top", "iphone", "ipad", "android", "google", "store", "download",
    "downloads", "for", "apple", "with", "yours", "a", "about", "above", "after", "again",
    "against", "all", "am", "an", "and", "any", "app", "are", "aren't", "as", "at", "be",
    "because", "been", "before", "being", "below", "between", "both", "but", "by", "can't",
    "cannot", "could", "couldn't", "did", "didn't", "do", "does", "doesn't", "doing", "don't",
    "down", "during", "each", "few", "from", "further", "had", "hadn't", "has", "hasn't",
    "have", "haven't", "having", "he", "he'd", "he'll", "he's", "her", "here", "here's",
    "hers", "herself", "him", "himself", "his", "how", "how's", "i", "i'd", "i'll", "i'm",
    "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "let's", "me",
    "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of", "off", "on", "once",
    "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own", "same",
    "shan't", "she", "she'd", "she'll", "she's", "should", "shouldn't", "so", "some", "such",
    "than", "that", "that's", "the", "their", "theirs", "them", "themselves", "then", "there",
    "there's", "these", "they", "they'd", "they'll", "they're", "they've", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd",
    "we'll", "we're", "we've", "were", "weren't", "what", "what's", "when", "when's", "where",
    "where's", "which", "while", "who", "who's", "whom", "why", "why's", "won't", "would",
    "wouldn't", "you", "you'd", "you'll", "you're", "you've", "your", "yourself", "yourselves",
];

/// Above this many words the classifier reply is likely to be cut off at
/// `classifier_max_tokens`.
const LARGE_WORD_LIST: usize = 400;

fn classify_brands<C: ChatClient>(words: &[&str], client: &C, settings: &Settings) -> Option<Vec<String>> {
    let request = ChatRequest::new(&settings.classifier_model, BRAND_SYSTEM, brand_user(words))
        .with_max_tokens(settings.classifier_max_tokens);

    let answer = match client.complete(&request) {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, "brand classifier call failed");
            return None;
        }
    };
    debug!(answer = %answer, "brand classifier reply");

    let brands = parse_string_array(&answer).unwrap_or_else(|e| {
        debug!(error = %e, "classifier reply is not a JSON list, splitting on commas");
        split_loose_list(&answer)
    });
    Some(brands)
}

/// Drop stopwords and whatever the classifier flags as a brand or proper noun.
///
/// A failed classifier call yields an empty table; callers treat emptiness as
/// the failure signal.
pub fn remove_branded<C: ChatClient>(table: &FrequencyTable, client: &C, settings: &Settings) -> FrequencyTable {
    if table.is_empty() {
        return FrequencyTable::default();
    }
    let words = table.words();
    if words.len() > LARGE_WORD_LIST {
        warn!(words = words.len(), "large word list sent to the brand classifier in one call");
    }

    let Some(brands) = classify_brands(&words, client, settings) else {
        return FrequencyTable::default();
    };

    let excluded: HashSet<String> = STOPWORDS
        .iter()
        .map(|w| w.to_string())
        .chain(brands.iter().map(|b| b.to_lowercase()))
        .collect();

    let kept: Vec<_> = table
        .rows()
        .iter()
        .filter(|r| !excluded.contains(&r.word.to_lowercase()))
        .cloned()
        .collect();
    info!(brands = brands.len(), before = table.len(), after = kept.len(), "removed branded and stop words");
    FrequencyTable::new(kept)
}
