/// Filler words the generator must keep out of titles and subtitles.
pub const FILLER_WORDS: [&str; 5] = ["and", "or", "your", "my", "with"];

fn json_list(words: &[&str]) -> String {
    serde_json::to_string(words).unwrap_or_else(|_| "[]".to_string())
}

pub const BRAND_SYSTEM: &str = r#"You are an expert in identifying branded words and proper nouns. Your task is to determine if the given words are branded words or proper nouns (like "Williams", "Sherwin", etc.).
You need to identify and return only the words that are branded or proper nouns from the provided list.

1. Review the following list of words.
2. Identify the branded words and proper nouns.
3. Return the list of identified branded words and proper nouns.

Example:
- Input: ["Apple", "car", "Sherwin", "painting"]
- Output: ["Apple", "Sherwin"]

Important: only include the branded words and proper nouns in the returned list, and avoid any other words."#;

pub fn brand_user(words: &[&str]) -> String {
    format!(
        r#"Here is the list of words:
{list}

Return the list of branded words and proper nouns in the following format:
["word1", "word2", "word3"]"#,
        list = json_list(words)
    )
}

pub fn singular_system(market: &str) -> String {
    format!(
        r#"You are an expert in language processing. Your task is:
1. Given a list of keywords in the language relevant to the market of {market},
2. Remove only the plural suffixes from each word to return the singular/base form. For English keywords remove plural suffixes such as -s, -es and -ies. For other languages apply the plural suffix rules of the language used in {market}.
3. If a word does not end with a plural suffix, leave it unchanged.
4. Return exactly one output word per input word, in the same order.

Example:
- Input: ["cats", "boxes", "stories", "apple"]
- Output: ["cat", "box", "story", "apple"]

WARNING: Only remove plural suffixes. Do not remove any other suffix or modify the word in any other way."#,
        market = market
    )
}

pub fn singular_user(words: &[&str]) -> String {
    format!(
        r#"Here is the list of words:
{list}

Return the processed list as a JSON array of strings, for example:
["word1","word2","word3"]"#,
        list = json_list(words)
    )
}

pub fn title_system(app_name: &str, market: &str, count: usize) -> String {
    let fillers = FILLER_WORDS.map(|w| format!("\"{}\"", w)).join(", ");
    format!(
        r#"You are an experienced ASO (App Store Optimization) expert. Generate optimized App Store Title and Subtitle pairs from the provided keyword data, taking into account the market characteristics of **{market}**.

The keywords are sorted by frequency, most frequent first.

1. **Title**:
- Must include the app name: **{app_name}**
- Must be no longer than **30 characters** and no shorter than **25 characters**.
- Use the most frequent keywords first.
- Every title must use a different combination of keywords.
- Do not use any of these words: {fillers}.

2. **Subtitle**:
- Must be no longer than **30 characters** and no shorter than **25 characters**.
- Do not repeat any keyword used in the Title.
- Use the most frequent keywords first.
- Every subtitle must be distinct from the others.
- Do not use any of these words: {fillers}.

3. **Important**:
- Prefer keywords from the beginning of the list.
- Generate exactly {count} title/subtitle pairs."#,
        market = market,
        app_name = app_name,
        fillers = fillers,
        count = count
    )
}

pub fn title_user(keywords: &[&str], count: usize) -> String {
    let rows = vec![r#"    {"Title": "Generated Title", "Subtitle": "Generated Subtitle"}"#; count].join(",\n");
    format!(
        r#"Here are the most frequent keywords:
{keywords}
- The title and subtitle must be no longer than 30 characters and no shorter than 25 characters.
- Generate exactly {count} title/subtitle pairs.

Provide the output strictly in the following JSON format:
{{
"data": [
{rows}
]
}}"#,
        keywords = keywords.join(","),
        count = count,
        rows = rows
    )
}

pub fn related_system(max_results: usize) -> String {
    format!(
        r#"You are an expert in ASO (App Store Optimization) keyword analysis. Your task is to find ALL keywords from the provided list that are related to the search term for mobile app marketing.

Prioritize:
1. Direct matches: keywords that equal or contain the search term.
2. Semantic similarity: keywords with a similar meaning in an app context.
3. Typos: common misspellings of the search term.
4. App-related variations and related concepts.

Rules:
- Return only keywords that exist in the provided list, spelled exactly as given.
- Return at most {max_results} keywords, most relevant first.
- Return the result as a JSON array of strings.

Example:
Search term: "photo"
Good matches: "photo", "photo editor", "photo collage", "foto", "camera", "picture""#,
        max_results = max_results
    )
}

pub fn related_user(term: &str, keywords: &[&str]) -> String {
    format!(
        r#"Search term: "{term}"

Available keywords to search within ({count} total):
{keywords}

Return the related keywords as a JSON array of strings, most relevant first."#,
        term = term,
        count = keywords.len(),
        keywords = keywords.join(", ")
    )
}
