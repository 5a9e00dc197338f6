use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Lowercased whitespace tokens of `text`.
pub fn lower_tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Lowercased words of `text` in order, with leading and trailing punctuation
/// removed. Tokens that are only punctuation are skipped.
pub fn bare_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Replace characters that are not allowed in file names with `_`.
pub fn sanitize_filename(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
    re.replace_all(name.trim(), "_").into_owned()
}

/// True when the first and last letters of `keyword` are Latin script.
/// Keywords without letters count as Latin.
pub fn is_latin_only(keyword: &str) -> bool {
    let mut letters = keyword.chars().filter(|c| c.is_alphabetic());
    let Some(first) = letters.next() else {
        return true;
    };
    let last = letters.last().unwrap_or(first);
    is_latin_letter(first) && is_latin_letter(last)
}

fn is_latin_letter(c: char) -> bool {
    let cp = c as u32;
    c.is_ascii_alphabetic()
        || matches!(
            cp,
            0x00AA
                | 0x00BA
                | 0x00C0..=0x00D6
                | 0x00D8..=0x00F6
                | 0x00F8..=0x024F
                | 0x1E00..=0x1EFF
                | 0x2C60..=0x2C7F
                | 0xA720..=0xA7FF
                | 0xAB30..=0xAB6F
                | 0xFF21..=0xFF3A
                | 0xFF41..=0xFF5A
        )
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my:report/v2?"), "my_report_v2_");
        assert_eq!(sanitize_filename("  plain name "), "plain name");
        assert_eq!(sanitize_filename(r#"a<b>c"d\e|f*g"#), "a_b_c_d_e_f_g");
    }

    #[test]
    fn test_is_latin_only() {
        assert!(is_latin_only("photo editor"));
        assert!(is_latin_only("café"));
        assert!(is_latin_only("ğüzel şarkı"));
        assert!(is_latin_only("2048"));
        assert!(is_latin_only(""));
        assert!(!is_latin_only("音乐"));
        assert!(!is_latin_only("музыка"));
        assert!(!is_latin_only("music 音乐"));
    }

    #[test]
    fn test_bare_words() {
        assert_eq!(bare_words("Tuna: Music & Radio, Tuna's"), ["tuna", "music", "radio", "tuna's"]);
        assert!(bare_words(" - & ").is_empty());
    }

    #[test]
    fn test_lower_tokens() {
        let t = lower_tokens("Best  Photo\tEditor best");
        assert_eq!(t.len(), 3);
        assert!(t.contains("best") && t.contains("photo") && t.contains("editor"));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
        assert_eq!(round_to(10.0, 3), 10.0);
    }
}
