//! Small helpers shared by decorators and SQL builders.

use regex::Regex;

/// `a + b`, saturating at `max` instead of overflowing.
pub fn add_but_limit(a: i64, b: i64, max: i64) -> i64 {
    match a.checked_add(b) {
        Some(sum) if sum <= max => sum,
        _ => max,
    }
}

/// Anchored regex for an AQL wildcard pattern (`*` any run, `?` one character).
pub fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// SQL `like` pattern for an AQL wildcard pattern.
pub fn wildcard_to_like(pattern: &str) -> String {
    pattern.replace('*', "%").replace('?', "_")
}

/// Keep the first occurrence of each value.
pub fn dedup_in_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_but_limit() {
        assert_eq!(add_but_limit(4, 4, i64::MAX), 8);
        assert_eq!(add_but_limit(4, i64::MAX, i64::MAX), i64::MAX);
        assert_eq!(add_but_limit(i64::MAX, i64::MAX, i64::MAX), i64::MAX);
        assert_eq!(add_but_limit(5, 10, 12), 12);
    }

    #[test]
    fn test_wildcards() {
        let re = wildcard_regex("v*").unwrap();
        assert!(re.is_match("v-repo"));
        assert!(!re.is_match("other-v-repo"));
        let re = wildcard_regex("lib?.jar").unwrap();
        assert!(re.is_match("libs.jar"));
        assert!(!re.is_match("libsXjar"));
        assert_eq!(wildcard_to_like("*.ja?"), "%.ja_");
    }

    #[test]
    fn test_dedup_in_order() {
        let values = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedup_in_order(values), vec!["b", "a", "c"]);
    }
}
