//! Metadata-driven selector used by the layer auto-partition path: select
//! catalog entries whose `frequency` and `layerN` fields match a query,
//! falling back from `getDataLayer` to a metadata-filtered `getDataCode`.

use crate::model::{DataLayerQuery, MetadataEntry};

/// Select entries matching `query.frequency` (case-insensitive) and every
/// set `layerN` pattern in `query`, returning sorted, deduplicated
/// `series_code`s.
pub fn select_series_codes(entries: &[MetadataEntry], query: &DataLayerQuery) -> Vec<String> {
    let mut codes: Vec<String> = entries
        .iter()
        .filter(|entry| matches_entry(entry, query))
        .map(|entry| entry.series_code.clone())
        .collect();
    codes.sort();
    codes.dedup();
    codes
}

fn matches_entry(entry: &MetadataEntry, query: &DataLayerQuery) -> bool {
    let frequency_matches = entry
        .frequency
        .as_deref()
        .unwrap_or("")
        .eq_ignore_ascii_case(&query.frequency);
    if !frequency_matches {
        return false;
    }

    query.layers().into_iter().all(|(n, pattern)| {
        let value = entry.layer(n).unwrap_or("");
        pattern_matches(pattern, value)
    })
}

/// `None`/`"*"` matches anything; a pattern containing any of `* ? [` is a
/// case-sensitive glob; otherwise exact equality (a missing field is
/// treated as empty string).
fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if pattern.contains(['*', '?', '[']) {
        glob_match(pattern, value)
    } else {
        pattern == value
    }
}

/// Minimal `fnmatch`-style glob matcher: `*` (any run), `?` (any one
/// char), and `[...]`/`[!...]`/`[^...]` character classes. Case-sensitive,
/// single-segment (no path separator handling — the only inputs are BOJ
/// layer codes, never paths).
fn glob_match(pattern: &str, value: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();
    glob_match_at(&p, &v)
}

fn glob_match_at(p: &[char], v: &[char]) -> bool {
    match p.first() {
        None => v.is_empty(),
        Some('*') => {
            glob_match_at(&p[1..], v) || (!v.is_empty() && glob_match_at(p, &v[1..]))
        }
        Some('?') => !v.is_empty() && glob_match_at(&p[1..], &v[1..]),
        Some('[') => {
            let Some(close) = p.iter().position(|&c| c == ']') else {
                return !v.is_empty() && p[0] == v[0] && glob_match_at(&p[1..], &v[1..]);
            };
            if v.is_empty() {
                return false;
            }
            let class = &p[1..close];
            let (negate, class) = match class.first() {
                Some('!') | Some('^') => (true, &class[1..]),
                _ => (false, class),
            };
            let hit = class.contains(&v[0]);
            if hit == negate {
                return false;
            }
            glob_match_at(&p[close + 1..], &v[1..])
        }
        Some(c) => !v.is_empty() && *c == v[0] && glob_match_at(&p[1..], &v[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(frequency: &str, layer1: &str) -> DataLayerQuery {
        DataLayerQuery {
            db: "db".into(),
            frequency: frequency.into(),
            lang: "JP".into(),
            layer1: layer1.into(),
            layer2: None,
            layer3: None,
            layer4: None,
            layer5: None,
            start_date: None,
            end_date: None,
            start_position: None,
        }
    }

    fn entry(series_code: &str, frequency: &str, layer1: &str) -> MetadataEntry {
        MetadataEntry {
            series_code: series_code.into(),
            frequency: Some(frequency.into()),
            layer1: Some(layer1.into()),
            ..Default::default()
        }
    }

    #[test]
    fn glob_star_matches_prefix() {
        assert!(glob_match("A*", "A1"));
        assert!(glob_match("A*", "A"));
        assert!(!glob_match("A*", "B1"));
    }

    #[test]
    fn glob_question_mark_matches_one_char() {
        assert!(glob_match("A?", "A1"));
        assert!(!glob_match("A?", "A12"));
    }

    #[test]
    fn glob_char_class_and_negation() {
        assert!(glob_match("A[12]", "A1"));
        assert!(!glob_match("A[12]", "A3"));
        assert!(glob_match("A[!12]", "A3"));
    }

    #[test]
    fn exact_match_when_no_wildcard_chars() {
        assert!(pattern_matches("A1", "A1"));
        assert!(!pattern_matches("A1", "A2"));
    }

    #[test]
    fn selection_is_case_insensitive_on_frequency_and_sorted_deduped() {
        let entries = vec![entry("S_A2", "m", "A2"), entry("S_A1", "M", "A1"), entry("S_B1", "M", "B1")];
        let query = query("M", "A*");
        let codes = select_series_codes(&entries, &query);
        assert_eq!(codes, vec!["S_A1", "S_A2"]);
    }

    #[test]
    fn missing_layer_field_is_treated_as_empty_string() {
        let mut e = entry("S1", "M", "A1");
        e.layer1 = None;
        let query = query("M", "A1");
        assert!(!matches_entry(&e, &query));

        let query_any = query("M", "*");
        assert!(matches_entry(&e, &query_any));
    }
}
