// SPDX-License-Identifier: MIT OR Apache-2.0
//! Path pattern matching and URL building for function routes.
//!
//! Pattern grammar: literal segments, `:name` single-segment captures, and a
//! trailing `*` tail wildcard that requires a non-empty tail. Trailing
//! slashes on both path and pattern are normalized away. Built paths are
//! prefixed with the function mount point `/fn/<functionId>`; parameters are
//! substituted verbatim, without encoding.

use std::collections::BTreeMap;

fn segments(input: &str) -> Vec<&str> {
    input.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Match `path` against `pattern`, returning captured parameters on success.
pub fn match_segments(path: &str, pattern: &str) -> Option<BTreeMap<String, String>> {
    let path_segments = segments(path);
    let mut pattern_segments = segments(pattern);

    let wildcard = pattern_segments.last() == Some(&"*");
    if wildcard {
        pattern_segments.pop();
        // The tail must be non-empty: the wildcard consumes at least one
        // segment beyond the literal prefix.
        if path_segments.len() <= pattern_segments.len() {
            return None;
        }
    } else if path_segments.len() != pattern_segments.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (pattern_segment, path_segment) in pattern_segments.iter().zip(path_segments.iter()) {
        match pattern_segment.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), (*path_segment).to_string());
            }
            None => {
                if pattern_segment != path_segment {
                    return None;
                }
            }
        }
    }
    Some(params)
}

/// Whether `path` matches `pattern`.
pub fn matches(path: &str, pattern: &str) -> bool {
    match_segments(path, pattern).is_some()
}

/// Captured parameters for `path` under `pattern`; empty when it does not
/// match.
pub fn params(path: &str, pattern: &str) -> BTreeMap<String, String> {
    match_segments(path, pattern).unwrap_or_default()
}

/// Resolve `pattern` with `params` and prepend the function mount point.
///
/// Unknown `:name` tokens are left as-is; values are substituted without
/// encoding.
pub fn build_path(function_id: &str, pattern: &str, params: &BTreeMap<String, String>) -> String {
    let mut resolved = String::new();
    for segment in pattern.split('/') {
        if segment.is_empty() {
            continue;
        }
        resolved.push('/');
        match segment.strip_prefix(':').and_then(|name| params.get(name)) {
            Some(value) => resolved.push_str(value),
            None => resolved.push_str(segment),
        }
    }
    format!("/fn/{function_id}{resolved}")
}

/// [`build_path`] prefixed with the platform base URL, trailing slash
/// trimmed.
pub fn build_url(
    base_url: &str,
    function_id: &str,
    pattern: &str,
    params: &BTreeMap<String, String>,
) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), build_path(function_id, pattern, params))
}
