//! URL Utilities
//!
//! Query string manipulation for endpoints and redirect URLs. All functions
//! work on absolute URLs and on bare paths alike.

use serde_json::Value;
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Request parameters, in insertion order.
pub type Params = serde_json::Map<String, Value>;

/// A URL split into its base, query and fragment.
struct UrlParts<'a> {
    base: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };
        let (base, query) = match rest.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (rest, None),
        };
        Self {
            base,
            query,
            fragment,
        }
    }

    fn join(&self, query: &str) -> String {
        let mut url = self.base.to_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        if let Some(fragment) = self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }
}

/// Remove the named params from the query of `url`.
///
/// The `?` is dropped when no params remain.
pub fn remove_params(url: &str, names: &[&str]) -> String {
    let parts = UrlParts::split(url);
    let Some(query) = parts.query else {
        return url.to_string();
    };

    let kept = form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| !names.contains(&key.as_ref()))
        .collect::<Vec<_>>();

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(kept)
        .finish();
    parts.join(&query)
}

/// Append params to the query of `url`.
///
/// Values already in the URL win over `new_params` for shared keys, and the
/// merged query is re-serialized with keys in lexicographic order.
pub fn append_params(url: &str, new_params: &Params) -> String {
    if new_params.is_empty() {
        return url.to_string();
    }

    let parts = UrlParts::split(url);
    let existing = match parts.query {
        Some(query) if !query.is_empty() => query_as_map(query),
        _ => return parts.join(&build_query(new_params)),
    };

    let flattened = flatten_params(new_params);
    if flattened.iter().all(|(key, _)| existing.contains_key(key)) {
        return url.to_string();
    }

    let mut merged: BTreeMap<String, String> = flattened.into_iter().collect();
    merged.extend(existing);

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(merged)
        .finish();
    parts.join(&query)
}

/// Parse the query of `url` into a map; the last occurrence of a key wins.
pub fn params_as_map(url: &str) -> BTreeMap<String, String> {
    match UrlParts::split(url).query {
        Some(query) => query_as_map(query),
        None => BTreeMap::new(),
    }
}

/// Append the query params of `from_url` to `to_url` without overwriting.
pub fn merge_url_params(from_url: &str, to_url: &str) -> String {
    let params: Params = params_as_map(from_url)
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    append_params(to_url, &params)
}

/// Prepend `/` unless already present. Empty input passes through.
pub fn force_slash_prefix(s: &str) -> String {
    if s.is_empty() || s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{}", s)
    }
}

/// Flatten nested params into form pairs.
///
/// Objects become `key[sub]`, arrays `key[0]`, booleans `1`/`0`; nulls are
/// omitted.
pub fn flatten_params(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_value(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_value(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(format!("{}[{}]", key, index), item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten_value(format!("{}[{}]", key, sub), item, pairs);
            }
        }
    }
}

/// Form-encode params, joined with `&`.
pub fn build_query(params: &Params) -> String {
    build_query_with_separator(params, "&")
}

/// Form-encode params, joined with `separator`. Spaces become `+`.
pub fn build_query_with_separator(params: &Params, separator: &str) -> String {
    flatten_params(params)
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn encode_component(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn query_as_map(query: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_remove_params() {
        assert_eq!(
            remove_params("https://x.test/cb?code=1&state=2&keep=3", &["code", "state"]),
            "https://x.test/cb?keep=3"
        );
        assert_eq!(
            remove_params("https://x.test:8443/cb?code=1#frag", &["code"]),
            "https://x.test:8443/cb#frag"
        );
        assert_eq!(remove_params("/me?access_token=t", &["access_token"]), "/me");
        assert_eq!(remove_params("/me", &["access_token"]), "/me");
    }

    #[test]
    fn test_append_params_without_query() {
        let url = append_params("http://x/y", &params(json!({"a": "1", "b": "2"})));
        assert_eq!(url, "http://x/y?a=1&b=2");
    }

    #[test]
    fn test_append_params_existing_wins_and_sorts() {
        let url = append_params("http://x/y?z=9&a=old", &params(json!({"a": "new", "m": "5"})));
        assert_eq!(url, "http://x/y?a=old&m=5&z=9");
    }

    #[test]
    fn test_append_params_empty_is_noop() {
        assert_eq!(append_params("http://x/y?b=1&a=2", &Params::new()), "http://x/y?b=1&a=2");
    }

    #[test]
    fn test_append_params_subset_is_unchanged() {
        let url = "http://x/y?b=1&a=2";
        assert_eq!(append_params(url, &params(json!({"a": "other"}))), url);
    }

    #[test]
    fn test_append_params_is_deterministic() {
        let new = params(json!({"c": "3", "a": "1"}));
        let first = append_params("http://x/y?b=2", &new);
        let second = append_params("http://x/y?b=2", &new);
        assert_eq!(first, second);
        assert_eq!(first, "http://x/y?a=1&b=2&c=3");
        assert_eq!(append_params(&first, &new), first);
    }

    #[test]
    fn test_params_as_map_round_trip() {
        let url = append_params("http://x/y", &params(json!({"a": "1", "b": "2"})));
        let map = params_as_map(&url);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "2");
    }

    #[test]
    fn test_params_as_map_last_wins() {
        let map = params_as_map("/x?a=1&a=2");
        assert_eq!(map["a"], "2");
        assert!(params_as_map("/x").is_empty());
    }

    #[test]
    fn test_merge_url_params() {
        let merged = merge_url_params("http://from/?a=1&b=2", "http://to/path?b=keep");
        assert_eq!(merged, "http://to/path?a=1&b=keep");
        assert_eq!(merge_url_params("http://from/", "http://to/"), "http://to/");
    }

    #[test]
    fn test_force_slash_prefix() {
        assert_eq!(force_slash_prefix("me"), "/me");
        assert_eq!(force_slash_prefix("/me"), "/me");
        assert_eq!(force_slash_prefix(""), "");
    }

    #[test]
    fn test_flatten_nested_params() {
        let flat = flatten_params(&params(json!({
            "message": "hi there",
            "flag": true,
            "off": false,
            "skip": null,
            "count": 3,
            "tags": ["a", "b"],
            "target": {"id": 7, "kind": "page"}
        })));
        assert_eq!(
            flat,
            vec![
                ("message".to_string(), "hi there".to_string()),
                ("flag".to_string(), "1".to_string()),
                ("off".to_string(), "0".to_string()),
                ("count".to_string(), "3".to_string()),
                ("tags[0]".to_string(), "a".to_string()),
                ("tags[1]".to_string(), "b".to_string()),
                ("target[id]".to_string(), "7".to_string()),
                ("target[kind]".to_string(), "page".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_query_encoding() {
        let query = build_query(&params(json!({
            "redirect_uri": "https://app/cb",
            "scope": "read write"
        })));
        assert_eq!(query, "redirect_uri=https%3A%2F%2Fapp%2Fcb&scope=read+write");

        let query = build_query_with_separator(&params(json!({"a": "1", "b": "2"})), "&amp;");
        assert_eq!(query, "a=1&amp;b=2");
    }
}
