use std::collections::BTreeMap;

/// Static route policy: path prefix -> HTTP verb (upper case) -> role names.
///
/// Loaded once from the `auth` section of the configuration and never
/// mutated afterwards, so it is shared across requests without locking.
pub type RoutePolicy = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Roles the policy requires for `verb` on `path`.
///
/// Prefix keys are literal strings, not path segments: `/test1` matches
/// `/test1/test2` and `/test1extra` alike. Among matching prefixes the
/// longest wins; equal-length ties resolve to the lexicographically smallest
/// key (a consequence of scanning in key order and replacing only on a
/// strictly longer match). No matching prefix, or no entry for the verb
/// under the selected prefix, yields an empty slice.
pub fn resolve_roles<'a>(policy: &'a RoutePolicy, path: &str, verb: &str) -> &'a [String] {
    let mut selected: Option<(&str, &BTreeMap<String, Vec<String>>)> = None;

    for (prefix, verbs) in policy {
        if !path.starts_with(prefix.as_str()) {
            continue;
        }
        match selected {
            Some((current, _)) if prefix.len() <= current.len() => {}
            _ => selected = Some((prefix, verbs)),
        }
    }

    selected
        .and_then(|(_, verbs)| verbs.get(&verb.to_ascii_uppercase()))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
