use std::collections::HashSet;

/// Required roles that the granted scopes also contain.
///
/// Order and multiplicity follow `required`; `granted` is only consulted for
/// membership. Empty input on either side yields an empty result.
pub fn intersect(required: &[String], granted: &HashSet<String>) -> Vec<String> {
    required
        .iter()
        .filter(|role| granted.contains(role.as_str()))
        .cloned()
        .collect()
}
