//! `%name%` placeholder substitution.

use std::collections::BTreeMap;

/// Replace every `%name%` in `template` with the matching value.
///
/// Placeholders without a matching value are left untouched.
pub fn replace_tokens(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                if let Some(value) = values.get(name) {
                    out.push_str(value);
                    rest = &after[end + 1..];
                } else {
                    // Not a known token: keep the first '%' and rescan from the second.
                    out.push('%');
                    rest = after;
                }
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// [`replace_tokens`] over every element.
pub fn replace_tokens_in_all(templates: &[String], values: &BTreeMap<String, String>) -> Vec<String> {
    templates
        .iter()
        .map(|t| replace_tokens(t, values))
        .collect()
}
