//! Identifier case conversion: JSON field names to column names, resource names to URL paths.

/// Suffixes dropped from a resource name before it becomes a path.
const RESOURCE_SUFFIXES: &[&str] = &["resource", "controller"];

/// Split an identifier into words at camel-case humps, `_`, `-` and whitespace.
/// Acronyms stay together: "HTTPServerResource" -> ["HTTP", "Server", "Resource"].
pub fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Convert a single identifier from camelCase (or PascalCase) to snake_case.
/// e.g. "phoneNumber" -> "phone_number", "Member" -> "member"
pub fn to_snake_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "list_member" -> "listMember"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' || c == '-' {
            capitalize_next = !out.is_empty();
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive the URL path of a resource from its declared name.
///
/// The name is lower-cased, a trailing "resource" or "controller" word is
/// dropped and the remaining words are joined with '-'. A name made only of
/// the suffix keeps it.
pub fn resource_path(name: &str) -> String {
    let mut words: Vec<String> = split_words(name).into_iter().map(|w| w.to_lowercase()).collect();
    if words.len() > 1 {
        if let Some(last) = words.last() {
            if RESOURCE_SUFFIXES.contains(&last.as_str()) {
                words.pop();
            }
        }
    } else if let Some(only) = words.first_mut() {
        // "MembersResource" written as one lower-case word still loses its suffix.
        for suffix in RESOURCE_SUFFIXES {
            if only.len() > suffix.len() && only.ends_with(suffix) {
                only.truncate(only.len() - suffix.len());
                break;
            }
        }
    }
    words.join("-")
}
