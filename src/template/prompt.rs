//! Prompt compiler: merges visitor answers into the user prompt template.

use std::collections::HashSet;

use super::types::FormAnswers;

/// Placeholder filled with the owner's display name before answers are merged.
pub const OWNER_NAME_PLACEHOLDER: &str = "{ownerName}";

/// Substitute `{key}` placeholders in `template` with the matching answers.
///
/// Only the first occurrence of each answered placeholder is replaced; later
/// repeats and placeholders without an answer stay verbatim. The template is
/// scanned once left to right, so placeholder-looking text inside an answer
/// is never expanded.
pub fn compile_prompt(template: &str, answers: &FormAnswers) -> String {
    let mut out = String::with_capacity(template.len());
    let mut used: HashSet<&str> = HashSet::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after[..close];
        // `{a{b}`: restart the scan at the inner brace.
        if let Some(inner) = key.rfind('{') {
            out.push_str(&rest[open..open + 1 + inner]);
            rest = &after[inner..];
            continue;
        }

        match answers.get_key_value(key) {
            Some((k, value)) if !used.contains(k.as_str()) => {
                used.insert(k.as_str());
                out.push_str(value);
            }
            _ => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Replace every `{ownerName}` in `template` with `owner_name`.
pub fn fill_owner_name(template: &str, owner_name: &str) -> String {
    template.replace(OWNER_NAME_PLACEHOLDER, owner_name)
}
