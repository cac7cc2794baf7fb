//! Alias expansion (spec.md §4.H stage 1): `.name` tokens are looked up and
//! substituted, recursively, so aliases may chain into other aliases.
//! Recursion is bounded (spec.md §9's open question: the original's cycle
//! behavior is unspecified, so a bounded depth with a user-visible error is
//! the safe interpretation adopted here).

use std::collections::HashMap;

use crate::error::Error;

/// Chained alias expansions beyond this depth are treated as a cycle.
pub const MAX_ALIAS_EXPANSION_DEPTH: usize = 16;

fn is_alias_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('.') && token[1..].chars().all(|c| c.is_alphanumeric())
}

pub fn expand_aliases(input: &str, aliases: &HashMap<String, String>) -> Result<String, Error> {
    expand_depth(input, aliases, 0)
}

fn expand_depth(input: &str, aliases: &HashMap<String, String>, depth: usize) -> Result<String, Error> {
    if depth > MAX_ALIAS_EXPANSION_DEPTH {
        return Err(Error::UserError(
            "alias expansion exceeded the depth limit (possible cycle)".to_string(),
        ));
    }

    let mut changed = false;
    let mut out_tokens = Vec::new();
    for token in input.split_whitespace() {
        if is_alias_token(token) {
            let replacement = aliases
                .get(token)
                .ok_or_else(|| Error::UserError(format!("unknown alias {}", token)))?;
            changed = true;
            out_tokens.push(replacement.clone());
        } else {
            out_tokens.push(token.to_string());
        }
    }

    let joined = out_tokens.join(" ");
    if changed {
        expand_depth(&joined, aliases, depth + 1)
    } else {
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_a_single_alias() {
        let mut aliases = HashMap::new();
        aliases.insert(".xyz".to_string(), "alt $aircraft 350".to_string());
        let result = expand_aliases(".xyz", &aliases).unwrap();
        assert_eq!(result, "alt $aircraft 350");
    }

    #[test]
    fn expands_chained_aliases() {
        let mut aliases = HashMap::new();
        aliases.insert(".a".to_string(), ".b extra".to_string());
        aliases.insert(".b".to_string(), "base".to_string());
        let result = expand_aliases(".a", &aliases).unwrap();
        assert_eq!(result, "base extra");
    }

    #[test]
    fn unknown_alias_is_a_user_error() {
        let aliases = HashMap::new();
        assert!(expand_aliases(".nope", &aliases).is_err());
    }

    #[test]
    fn cycle_is_bounded_and_reported() {
        let mut aliases = HashMap::new();
        aliases.insert(".a".to_string(), ".b".to_string());
        aliases.insert(".b".to_string(), ".a".to_string());
        assert!(expand_aliases(".a", &aliases).is_err());
    }

    #[test]
    fn no_aliases_normalizes_whitespace_only() {
        let aliases = HashMap::new();
        let result = expand_aliases("alt   AAL123  350", &aliases).unwrap();
        assert_eq!(result, "alt AAL123 350");
    }
}
