//! Log line tokenization and stable template ids

use sha2::{Digest, Sha256};

/// Wildcard token standing in for variable content
pub const WILDCARD: &str = "<*>";

/// Placeholder token for lines that tokenize to nothing
pub const EMPTY_TOKEN: &str = "<empty>";

/// Split a log body into ordered tokens on whitespace and punctuation.
///
/// An empty result is replaced with a single placeholder so every line
/// lands in some template.
pub fn tokenize(body: &str) -> Vec<String> {
    let tokens: Vec<String> = body
        .split(|c: char| {
            c.is_whitespace()
                || matches!(c, '=' | ':' | ',' | ';' | '[' | ']' | '(' | ')' | '{' | '}' | '"' | '\'')
        })
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();

    if tokens.is_empty() {
        vec![EMPTY_TOKEN.to_string()]
    } else {
        tokens
    }
}

/// Stable content-derived template id: first 16 hex chars of the SHA-256
/// of the token sequence. Identical token sequences produce identical ids
/// across process restarts, which keeps replays deterministic.
pub fn template_id(tokens: &[String]) -> String {
    let mut hasher = Sha256::new();
    for token in tokens {
        hasher.update(token.as_bytes());
        // Separator byte so ["ab","c"] and ["a","bc"] hash differently
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
