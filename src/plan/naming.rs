use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::plan::commit::Commit;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Number of hex characters of the message hash appended to every branch name.
pub const HASH_LENGTH: usize = 8;

/// Derive the branch name for a delta anchored at a commit with `message`.
///
/// The name depends only on the message, so a cherry-picked copy of a commit maps to the same
/// branch. The slug is the lowercased words of the message joined with `-`, followed by a short
/// hash of the message, and replaces the first `{}` in `template`. A message without words
/// yields the hash alone.
pub fn derive_branch_name(message: &str, template: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    let hash: String = digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(HASH_LENGTH)
        .collect();

    let lowered = message.to_lowercase();
    let words: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
    let slug = if words.is_empty() {
        hash
    } else {
        format!("{}-{}", words.join("-"), hash)
    };

    template.replacen("{}", &slug, 1)
}

pub fn derive_commit_branch_name(commit: &Commit, template: &str) -> String {
    derive_branch_name(&commit.message, template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_and_hash() {
        let name = derive_branch_name("Fix the Parser!", "{}");
        let (words, hash) = name.rsplit_once('-').unwrap();
        assert_eq!(words, "fix-the-parser");
        assert_eq!(hash.len(), HASH_LENGTH);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_template_placeholder() {
        let name = derive_branch_name("a", "feature/{}");
        assert!(name.starts_with("feature/a-"));
        // only the first placeholder is filled
        let name = derive_branch_name("a", "{}/{}");
        assert!(name.ends_with("/{}"));
    }

    #[test]
    fn test_deterministic_and_message_only() {
        let a = Commit::new("1111", "same message");
        let b = Commit::new("2222", "same message");
        assert_eq!(
            derive_commit_branch_name(&a, "{}"),
            derive_commit_branch_name(&b, "{}")
        );
        assert_ne!(
            derive_branch_name("same message", "{}"),
            derive_branch_name("same message.", "{}")
        );
    }

    #[test]
    fn test_no_words_yields_hash_only_slug() {
        let name = derive_branch_name("!!! ???", "{}");
        assert!(!name.starts_with('-'));
        assert_eq!(name.len(), HASH_LENGTH);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(derive_branch_name("!!! ???", "feature/{}"), format!("feature/{}", name));
    }

    #[test]
    fn test_unicode_words() {
        let name = derive_branch_name("Ändere Größe", "{}");
        assert!(name.starts_with("ändere-größe-"));
    }
}
