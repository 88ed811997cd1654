//! Content-hash identifier generation.
//!
//! `JobID` and `ProcessID` are sha256 digests over an explicit, ordered list
//! of fields, not a reflection-based hash over a struct's fields in whatever
//! order the compiler happens to lay them out. The field order below is part
//! of the identity contract: changing it changes every existing ID.

use sha2::{Digest, Sha256};

/// Hash an explicit, ordered list of fields into a lowercase hex digest.
///
/// Fields are joined with `:` before hashing so that `("ab", "c")` and
/// `("a", "bc")` never collide on their concatenation.
pub fn hash_fields(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(b":");
        }
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// A 64-character lowercase hex sha256 digest, used as the primary key for
/// content-addressed entities (`Job`, `JobExecution`).
pub fn validate_id(candidate: &str) -> bool {
    candidate.len() == 64 && candidate.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = hash_fields(&["user-1", "shell", "*/5 * * * *"]);
        let b = hash_fields(&["user-1", "shell", "*/5 * * * *"]);
        assert_eq!(a, b);
        assert!(validate_id(&a));
    }

    #[test]
    fn hash_differs_for_any_field_change() {
        let base = hash_fields(&["user-1", "shell", "*/5 * * * *"]);
        let changed = hash_fields(&["user-1", "shell", "*/10 * * * *"]);
        assert_ne!(base, changed);
    }

    #[test]
    fn hash_does_not_collide_on_naive_concatenation() {
        let a = hash_fields(&["ab", "c"]);
        let b = hash_fields(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn validate_id_rejects_wrong_length_or_case() {
        assert!(!validate_id("not-a-hash"));
        assert!(!validate_id(&"A".repeat(64)));
        assert!(validate_id(&"a".repeat(64)));
    }
}
