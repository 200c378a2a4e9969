// src/common/id_generator.rs
//! Crockford Base32 ID generator.
//!
//! Generates human-readable, prefixed IDs (e.g. `R_K7NP3X` for resumes).
//! The alphabet excludes I, L, O, U, so ids survive being read aloud or
//! typed from a screenshot.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Resume (R_)
    Resume,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Resume => "R",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID in the format `PREFIX_XXXXXX`.
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Resume ID (R_XXXXXX)
pub fn generate_resume_id() -> String {
    generate_id(EntityPrefix::Resume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let user_id = generate_user_id();
        assert!(user_id.starts_with("U_"));
        assert_eq!(user_id.len(), 8); // "U_" + 6 chars

        let resume_id = generate_resume_id();
        assert!(resume_id.starts_with("R_"));
        assert_eq!(resume_id.len(), 8);
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_resume_id();
        let random_part = &id[2..];

        for c in random_part.chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
        }

        assert!(!random_part.contains('I'));
        assert!(!random_part.contains('L'));
        assert!(!random_part.contains('O'));
        assert!(!random_part.contains('U'));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = generate_resume_id();
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }
}
