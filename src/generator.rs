//! Random password generation.
//!
//! Lowercase letters are always in the alphabet; uppercase, digits and
//! symbols can be switched off.  Every enabled class is guaranteed to
//! appear at least once.

use rand::seq::{IndexedRandom, SliceRandom};
use zeroize::Zeroize;

use crate::errors::{LockboxError, Result};
use crate::vault::SecretText;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Shortest password we will generate.
pub const MIN_LENGTH: usize = 4;

/// Longest password we will generate.
pub const MAX_LENGTH: usize = 256;

/// Which characters a generated password may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub length: usize,
    pub uppercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: 20,
            uppercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl PasswordPolicy {
    /// Default character classes with a custom length.
    pub fn with_length(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    fn classes(&self) -> Vec<&'static [u8]> {
        let mut classes = vec![LOWERCASE];
        if self.uppercase {
            classes.push(UPPERCASE);
        }
        if self.digits {
            classes.push(DIGITS);
        }
        if self.symbols {
            classes.push(SYMBOLS);
        }
        classes
    }
}

/// Generate a password following `policy`.
pub fn generate(policy: &PasswordPolicy) -> Result<SecretText> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&policy.length) {
        return Err(LockboxError::GeneratorError(format!(
            "length must be between {MIN_LENGTH} and {MAX_LENGTH} (got {})",
            policy.length
        )));
    }

    let classes = policy.classes();
    let alphabet: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();
    let mut rng = rand::rng();

    let mut buf: Vec<u8> = Vec::with_capacity(policy.length);
    // One pick from every class first, then fill from the whole alphabet.
    for class in &classes {
        buf.extend(class.choose(&mut rng));
    }
    while buf.len() < policy.length {
        buf.extend(alphabet.choose(&mut rng));
    }
    buf.shuffle(&mut rng);

    let password: String = buf.iter().map(|&b| char::from(b)).collect();
    buf.zeroize();

    Ok(SecretText::new(password))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_any(s: &str, class: &[u8]) -> bool {
        s.bytes().any(|b| class.contains(&b))
    }

    #[test]
    fn default_policy_includes_every_class() {
        for _ in 0..50 {
            let pw = generate(&PasswordPolicy::default()).unwrap();
            let s = pw.expose();
            assert_eq!(s.len(), 20);
            assert!(has_any(s, LOWERCASE));
            assert!(has_any(s, UPPERCASE));
            assert!(has_any(s, DIGITS));
            assert!(has_any(s, SYMBOLS));
        }
    }

    #[test]
    fn disabled_classes_never_appear() {
        let policy = PasswordPolicy {
            length: 64,
            uppercase: false,
            digits: true,
            symbols: false,
        };
        let pw = generate(&policy).unwrap();
        assert!(!has_any(pw.expose(), UPPERCASE));
        assert!(!has_any(pw.expose(), SYMBOLS));
        assert!(has_any(pw.expose(), DIGITS));
    }

    #[test]
    fn minimum_length_fits_all_classes() {
        let pw = generate(&PasswordPolicy::with_length(MIN_LENGTH)).unwrap();
        assert_eq!(pw.len(), MIN_LENGTH);
    }

    #[test]
    fn out_of_range_length_fails() {
        assert!(generate(&PasswordPolicy::with_length(3)).is_err());
        assert!(generate(&PasswordPolicy::with_length(MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn passwords_differ() {
        let a = generate(&PasswordPolicy::default()).unwrap();
        let b = generate(&PasswordPolicy::default()).unwrap();
        assert_ne!(a, b);
    }
}
