//! Random password generator.
//!
//! Draws uniformly from the 94 printable, non-space ASCII characters.

use rand::Rng;

use super::secure::SecretBuffer;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}\\|:;'\",.<>/?`~";

/// Default password length.
pub const DEFAULT_LENGTH: usize = 16;

/// The full alphabet passwords are drawn from.
pub fn alphabet() -> Vec<u8> {
    [LOWER, UPPER, DIGITS, SYMBOLS]
        .iter()
        .flat_map(|set| set.bytes())
        .collect()
}

/// Fill `buf` with random printable characters.
pub fn fill_printable(buf: &mut [u8]) {
    let alphabet = alphabet();
    let mut rng = rand::rng();
    for byte in buf.iter_mut() {
        *byte = alphabet[rng.random_range(0..alphabet.len())];
    }
}

/// Generate a new random password of `length` characters.
pub fn generate(length: usize) -> SecretBuffer {
    let mut password = SecretBuffer::zeroed(length);
    fill_printable(password.as_mut_bytes());
    password
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_is_all_printable_ascii() {
        let alphabet = alphabet();
        assert_eq!(alphabet.len(), 94);
        assert!(alphabet.iter().all(|b| (33..=126).contains(b)));
    }

    #[test]
    fn generate_respects_length() {
        assert_eq!(generate(0).len(), 0);
        assert_eq!(generate(DEFAULT_LENGTH).len(), DEFAULT_LENGTH);
        assert_eq!(generate(200).len(), 200);
    }

    #[test]
    fn generated_passwords_are_printable_and_differ() {
        let a = generate(32);
        let b = generate(32);
        assert!(a.as_bytes().iter().all(|b| (33..=126).contains(b)));
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
