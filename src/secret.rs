//! Shared-secret handling: RFC 4648 base32 decoding and random secret generation.

use base32::{encode, Alphabet};
use rand::Rng;

use crate::error::{Base32Error, Result};

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Decode a base32 string into raw bytes.
///
/// Case-insensitive, trailing `=` padding is ignored. Bits that do not fill a
/// complete byte at the end are dropped, so `"A"` decodes to an empty vector
/// rather than failing.
pub fn decode(input: &str) -> std::result::Result<Vec<u8>, Base32Error> {
    let trimmed = input.trim_end_matches('=');

    let mut bytes = Vec::with_capacity(trimmed.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for (position, character) in trimmed.chars().enumerate() {
        let upper = character.to_ascii_uppercase();
        let value = ALPHABET
            .iter()
            .position(|&c| c as char == upper)
            .ok_or(Base32Error::InvalidCharacter { character, position })?;

        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            bytes.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(bytes)
}

/// Key material for code generation. Only obtainable by decoding base32.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Decode `encoded`, rejecting secrets that yield no key bytes.
    pub fn from_base32(encoded: &str) -> Result<Self> {
        let bytes = decode(encoded)?;
        if bytes.is_empty() {
            return Err(Base32Error::Empty.into());
        }
        Ok(Secret(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Never print key material.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({} bytes)", self.0.len())
    }
}

pub fn generate_secret(length: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..length).map(|_| rng.gen::<u8>()).collect()
}

pub fn secret_to_base32(secret: &[u8]) -> String {
    encode(Alphabet::RFC4648 { padding: false }, secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn decodes_rfc4648_vectors() {
        assert_eq!(decode("MZXW6YTBOI======").unwrap(), b"foobar");
        assert_eq!(decode("MZXW6YQ=").unwrap(), b"foob");
        assert_eq!(decode("MY").unwrap(), b"f");
    }

    #[test]
    fn decoding_is_case_insensitive() {
        assert_eq!(decode("jbswy3dpehpk3pxp").unwrap(), decode("JBSWY3DPEHPK3PXP").unwrap());
        assert_eq!(decode("JBSWY3DPEHPK3PXP").unwrap(), b"Hello!\xde\xad\xbe\xef");
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("====").unwrap().is_empty());
    }

    #[test]
    fn incomplete_tail_is_truncated() {
        // 5 bits cannot fill a byte
        assert!(decode("A").unwrap().is_empty());
        // 15 bits: one byte plus 7 dropped bits
        assert_eq!(decode("MZX").unwrap(), b"f");
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert_eq!(
            decode("1"),
            Err(Base32Error::InvalidCharacter { character: '1', position: 0 })
        );
        assert_eq!(
            decode("ABC8"),
            Err(Base32Error::InvalidCharacter { character: '8', position: 3 })
        );
        // padding is only stripped from the end
        assert!(decode("AB=CD").is_err());
    }

    #[test]
    fn round_trips_with_reference_encoder() {
        for len in [1usize, 5, 10, 16, 20, 32, 64] {
            let bytes = generate_secret(len);
            let padded = encode(Alphabet::RFC4648 { padding: true }, &bytes);
            assert_eq!(decode(&padded).unwrap(), bytes);
            assert_eq!(decode(&secret_to_base32(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn secret_rejects_empty_key() {
        assert_eq!(
            Secret::from_base32("A").unwrap_err(),
            Error::Base32Decode(Base32Error::Empty)
        );
        assert_eq!(Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap().len(), 10);
    }

    #[test]
    fn debug_hides_key_material() {
        let secret = Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(format!("{:?}", secret), "Secret(10 bytes)");
    }
}
