//! RFC 6238 code generation (SHA-1, 6 digits, 30-second period).

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};
use crate::secret::Secret;

pub const PERIOD_SECS: u64 = 30;
pub const DIGITS: usize = 6;

const PERIOD_MILLIS: u64 = PERIOD_SECS * 1000;
const MODULUS: u32 = 1_000_000;

/// HMAC-SHA1 output
pub type Digest = [u8; 20];

/// Number of elapsed periods since the Unix epoch; the HOTP counter.
pub type TimeStep = u64;

pub fn time_step(unix_millis: u64) -> TimeStep {
    unix_millis / PERIOD_MILLIS
}

/// Milliseconds since the epoch, clamped to zero for earlier instants.
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Keyed signing capability used for the HOTP message.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, key: &[u8], message: &[u8]) -> Result<Digest>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HmacSha1Signer;

#[async_trait]
impl Signer for HmacSha1Signer {
    async fn sign(&self, key: &[u8], message: &[u8]) -> Result<Digest> {
        let mut mac = Hmac::<Sha1>::new_from_slice(key)
            .map_err(|e| Error::SigningFailure(format!("Invalid key: {}", e)))?;
        mac.update(message);

        let mut digest = [0u8; 20];
        digest.copy_from_slice(&mac.finalize().into_bytes());
        Ok(digest)
    }
}

/// A six-digit one-time code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code(String);

impl Code {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// RFC 4226 §5.3 dynamic truncation, reduced to six digits.
pub fn truncate(hash: &Digest) -> Code {
    let offset = (hash[19] & 0x0f) as usize;
    let binary = ((hash[offset] & 0x7f) as u32) << 24
        | (hash[offset + 1] as u32) << 16
        | (hash[offset + 2] as u32) << 8
        | (hash[offset + 3] as u32);

    Code(format!("{:0width$}", binary % MODULUS, width = DIGITS))
}

/// Derives codes from a secret and the current time through a [`Signer`].
#[derive(Clone)]
pub struct TotpEngine {
    signer: Arc<dyn Signer>,
}

impl Default for TotpEngine {
    fn default() -> Self {
        Self::new(HmacSha1Signer)
    }
}

impl TotpEngine {
    pub fn new(signer: impl Signer + 'static) -> Self {
        TotpEngine {
            signer: Arc::new(signer),
        }
    }

    pub async fn compute(&self, secret: &Secret, time: SystemTime) -> Result<Code> {
        self.compute_at(secret, unix_millis(time)).await
    }

    pub async fn compute_at(&self, secret: &Secret, unix_millis: u64) -> Result<Code> {
        self.generate_hotp(secret, time_step(unix_millis)).await
    }

    async fn generate_hotp(&self, secret: &Secret, counter: TimeStep) -> Result<Code> {
        let counter_bytes = counter.to_be_bytes();
        let hash = self.signer.sign(secret.as_bytes(), &counter_bytes).await?;
        Ok(truncate(&hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::secret_to_base32;

    /// Returns a fixed digest regardless of input.
    struct FixedSigner(Digest);

    #[async_trait]
    impl Signer for FixedSigner {
        async fn sign(&self, _key: &[u8], _message: &[u8]) -> Result<Digest> {
            Ok(self.0)
        }
    }

    struct FailingSigner;

    #[async_trait]
    impl Signer for FailingSigner {
        async fn sign(&self, _key: &[u8], _message: &[u8]) -> Result<Digest> {
            Err(Error::SigningFailure("unavailable".into()))
        }
    }

    fn rfc_secret() -> Secret {
        Secret::from_base32(&secret_to_base32(b"12345678901234567890")).unwrap()
    }

    #[test]
    fn truncates_rfc4226_example() {
        let hash: Digest = hex::decode("1f8698690e02ca16618550ef7f19da8e945b555a")
            .unwrap()
            .try_into()
            .unwrap();
        // 0x50ef7f19 = 1357872921
        assert_eq!(truncate(&hash).as_str(), "872921");
    }

    #[test]
    fn truncation_zero_pads() {
        let mut hash = [0u8; 20];
        hash[3] = 7;
        assert_eq!(truncate(&hash).as_str(), "000007");
    }

    #[test]
    fn time_step_boundaries() {
        assert_eq!(time_step(0), 0);
        assert_eq!(time_step(29_999), 0);
        assert_eq!(time_step(30_000), 1);
        assert_eq!(time_step(59_000_000_000), 1_966_666);
    }

    #[tokio::test]
    async fn matches_rfc6238_sha1_vectors() {
        let engine = TotpEngine::default();
        let secret = rfc_secret();
        // RFC 6238 Appendix B, last six digits of the 8-digit values
        let vectors = [
            (59u64, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ];
        for (secs, expected) in vectors {
            let code = engine.compute_at(&secret, secs * 1000).await.unwrap();
            assert_eq!(code.as_str(), expected, "at {}", secs);
        }
    }

    #[tokio::test]
    async fn matches_rfc4226_hotp_vectors() {
        let engine = TotpEngine::default();
        let secret = rfc_secret();
        let expected = ["755224", "287082", "359152", "969429", "338314"];
        for (counter, want) in expected.iter().enumerate() {
            let code = engine.generate_hotp(&secret, counter as u64).await.unwrap();
            assert_eq!(code.as_str(), *want);
        }
    }

    #[tokio::test]
    async fn same_window_same_code() {
        let engine = TotpEngine::default();
        let secret = Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap();
        let start = 1_700_000_010_000u64; // 1700000010 is a multiple of 30
        let a = engine.compute_at(&secret, start).await.unwrap();
        let b = engine.compute_at(&secret, start + 29_999).await.unwrap();
        let again = engine.compute_at(&secret, start).await.unwrap();
        let next = engine.compute_at(&secret, start + 30_000).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, again);
        assert_ne!(a, next);
    }

    #[tokio::test]
    async fn always_six_digits() {
        let engine = TotpEngine::default();
        let secret = Secret::from_base32("GEZDGNBVGY3TQOJQ").unwrap();
        for step in 0..200u64 {
            let code = engine.compute_at(&secret, step * 30_000).await.unwrap();
            assert_eq!(code.as_str().len(), DIGITS);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn uses_injected_signer() {
        let mut digest = [0u8; 20];
        digest[..4].copy_from_slice(&[0x80, 0x00, 0x04, 0xd2]);
        let engine = TotpEngine::new(FixedSigner(digest));
        let secret = rfc_secret();
        // top bit masked, 0x4d2 = 1234
        let code = engine.compute(&secret, SystemTime::now()).await.unwrap();
        assert_eq!(code.as_str(), "001234");
    }

    #[tokio::test]
    async fn propagates_signing_failure() {
        let engine = TotpEngine::new(FailingSigner);
        let err = engine.compute_at(&rfc_secret(), 0).await.unwrap_err();
        assert!(matches!(err, Error::SigningFailure(_)));
    }

    #[test]
    fn pre_epoch_clamps_to_zero() {
        let before = UNIX_EPOCH - std::time::Duration::from_secs(10);
        assert_eq!(unix_millis(before), 0);
    }
}
