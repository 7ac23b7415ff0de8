//! Time-based one-time passcodes (RFC 6238, SHA-1, 6 digits, 30 seconds)
//! from an `otpauth://totp/` key URI, refreshed once per second with a
//! countdown to the next period.

pub mod clipboard;
pub mod clock;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod secret;
pub mod session;
pub mod store;
pub mod totp;
pub mod uri;

pub use clipboard::{Clipboard, Osc52Clipboard};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{Base32Error, Error, Result};
pub use scheduler::{CodeState, Countdown, DisplayState, RefreshScheduler};
pub use secret::Secret;
pub use session::Session;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use totp::{Code, HmacSha1Signer, Signer, TotpEngine};
pub use uri::OtpConfig;
