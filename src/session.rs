//! The single active credential: load, restore, delete and copy.

use tracing::{info, warn};

use crate::clipboard::Clipboard;
use crate::error::{Error, Result};
use crate::scheduler::RefreshScheduler;
use crate::secret::Secret;
use crate::store::KeyValueStore;
use crate::totp::Code;
use crate::uri::{self, OtpConfig};

/// Key the credential is stored under.
pub const STORAGE_KEY: &str = "totpData";

pub struct Session<S> {
    store: S,
    scheduler: RefreshScheduler,
    active: Option<OtpConfig>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(store: S, scheduler: RefreshScheduler) -> Self {
        Session {
            store,
            scheduler,
            active: None,
        }
    }

    /// Read the persisted credential without starting anything.
    pub fn stored(&self) -> Result<Option<OtpConfig>> {
        match self.store.get(STORAGE_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::Storage(format!("corrupt record under {}: {}", STORAGE_KEY, e))),
            None => Ok(None),
        }
    }

    /// Resume refreshing the persisted credential, if there is one.
    pub fn restore(&mut self) -> Result<Option<OtpConfig>> {
        let Some(config) = self.stored()? else {
            return Ok(None);
        };
        self.activate(config.clone());
        Ok(Some(config))
    }

    /// Accept a key URI: parse, check the secret decodes, persist, start.
    pub fn load(&mut self, input: &str) -> Result<OtpConfig> {
        let config = uri::parse(input)?;
        Secret::from_base32(&config.secret)?;

        let value = serde_json::to_value(&config)?;
        self.store.set(STORAGE_KEY, value)?;

        self.activate(config.clone());
        Ok(config)
    }

    /// Stop refreshing and forget the persisted credential.
    pub fn delete(&mut self) -> Result<()> {
        self.scheduler.stop();
        self.active = None;
        self.store.remove(STORAGE_KEY)?;
        info!("credential deleted");
        Ok(())
    }

    /// Copy the displayed code. Returns `None` while no valid code is shown.
    pub fn copy_code(&self, clipboard: &mut dyn Clipboard) -> Result<Option<Code>> {
        let Some(code) = self.scheduler.current_code().code().cloned() else {
            return Ok(None);
        };
        if let Err(e) = clipboard.copy_text(code.as_str()) {
            warn!("failed to copy: {}", e);
            return Err(e);
        }
        Ok(Some(code))
    }

    pub fn active(&self) -> Option<&OtpConfig> {
        self.active.as_ref()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    fn activate(&mut self, config: OtpConfig) {
        self.scheduler.start(&config);
        self.active = Some(config);
    }
}
