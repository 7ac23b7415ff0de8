//! `otpauth://` key URIs.
//!
//! Format: `otpauth://totp/LABEL?secret=BASE32&issuer=ISSUER`. Only `secret`
//! is required; algorithm, digits and period are fixed and any such
//! parameters are ignored.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

const SCHEME: &str = "otpauth";
const TOTP_TYPE: &str = "totp";

/// One stored credential. `secret` stays base32-encoded as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpConfig {
    pub secret: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub label: String,
}

/// Parse an `otpauth://totp/...` URI. The secret is not decoded here.
pub fn parse(uri: &str) -> Result<OtpConfig> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(Error::EmptyInput);
    }

    let url = Url::parse(uri).map_err(|e| Error::UriFormat(e.to_string()))?;

    if url.scheme() != SCHEME {
        return Err(Error::UriFormat(format!(
            "expected scheme '{}', got '{}'",
            SCHEME,
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(TOTP_TYPE) => {}
        other => {
            return Err(Error::UriFormat(format!("unsupported OTP type: {:?}", other)));
        }
    }

    let query_param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let secret = query_param("secret")
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingSecret)?;
    let issuer = query_param("issuer").unwrap_or_default();

    let path = url.path();
    let label = percent_decode_str(path.strip_prefix('/').unwrap_or(path))
        .decode_utf8()
        .map_err(|e| Error::UriFormat(format!("label is not valid UTF-8: {}", e)))?
        .into_owned();

    Ok(OtpConfig {
        secret,
        issuer,
        label,
    })
}

impl OtpConfig {
    /// Render back into an `otpauth://totp/` URI.
    pub fn to_uri(&self) -> String {
        let mut uri = format!(
            "{}://{}/{}?secret={}",
            SCHEME,
            TOTP_TYPE,
            utf8_percent_encode(&self.label, NON_ALPHANUMERIC),
            self.secret
        );
        if !self.issuer.is_empty() {
            uri.push_str("&issuer=");
            uri.push_str(&utf8_percent_encode(&self.issuer, NON_ALPHANUMERIC).to_string());
        }
        uri
    }
}
