//! OAuth access token for the warehouse API.

use crate::error::{Result, TallyError};
use std::fmt;
use std::process::Command;

/// Environment variable holding a ready-made access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// A bearer token. The value is never printed.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Resolve a token from `GOOGLE_OAUTH_ACCESS_TOKEN`, falling back to
    /// `gcloud auth print-access-token`.
    pub fn discover() -> Result<Self> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                return Ok(Self(token));
            }
        }

        tracing::debug!("{} not set, asking gcloud for an access token", ACCESS_TOKEN_ENV);
        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .map_err(|e| {
                TallyError::config(format!(
                    "no warehouse credentials: set {ACCESS_TOKEN_ENV} or install gcloud ({e})"
                ))
            })?;

        if !output.status.success() {
            return Err(TallyError::config(format!(
                "gcloud auth print-access-token failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(TallyError::config("gcloud returned an empty access token"));
        }
        Ok(Self(token))
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
