//! Request-scoped upstream credential
//!
//! A caller's token lives only inside the request that carried it. The legacy
//! on-disk token artifact is never written; the supervisor only removes a stale
//! one left behind by older deployments.

use anyhow::{Context, Result};
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Token is missing")]
    Missing,
    #[error("Token contains characters that cannot be sent upstream")]
    InvalidCharacters,
}

/// Bearer token for exactly one inbound request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Build a credential from the raw form/header value.
    ///
    /// Line terminators are removed wherever they appear (clients paste tokens
    /// with trailing newlines), then surrounding whitespace is trimmed.
    pub fn from_raw(raw: Option<&str>) -> Result<Self, CredentialError> {
        let raw = raw.ok_or(CredentialError::Missing)?;
        let stripped: String = raw.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        let token = stripped.trim();

        if token.is_empty() {
            return Err(CredentialError::Missing);
        }

        // Same byte range an HTTP header value accepts.
        if !token
            .bytes()
            .all(|b| b == b'\t' || (0x20..0x7f).contains(&b))
        {
            return Err(CredentialError::InvalidCharacters);
        }

        Ok(Self {
            token: token.to_string(),
        })
    }

    #[inline]
    pub fn expose(&self) -> &str {
        &self.token
    }

    /// Log-safe rendering: length plus the last four characters of long tokens.
    pub fn redacted(&self) -> String {
        let len = self.token.len();
        if len <= 8 {
            format!("<{} chars>", len)
        } else {
            format!("<{} chars, ...{}>", len, &self.token[len - 4..])
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.redacted())
            .finish()
    }
}

/// Remove a credential file left by a previous process. Returns whether a file
/// was actually removed.
pub fn remove_stale_artifact(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("🧹 Removed stale credential artifact {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No stale credential artifact at {}", path.display());
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to remove stale credential artifact {}",
                path.display()
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_terminators_anywhere() {
        let cred = Credential::from_raw(Some("abc\ndef\r\n")).unwrap();
        assert_eq!(cred.expose(), "abcdef");
    }

    #[test]
    fn rejects_missing_and_blank_tokens() {
        assert_eq!(Credential::from_raw(None), Err(CredentialError::Missing));
        assert_eq!(Credential::from_raw(Some("")), Err(CredentialError::Missing));
        assert_eq!(
            Credential::from_raw(Some("\r\n\n")),
            Err(CredentialError::Missing)
        );
    }

    #[test]
    fn rejects_non_header_characters() {
        assert_eq!(
            Credential::from_raw(Some("tok\u{7f}en")),
            Err(CredentialError::InvalidCharacters)
        );
        assert_eq!(
            Credential::from_raw(Some("tökén")),
            Err(CredentialError::InvalidCharacters)
        );
    }

    #[test]
    fn debug_output_never_contains_token() {
        let cred = Credential::from_raw(Some("super-secret-token-1234")).unwrap();
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("...1234"));
        assert_eq!(
            Credential::from_raw(Some("short")).unwrap().redacted(),
            "<5 chars>"
        );
    }

    #[test]
    fn removes_stale_artifact_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "old-token").unwrap();

        assert!(remove_stale_artifact(&path).unwrap());
        assert!(!path.exists());
        assert!(!remove_stale_artifact(&path).unwrap());
    }
}
