//! Scoped, redacted credentials.
//!
//! Tokens are supplied once at the pipeline boundary. Their `Debug` and
//! `Display` output is always redacted; the raw value is only reachable via
//! [`Credential::expose`] at the point of the remote call.

use serde::Serialize;
use std::fmt;

const REDACTED: &str = "***";

/// The remote target a credential is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialScope {
    /// Creating hosted releases.
    HostedRelease,
    /// Uploading to the package index.
    PackageIndex,
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostedRelease => write!(f, "hosted_release"),
            Self::PackageIndex => write!(f, "package_index"),
        }
    }
}

/// An opaque secret token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    scope: CredentialScope,
    secret: String,
}

impl Credential {
    /// Wraps a token for the given scope.
    #[must_use]
    pub fn new(scope: CredentialScope, secret: impl Into<String>) -> Self {
        Self {
            scope,
            secret: secret.into(),
        }
    }

    /// The scope this credential was issued for.
    #[must_use]
    pub fn scope(&self) -> CredentialScope {
        self.scope
    }

    /// Returns the raw token. Only call this when building a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Returns true if the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("scope", &self.scope)
            .field("secret", &REDACTED)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{REDACTED}", self.scope)
    }
}

/// The two tokens a run needs, one per target.
#[derive(Debug, Clone)]
pub struct ReleaseCredentials {
    /// Token for the hosted-release API.
    pub hosted_release: Credential,
    /// Token for the package index.
    pub package_index: Credential,
}

impl ReleaseCredentials {
    /// Creates the credential pair from raw tokens.
    #[must_use]
    pub fn new(hosted_release: impl Into<String>, package_index: impl Into<String>) -> Self {
        Self {
            hosted_release: Credential::new(CredentialScope::HostedRelease, hosted_release),
            package_index: Credential::new(CredentialScope::PackageIndex, package_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let cred = Credential::new(CredentialScope::PackageIndex, "pypi-AgEIcHlwaS5vcmc");
        let debug = format!("{cred:?}");
        let display = cred.to_string();

        assert!(!debug.contains("pypi-AgEI"));
        assert!(!display.contains("pypi-AgEI"));
        assert_eq!(display, "package_index:***");
        assert_eq!(cred.expose(), "pypi-AgEIcHlwaS5vcmc");
    }

    #[test]
    fn test_release_credentials_scopes() {
        let creds = ReleaseCredentials::new("ghs_token", "pypi_token");
        assert_eq!(creds.hosted_release.scope(), CredentialScope::HostedRelease);
        assert_eq!(creds.package_index.scope(), CredentialScope::PackageIndex);
        assert!(!format!("{creds:?}").contains("ghs_token"));
    }
}
