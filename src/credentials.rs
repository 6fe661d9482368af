//! The credentials a user typed for one login attempt.

use std::fmt;

/// Identifier and secret captured once per user-initiated attempt.
///
/// Immutable after construction. `Debug` never prints the secret, and the
/// identifier should only reach logs through [`CredentialSubmission::masked_identifier`].
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSubmission {
    identifier: String,
    secret: String,
}

impl CredentialSubmission {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into().trim().to_string(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Identifier with everything but its first character hidden.
    ///
    /// Email addresses keep their domain: `dealer@example.com` → `d*****@example.com`.
    pub fn masked_identifier(&self) -> String {
        let (local, domain) = match self.identifier.split_once('@') {
            Some((local, domain)) => (local, Some(domain)),
            None => (self.identifier.as_str(), None),
        };
        let mut chars = local.chars();
        let masked_local = match chars.next() {
            Some(first) => format!("{}{}", first, "*".repeat(chars.count())),
            None => String::new(),
        };
        match domain {
            Some(domain) => format!("{}@{}", masked_local, domain),
            None => masked_local,
        }
    }
}

impl fmt::Debug for CredentialSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSubmission")
            .field("identifier", &self.masked_identifier())
            .field("secret", &"<redacted>")
            .finish()
    }
}
