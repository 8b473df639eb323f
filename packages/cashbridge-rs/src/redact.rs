//! Secret redaction for key material in logs and serialized output.
//!
//! [`Redacted`] wraps a value so that `Debug`, `Display` and `Serialize` all
//! print `"<redacted>"`. The authorizer private key is held this way from the
//! moment it is read from the environment.

use std::fmt::{self, Debug, Display};

/// Wrapper that redacts its inner value when formatted or serialized.
///
/// # Example
///
/// ```ignore
/// use cashbridge_rs::redact::Redacted;
///
/// let key = Redacted("ac0974bec39a17e3...".to_string());
/// tracing::info!(key = %key, "Loaded authorizer");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Borrow the secret. Call sites are the only places it may escape.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_never_prints_secret() {
        let secret = Redacted("deadbeef".to_string());
        assert_eq!(format!("{:?}", secret), "<redacted>");
        assert_eq!(format!("{}", secret), "<redacted>");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"<redacted>\"");
        assert_eq!(secret.expose(), "deadbeef");
    }
}
