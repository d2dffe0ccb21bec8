//! Customer email addresses.
//!
//! An email is the login identifier. Parsing trims and lower-cases it, so
//! `Ann@X.com` and `ann@x.com` are the same account.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an email address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email must contain only one @ symbol")]
    MultipleAtSymbols,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

/// A normalised email address: `local@domain`, both halves non-empty, at most
/// 254 bytes.
///
/// ```
/// use cakeshop_core::Email;
///
/// assert_eq!(Email::parse(" Ann@X.com ").unwrap().as_str(), "ann@x.com");
/// assert!(Email::parse("ann.x.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Longest accepted address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Trim, validate and lower-case an address.
    ///
    /// # Errors
    ///
    /// Returns the first rule the trimmed input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(s.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Stored values were validated on insert
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_addresses_accepted() {
        for raw in [
            "ann@x.com",
            "pastry.chef@cakestore.com",
            "orders+birthday@cakestore.co.uk",
        ] {
            assert_eq!(Email::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_same_account_whatever_the_case() {
        let typed = Email::parse("  Admin@CakeStore.com\n").unwrap();
        let seeded: Email = "admin@cakestore.com".parse().unwrap();
        assert_eq!(typed, seeded);
        assert_eq!(typed.to_string(), "admin@cakestore.com");
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("", EmailError::Empty),
            ("   ", EmailError::Empty),
            ("ann.x.com", EmailError::MissingAtSymbol),
            ("ann@bakery@x.com", EmailError::MultipleAtSymbols),
            ("@x.com", EmailError::EmptyLocalPart),
            ("ann@", EmailError::EmptyDomain),
        ];
        for (raw, expected) in cases {
            assert_eq!(Email::parse(raw).unwrap_err(), expected, "{raw:?}");
        }
    }

    #[test]
    fn test_length_limit() {
        let domain = "@cakestore.com";
        let fits = format!("{}{domain}", "a".repeat(Email::MAX_LENGTH - domain.len()));
        assert!(Email::parse(&fits).is_ok());

        let over = format!("b{fits}");
        assert_eq!(
            Email::parse(&over).unwrap_err(),
            EmailError::TooLong { max: 254 }
        );
    }

    #[test]
    fn test_json_is_plain_string() {
        let email = Email::parse("ann@x.com").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"ann@x.com\"");
    }
}
