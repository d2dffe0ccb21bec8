//! Payment card masking.
//!
//! A full card number only ever exists inside [`MaskedCard::from_number`];
//! the function keeps the last four digits and drops the rest before
//! returning. Nothing downstream can log or persist the full number because
//! no type carries it.

use core::fmt;

use serde::{Deserialize, Serialize};

const MIN_CARD_DIGITS: usize = 12;
const MAX_CARD_DIGITS: usize = 19;

/// Errors raised while validating card data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    /// No card number supplied.
    #[error("card number is required")]
    MissingNumber,
    /// Card number contains something other than digits, spaces and dashes.
    #[error("card number must contain only digits")]
    NonDigit,
    /// Card number length outside 12-19 digits.
    #[error("card number must have between 12 and 19 digits")]
    BadLength,
    /// Expiry is not `MM/YY` with a month in 01-12.
    #[error("expiry must be in MM/YY format")]
    BadExpiry,
}

/// The retained fragment of a card: its last four digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskedCard(String);

impl MaskedCard {
    /// Validate a card number and keep only its last four digits.
    ///
    /// Spaces and dashes are ignored.
    ///
    /// ```
    /// use cakeshop_core::MaskedCard;
    ///
    /// let card = MaskedCard::from_number("4111 1111 1111 1234").unwrap();
    /// assert_eq!(card.suffix(), "1234");
    /// assert_eq!(card.to_string(), "****-****-****-1234");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`CardError`] if the number is empty, contains non-digit
    /// characters, or has the wrong length.
    pub fn from_number(number: &str) -> Result<Self, CardError> {
        let mut digits = Vec::with_capacity(MAX_CARD_DIGITS);
        for c in number.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                _ => return Err(CardError::NonDigit),
            }
        }

        if digits.is_empty() {
            return Err(CardError::MissingNumber);
        }
        if !(MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&digits.len()) {
            return Err(CardError::BadLength);
        }

        let suffix: String = digits.split_off(digits.len() - 4).into_iter().collect();
        Ok(Self(suffix))
    }

    /// Rebuild from a stored suffix.
    ///
    /// Returns `None` unless `suffix` is exactly four ASCII digits.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        (suffix.len() == 4 && suffix.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(suffix.to_owned()))
    }

    /// The last four digits.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaskedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "****-****-****-{}", self.0)
    }
}

/// A card expiry in `MM/YY` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardExpiry {
    month: u8,
    year: u8,
}

impl CardExpiry {
    /// Parse `MM/YY`.
    ///
    /// # Errors
    ///
    /// Returns `CardError::BadExpiry` for anything else.
    pub fn parse(s: &str) -> Result<Self, CardError> {
        let (month, year) = s.trim().split_once('/').ok_or(CardError::BadExpiry)?;
        if month.len() != 2 || year.len() != 2 {
            return Err(CardError::BadExpiry);
        }
        let month: u8 = month.parse().map_err(|_| CardError::BadExpiry)?;
        let year: u8 = year.parse().map_err(|_| CardError::BadExpiry)?;
        if !(1..=12).contains(&month) {
            return Err(CardError::BadExpiry);
        }
        Ok(Self { month, year })
    }

    /// Month, 1-12.
    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    /// Two-digit year.
    #[must_use]
    pub const fn year(self) -> u8 {
        self.year
    }
}

impl fmt::Display for CardExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_last_four() {
        let card = MaskedCard::from_number("4111-1111-1111-9876").unwrap();
        assert_eq!(card.suffix(), "9876");
        assert!(!card.to_string().contains("4111"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert_eq!(MaskedCard::from_number(""), Err(CardError::MissingNumber));
        assert_eq!(MaskedCard::from_number("  "), Err(CardError::MissingNumber));
        assert_eq!(MaskedCard::from_number("4111x"), Err(CardError::NonDigit));
        assert_eq!(MaskedCard::from_number("12345"), Err(CardError::BadLength));
        assert_eq!(
            MaskedCard::from_number(&"1".repeat(20)),
            Err(CardError::BadLength)
        );
    }

    #[test]
    fn test_from_suffix() {
        assert!(MaskedCard::from_suffix("1234").is_some());
        assert!(MaskedCard::from_suffix("123").is_none());
        assert!(MaskedCard::from_suffix("12a4").is_none());
    }

    #[test]
    fn test_expiry_parse() {
        let expiry = CardExpiry::parse("09/27").unwrap();
        assert_eq!(expiry.month(), 9);
        assert_eq!(expiry.year(), 27);
        assert_eq!(expiry.to_string(), "09/27");
    }

    #[test]
    fn test_expiry_rejects_invalid() {
        for bad in ["13/27", "00/27", "9/27", "0927", "09/2027", "ab/cd", ""] {
            assert_eq!(CardExpiry::parse(bad), Err(CardError::BadExpiry), "{bad}");
        }
    }
}
