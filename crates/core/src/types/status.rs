//! Status enums and the order status state machine.
//!
//! Orders move forward through `pending -> confirmed -> paid -> completed`,
//! with `cancelled` reachable from any non-terminal state. `completed` and
//! `cancelled` are terminal. `paid` is only ever entered by recording a
//! payment, never by an admin status update.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cakeshop.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Completed,
    Cancelled,
}

/// Why a status change was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The order is completed or cancelled.
    #[error("order is {from} and can no longer change status")]
    Terminal { from: OrderStatus },
    /// The target precedes the current status.
    #[error("cannot move order from {from} back to {to}")]
    Backward { from: OrderStatus, to: OrderStatus },
    /// `paid` can only be reached by recording a payment.
    #[error("orders become paid only when a payment is recorded")]
    PaymentRequired,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Paid,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position on the forward path. `cancelled` sits off the path.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Paid => Some(2),
            Self::Completed => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Whether no further transition is defined.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a payment may be recorded against an order in this status.
    #[must_use]
    pub const fn accepts_payment(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Validate an admin-requested change from `self` to `next`.
    ///
    /// Re-applying the current status is accepted as a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] describing why the change is refused.
    pub fn check_transition(self, next: Self) -> Result<(), TransitionError> {
        if self == next {
            return Ok(());
        }
        if self.is_terminal() {
            return Err(TransitionError::Terminal { from: self });
        }
        if next == Self::Paid {
            return Err(TransitionError::PaymentRequired);
        }
        if next == Self::Cancelled {
            return Ok(());
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) if to > from => Ok(()),
            _ => Err(TransitionError::Backward {
                from: self,
                to: next,
            }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| {
                format!(
                    "invalid status value: {s}. Must be one of: pending, confirmed, paid, completed, cancelled"
                )
            })
    }
}

/// How an order is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cakeshop.payment_method", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Card => write!(f, "card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            _ => Err(format!("invalid payment method: {s}. Must be cash or card")),
        }
    }
}

/// Contact message read state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cakeshop.contact_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
}
