//! Card on file.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cakeshop_core::{CardInfoId, MaskedCard, UserId};

/// The single card a user keeps on file. User name and email are copied
/// when the card is first saved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOnFile {
    pub id: CardInfoId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub masked_card_suffix: MaskedCard,
    pub card_expiry: String,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
