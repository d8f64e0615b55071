use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An accounting unit. Owns wallets for its lifetime; a wallet never
/// moves between entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    pub base_currency: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn new(name: impl Into<String>, base_currency: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            base_currency: base_currency.into(),
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
