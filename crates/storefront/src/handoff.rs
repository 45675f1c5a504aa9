//! Order confirmation handoff between checkout and the confirmation page.
//!
//! A single slot: checkout publishes once, the confirmation page takes once,
//! and taking clears it. An empty slot means there is no pending order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spice_market_core::{CartLineItem, Email, Price};
use thiserror::Error;
use uuid::Uuid;

/// Purchaser details collected at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl ContactDetails {
    /// Names of required fields left blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// A placed order, as shown on the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub reference: Uuid,
    pub contact: ContactDetails,
    pub items: Vec<CartLineItem>,
    pub total: Price,
    pub placed_at: DateTime<Utc>,
}

impl OrderConfirmation {
    /// Stamp a new order with a fresh reference and the current time.
    #[must_use]
    pub fn new(contact: ContactDetails, items: Vec<CartLineItem>, total: Price) -> Self {
        Self {
            reference: Uuid::new_v4(),
            contact,
            items,
            total,
            placed_at: Utc::now(),
        }
    }

    /// Short reference shown to the purchaser.
    #[must_use]
    pub fn short_reference(&self) -> String {
        self.reference
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("An order confirmation is already pending: {0}")]
    AlreadyPending(Uuid),
}

/// Write-once, read-once slot for an [`OrderConfirmation`].
#[derive(Debug, Default)]
pub struct OrderHandoff {
    slot: Mutex<Option<OrderConfirmation>>,
}

impl OrderHandoff {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a confirmation for the next reader.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::AlreadyPending`] if a previous confirmation
    /// has not been taken yet. The pending one is kept.
    pub fn publish(&self, order: OrderConfirmation) -> Result<(), HandoffError> {
        let mut slot = self.lock();
        if let Some(pending) = slot.as_ref() {
            return Err(HandoffError::AlreadyPending(pending.reference));
        }
        *slot = Some(order);
        Ok(())
    }

    /// Take the pending confirmation, leaving the slot empty.
    #[must_use]
    pub fn take(&self) -> Option<OrderConfirmation> {
        self.lock().take()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<OrderConfirmation>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
