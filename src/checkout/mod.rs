// SPDX-License-Identifier: Apache-2.0

//! Simulated checkout
//!
//! Validates the payment form, pretends to talk to a payment processor, then
//! records the purchase and unlocks premium access. No money moves.

pub mod form;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use iq_validation::CardBrand;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entitlement::{EntitlementStore, Plan};
use crate::error::StoreError;
use crate::metrics;

pub use form::{validate_card, validate_pix, CardInput, CheckoutField, FieldError, FieldErrors, PixInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Pix,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Pix => "pix",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    CreditCard(CardInput),
    Pix(PixInput),
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::CreditCard(_) => PaymentMethod::CreditCard,
            PaymentDetails::Pix(_) => PaymentMethod::Pix,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub plan: Plan,
    pub payment: PaymentDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub plan: Plan,
    pub method: PaymentMethod,
    pub brand: Option<CardBrand>,
    pub card_last_four: Option<String>,
    pub purchase_date: String,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout input: {0}")]
    Invalid(#[from] FieldErrors),

    #[error("Failed to record purchase: {0}")]
    Storage(#[from] StoreError),
}

pub struct CheckoutService {
    store: Arc<EntitlementStore>,
    latency: Duration,
}

impl CheckoutService {
    pub fn new(store: Arc<EntitlementStore>, latency: Duration) -> Self {
        Self { store, latency }
    }

    pub fn from_config(store: Arc<EntitlementStore>, config: &AppConfig) -> Self {
        Self::new(store, config.simulated_latency())
    }

    pub async fn simulate_payment(&self, request: CheckoutRequest) -> Result<PaymentReceipt, CheckoutError> {
        self.simulate_payment_at(request, Utc::now().date_naive()).await
    }

    /// Runs the checkout with `today` as the reference date for the card
    /// expiry check.
    #[instrument(skip(self, request), fields(plan = %request.plan, method = request.payment.method().as_str()))]
    pub async fn simulate_payment_at(
        &self,
        request: CheckoutRequest,
        today: NaiveDate,
    ) -> Result<PaymentReceipt, CheckoutError> {
        let method = request.payment.method();

        let validated = match &request.payment {
            PaymentDetails::CreditCard(card) => {
                validate_card(card, today).map(|brand| (Some(brand), Some(card.number.last_four())))
            }
            PaymentDetails::Pix(pix) => validate_pix(pix).map(|()| (None, None)),
        };
        let (brand, card_last_four) = match validated {
            Ok(details) => details,
            Err(errors) => {
                metrics::record_checkout(false, errors.len());
                warn!("Checkout rejected: {}", errors);
                return Err(errors.into());
            }
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let record = self.store.record_purchase(request.plan, method.as_str())?;
        self.store.unlock_all()?;

        let payment_id = format!("pay_{}", Uuid::new_v4().simple());
        metrics::record_checkout(true, 0);
        info!(payment_id = %payment_id, "Simulated payment approved");

        Ok(PaymentReceipt {
            payment_id,
            plan: request.plan,
            method,
            brand,
            card_last_four,
            purchase_date: record.purchase_date.unwrap_or_default(),
        })
    }
}
