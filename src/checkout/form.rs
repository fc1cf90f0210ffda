// SPDX-License-Identifier: Apache-2.0

//! Checkout form input and field-level validation.

use chrono::NaiveDate;
use iq_validation::{card, expiry, CardBrand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Sensitive;

/// Card payment fields exactly as typed. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub number: Sensitive<String>,
    pub holder_name: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: Sensitive<String>,
    pub cpf: Sensitive<String>,
    pub email: String,
}

/// Pix payments only need the payer's CPF and an email for the receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixInput {
    pub cpf: Sensitive<String>,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutField {
    CardNumber,
    HolderName,
    Expiry,
    Cvv,
    Cpf,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: CheckoutField,
    pub message: String,
}

/// Every field that failed, so the form can flag them all at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct FieldErrors {
    pub errors: Vec<FieldError>,
}

impl FieldErrors {
    fn push(&mut self, field: CheckoutField, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, field: CheckoutField) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn into_result<T>(self, ok: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(ok)
        } else {
            Err(self)
        }
    }
}

/// Validates every card field against `today` and returns the card brand.
pub fn validate_card(input: &CardInput, today: NaiveDate) -> Result<CardBrand, FieldErrors> {
    let mut errors = FieldErrors::default();

    if let Err(e) = card::check_card_number(input.number.expose()) {
        errors.push(CheckoutField::CardNumber, e.to_string());
    }
    if input.holder_name.trim().is_empty() {
        errors.push(CheckoutField::HolderName, "Cardholder name is required");
    }
    if let Err(e) = expiry::check_expiry_at(&input.expiry, today) {
        errors.push(CheckoutField::Expiry, e.to_string());
    }
    if let Err(e) = card::check_cvv(input.cvv.expose()) {
        errors.push(CheckoutField::Cvv, e.to_string());
    }
    check_payer(&mut errors, &input.cpf, &input.email);

    errors.into_result(iq_validation::card_brand(input.number.expose()))
}

pub fn validate_pix(input: &PixInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    check_payer(&mut errors, &input.cpf, &input.email);
    errors.into_result(())
}

fn check_payer(errors: &mut FieldErrors, cpf: &Sensitive<String>, email: &str) {
    if !iq_validation::validate_cpf(cpf.expose()) {
        errors.push(CheckoutField::Cpf, "Invalid CPF");
    }
    if !iq_validation::validate_email(email) {
        errors.push(CheckoutField::Email, "Invalid email address");
    }
}
