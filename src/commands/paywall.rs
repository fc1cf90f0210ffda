// SPDX-License-Identifier: Apache-2.0

//! Paywall commands: entitlement reads and writes, checkout, route guard.

use serde::Serialize;

use crate::checkout::{CheckoutError, CheckoutRequest, FieldError, PaymentReceipt};
use crate::entitlement::{self, EntitlementInfo, EntitlementState, Plan};
use crate::guard::{GuardDecision, SessionUser};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub state: EntitlementState,
    pub entitlement: EntitlementInfo,
}

impl From<EntitlementInfo> for AccessResponse {
    fn from(entitlement: EntitlementInfo) -> Self {
        Self {
            state: entitlement.state(),
            entitlement,
        }
    }
}

/// Response wrapper for checkout. Field errors are a normal outcome, not a
/// command failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub receipt: Option<PaymentReceipt>,
    pub field_errors: Vec<FieldError>,
    pub error: Option<String>,
}

pub async fn check_access(state: &AppState) -> Result<AccessResponse, String> {
    Ok(state.store.check_access().into())
}

pub async fn unlock_all(state: &AppState) -> Result<AccessResponse, String> {
    state.store.unlock_all().map_err(|e| e.to_string())?;
    Ok(state.store.check_access().into())
}

pub async fn reset_access(state: &AppState) -> Result<(), String> {
    state.store.reset_access().map_err(|e| e.to_string())
}

/// Compares two tier names without touching the store.
pub async fn has_required_plan(user_plan: String, required_plan: String) -> Result<bool, String> {
    Ok(entitlement::has_required_plan(&user_plan, &required_plan))
}

pub async fn simulate_payment(
    state: &AppState,
    request: CheckoutRequest,
) -> Result<CheckoutResponse, String> {
    match state.checkout.simulate_payment(request).await {
        Ok(receipt) => Ok(CheckoutResponse {
            success: true,
            receipt: Some(receipt),
            field_errors: Vec::new(),
            error: None,
        }),
        Err(CheckoutError::Invalid(errors)) => Ok(CheckoutResponse {
            success: false,
            receipt: None,
            error: Some(errors.to_string()),
            field_errors: errors.errors,
        }),
        Err(e @ CheckoutError::Storage(_)) => Err(e.to_string()),
    }
}

/// One-shot guard evaluation for a page requiring `required_plan`.
pub async fn evaluate_guard(
    state: &AppState,
    required_plan: String,
    user: Option<SessionUser>,
) -> Result<GuardDecision, String> {
    let required = required_plan.parse::<Plan>().map_err(|e| e.to_string())?;
    Ok(state.guard(required).evaluate(user.as_ref()))
}
