// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::plan::Plan;

/// Record of a specific purchased tier, persisted as JSON under `purchasedTest`.
///
/// Any JSON object is accepted: a missing or mistyped `level` reads as `None`
/// and only a literal `true` counts as a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedTest {
    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "literal_true")]
    pub payment_confirmed: bool,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl PurchasedTest {
    pub fn confirmed(plan: Plan, purchase_date: impl Into<String>, payment_method: impl Into<String>) -> Self {
        Self {
            level: Some(plan.as_str().to_string()),
            payment_confirmed: true,
            purchase_date: Some(purchase_date.into()),
            payment_method: Some(payment_method.into()),
        }
    }

    pub fn plan(&self) -> Option<Plan> {
        self.level.as_deref()?.parse().ok()
    }
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn literal_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(deserializer)? == Value::Bool(true))
}

/// Resolved view of what this session may access.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementInfo {
    pub has_access: bool,
    pub purchased_levels: Vec<Plan>,
    pub all_unlocked: bool,
    pub purchase_date: Option<String>,
    pub payment_method: Option<String>,
    pub unlocked_at: Option<String>,
    /// Tier named by the purchase record, or by `purchasedLevel` when no
    /// structured record exists. Informational only: access is all-or-nothing.
    pub purchased_level: Option<String>,
}

impl EntitlementInfo {
    pub fn locked() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EntitlementState {
        if self.has_access {
            EntitlementState::Unlocked
        } else {
            EntitlementState::Locked
        }
    }

    /// Highest tier held, if any.
    pub fn plan(&self) -> Option<Plan> {
        self.purchased_levels.iter().copied().max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementState {
    Locked,
    Unlocked,
}
