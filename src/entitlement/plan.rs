// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Plan tier determines which quizzes are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Intermediate,
    Advanced,
    Premium,
}

impl Plan {
    /// Every tier, lowest first.
    pub const ALL: [Plan; 4] = [Plan::Basic, Plan::Intermediate, Plan::Advanced, Plan::Premium];

    /// Returns true if this plan includes the given plan's content.
    pub fn includes(&self, required: Plan) -> bool {
        self.level() >= required.level()
    }

    pub fn level(&self) -> usize {
        match self {
            Plan::Basic => 0,
            Plan::Intermediate => 1,
            Plan::Advanced => 2,
            Plan::Premium => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Intermediate => "intermediate",
            Plan::Advanced => "advanced",
            Plan::Premium => "premium",
        }
    }

    /// Position of a plan name in the tier ordering, `None` when the name is
    /// not a known plan.
    pub fn index(name: &str) -> Option<usize> {
        name.parse::<Plan>().ok().map(|plan| plan.level())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown plan: {0}")]
pub struct UnknownPlan(pub String);

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Plan::Basic),
            "intermediate" => Ok(Plan::Intermediate),
            "advanced" => Ok(Plan::Advanced),
            "premium" => Ok(Plan::Premium),
            other => Err(UnknownPlan(other.to_string())),
        }
    }
}

/// Compares two plan names against the fixed tier ordering.
///
/// An unrecognised name on either side denies access: an unknown user plan
/// never satisfies anything, and an unknown requirement cannot be satisfied.
pub fn has_required_plan(user_plan: &str, required_plan: &str) -> bool {
    match (Plan::index(user_plan), Plan::index(required_plan)) {
        (Some(user), Some(required)) => user >= required,
        _ => false,
    }
}
