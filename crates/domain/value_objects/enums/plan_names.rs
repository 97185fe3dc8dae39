use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of plans a user can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Plan {
    Monthly,
    Quarterly,
    #[serde(rename = "Half-Yearly")]
    HalfYearly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plan: {0}")]
pub struct UnknownPlan(pub String);

impl Plan {
    pub const ALL: [Plan; 4] = [
        Plan::Monthly,
        Plan::Quarterly,
        Plan::HalfYearly,
        Plan::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "Monthly",
            Plan::Quarterly => "Quarterly",
            Plan::HalfYearly => "Half-Yearly",
            Plan::Yearly => "Yearly",
        }
    }

    /// Static list price in minor units (cents).
    pub fn price_minor(&self) -> i64 {
        match self {
            Plan::Monthly => 2_000,
            Plan::Quarterly => 5_500,
            Plan::HalfYearly => 10_000,
            Plan::Yearly => 18_000,
        }
    }

    pub fn duration_label(&self) -> &'static str {
        match self {
            Plan::Monthly => "1 month",
            Plan::Quarterly => "3 months",
            Plan::HalfYearly => "6 months",
            Plan::Yearly => "12 months",
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|plan| plan.as_str() == value.trim())
            .ok_or_else(|| UnknownPlan(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_catalog_identifier() {
        for plan in Plan::ALL {
            assert_eq!(plan.as_str().parse::<Plan>().unwrap(), plan);
        }
    }

    #[test]
    fn rejects_identifiers_outside_the_catalog() {
        for raw in ["Weekly", "monthly", "HalfYearly", ""] {
            let err = raw.parse::<Plan>().unwrap_err();
            assert_eq!(err, UnknownPlan(raw.to_string()));
        }
    }

    #[test]
    fn half_yearly_uses_hyphenated_wire_name() {
        let json = serde_json::to_string(&Plan::HalfYearly).unwrap();
        assert_eq!(json, "\"Half-Yearly\"");
    }
}
