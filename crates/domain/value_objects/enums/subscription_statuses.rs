use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a subscription row. The only legal path is
/// `pending -> active -> canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown subscription status: {0}")]
pub struct UnknownSubscriptionStatus(pub String);

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 3] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Active,
        SubscriptionStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        matches!(
            (self, next),
            (SubscriptionStatus::Pending, SubscriptionStatus::Active)
                | (SubscriptionStatus::Active, SubscriptionStatus::Canceled)
        )
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = UnknownSubscriptionStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(UnknownSubscriptionStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        use SubscriptionStatus::*;

        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Canceled));

        assert!(!Pending.can_transition_to(Canceled));
        assert!(!Active.can_transition_to(Pending));
        assert!(!Canceled.can_transition_to(Active));
        assert!(!Canceled.can_transition_to(Pending));
        for status in SubscriptionStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected_instead_of_defaulted() {
        assert_eq!(
            "expired".parse::<SubscriptionStatus>(),
            Err(UnknownSubscriptionStatus("expired".to_string()))
        );
    }
}
