use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::value_objects::{
    enums::{plan_names::Plan, subscription_statuses::SubscriptionStatus},
    subscriptions::SubscriptionModel,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCount {
    pub plan: Plan,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: SubscriptionStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM` of the activation date.
    pub month: String,
    pub count: usize,
}

/// Aggregates for the admin dashboard. Everything here is derived from an
/// already filtered list of subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionReport {
    pub total: usize,
    pub active_by_plan: Vec<PlanCount>,
    pub by_status: Vec<StatusCount>,
    pub estimated_revenue_minor: i64,
    pub new_per_month: Vec<MonthlyCount>,
}

impl SubscriptionReport {
    pub fn from_subscriptions(subscriptions: &[SubscriptionModel]) -> Self {
        Self {
            total: subscriptions.len(),
            active_by_plan: active_by_plan(subscriptions),
            by_status: by_status(subscriptions),
            estimated_revenue_minor: estimated_revenue_minor(subscriptions),
            new_per_month: new_per_month(subscriptions),
        }
    }
}

pub fn active_by_plan(subscriptions: &[SubscriptionModel]) -> Vec<PlanCount> {
    Plan::ALL
        .into_iter()
        .map(|plan| PlanCount {
            plan,
            count: subscriptions
                .iter()
                .filter(|sub| sub.plan == plan && sub.status == SubscriptionStatus::Active)
                .count(),
        })
        .collect()
}

pub fn by_status(subscriptions: &[SubscriptionModel]) -> Vec<StatusCount> {
    SubscriptionStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: subscriptions.iter().filter(|sub| sub.status == status).count(),
        })
        .collect()
}

/// Sum of list prices over every subscription that was paid for at least once,
/// i.e. reached `active`. Pending checkouts never count.
pub fn estimated_revenue_minor(subscriptions: &[SubscriptionModel]) -> i64 {
    subscriptions
        .iter()
        .filter(|sub| sub.status != SubscriptionStatus::Pending)
        .map(|sub| sub.plan.price_minor())
        .sum()
}

pub fn new_per_month(subscriptions: &[SubscriptionModel]) -> Vec<MonthlyCount> {
    let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
    for start_date in subscriptions.iter().filter_map(|sub| sub.start_date) {
        *buckets
            .entry(start_date.format("%Y-%m").to_string())
            .or_default() += 1;
    }

    buckets
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn subscription(plan: Plan, status: SubscriptionStatus, started: Option<(i32, u32)>) -> SubscriptionModel {
        let start_date = started.map(|(year, month)| {
            Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
        });
        SubscriptionModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan,
            status,
            start_date,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<SubscriptionModel> {
        use Plan::*;
        use SubscriptionStatus::*;

        vec![
            subscription(Monthly, Active, Some((2025, 11))),
            subscription(Monthly, Active, Some((2026, 1))),
            subscription(Yearly, Canceled, Some((2025, 11))),
            subscription(Quarterly, Pending, None),
            subscription(HalfYearly, Active, Some((2026, 1))),
        ]
    }

    #[test]
    fn counts_active_subscriptions_for_every_plan() {
        assert_eq!(
            active_by_plan(&sample()),
            vec![
                PlanCount { plan: Plan::Monthly, count: 2 },
                PlanCount { plan: Plan::Quarterly, count: 0 },
                PlanCount { plan: Plan::HalfYearly, count: 1 },
                PlanCount { plan: Plan::Yearly, count: 0 },
            ]
        );
    }

    #[test]
    fn revenue_counts_activated_rows_only() {
        // 2 x Monthly + Yearly + Half-Yearly, the pending Quarterly is excluded.
        assert_eq!(estimated_revenue_minor(&sample()), 2_000 * 2 + 18_000 + 10_000);
    }

    #[test]
    fn buckets_new_subscriptions_by_month_in_chronological_order() {
        assert_eq!(
            new_per_month(&sample()),
            vec![
                MonthlyCount { month: "2025-11".to_string(), count: 2 },
                MonthlyCount { month: "2026-01".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn report_on_empty_list_has_zeroed_buckets() {
        let report = SubscriptionReport::from_subscriptions(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.estimated_revenue_minor, 0);
        assert!(report.new_per_month.is_empty());
        assert!(report.active_by_plan.iter().all(|bucket| bucket.count == 0));
        assert_eq!(report.by_status.len(), 3);
    }
}
