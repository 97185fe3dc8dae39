use serde::Serialize;

use crate::domain::value_objects::enums::plan_names::{Plan, UnknownPlan};

/// Static plan table: list prices are compiled in, Stripe price ids come from
/// configuration. The ids must match the prices configured in Stripe; a mismatch
/// is a deployment error this catalog cannot detect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    monthly_price_ref: String,
    quarterly_price_ref: String,
    half_yearly_price_ref: String,
    yearly_price_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDto {
    pub plan: Plan,
    pub price_minor: i64,
    pub duration: &'static str,
}

impl PlanCatalog {
    pub fn new(
        monthly_price_ref: String,
        quarterly_price_ref: String,
        half_yearly_price_ref: String,
        yearly_price_ref: String,
    ) -> Self {
        Self {
            monthly_price_ref,
            quarterly_price_ref,
            half_yearly_price_ref,
            yearly_price_ref,
        }
    }

    pub fn resolve(&self, raw_plan: &str) -> Result<Plan, UnknownPlan> {
        raw_plan.parse()
    }

    pub fn price_of(&self, plan: Plan) -> i64 {
        plan.price_minor()
    }

    pub fn duration_label_of(&self, plan: Plan) -> &'static str {
        plan.duration_label()
    }

    pub fn external_reference_of(&self, plan: Plan) -> &str {
        match plan {
            Plan::Monthly => &self.monthly_price_ref,
            Plan::Quarterly => &self.quarterly_price_ref,
            Plan::HalfYearly => &self.half_yearly_price_ref,
            Plan::Yearly => &self.yearly_price_ref,
        }
    }

    pub fn plans(&self) -> Vec<PlanDto> {
        Plan::ALL
            .into_iter()
            .map(|plan| PlanDto {
                plan,
                price_minor: self.price_of(plan),
                duration: self.duration_label_of(plan),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlanCatalog {
        PlanCatalog::new(
            "price_monthly".to_string(),
            "price_quarterly".to_string(),
            "price_half_yearly".to_string(),
            "price_yearly".to_string(),
        )
    }

    #[test]
    fn maps_each_plan_to_its_configured_price_reference() {
        let catalog = catalog();
        assert_eq!(catalog.external_reference_of(Plan::Monthly), "price_monthly");
        assert_eq!(catalog.external_reference_of(Plan::Quarterly), "price_quarterly");
        assert_eq!(
            catalog.external_reference_of(Plan::HalfYearly),
            "price_half_yearly"
        );
        assert_eq!(catalog.external_reference_of(Plan::Yearly), "price_yearly");
    }

    #[test]
    fn lists_plans_in_catalog_order_with_static_prices() {
        let plans = catalog().plans();
        let summary: Vec<(Plan, i64, &str)> = plans
            .iter()
            .map(|dto| (dto.plan, dto.price_minor, dto.duration))
            .collect();

        assert_eq!(
            summary,
            vec![
                (Plan::Monthly, 2_000, "1 month"),
                (Plan::Quarterly, 5_500, "3 months"),
                (Plan::HalfYearly, 10_000, "6 months"),
                (Plan::Yearly, 18_000, "12 months"),
            ]
        );
    }

    #[test]
    fn resolve_fails_for_unknown_plan() {
        let err = catalog().resolve("Lifetime").unwrap_err();
        assert_eq!(err.to_string(), "unknown plan: Lifetime");
    }
}
