use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::ledger::models::Plan;

/// Price and credit grant for one plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTerms {
    /// Major currency units (rupees)
    pub price: i64,
    pub credits: i64,
}

impl PlanTerms {
    /// Gateway amounts are always minor units
    pub fn amount_minor(&self) -> i64 {
        self.price * 100
    }
}

/// Plan -> price/credits table, injected into the order and settlement services
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    terms: HashMap<Plan, PlanTerms>,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let mut terms = HashMap::new();
        terms.insert(Plan::Basic, PlanTerms { price: 500, credits: 50 });
        terms.insert(Plan::Premium, PlanTerms { price: 1000, credits: 100 });
        Self { terms }
    }
}

impl PlanCatalog {
    #[cfg(test)]
    pub fn new(terms: HashMap<Plan, PlanTerms>) -> Self {
        Self { terms }
    }

    pub fn terms(&self, plan: Plan) -> AppResult<PlanTerms> {
        self.terms
            .get(&plan)
            .copied()
            .ok_or_else(|| AppError::Validation(format!("Plan {} is not offered", plan)))
    }

    /// Display text for the checkout widget, e.g. "BASIC Plan - 50 Credits"
    pub fn describe(&self, plan: Plan) -> AppResult<String> {
        let terms = self.terms(plan)?;
        Ok(format!("{} Plan - {} Credits", plan.as_str().to_uppercase(), terms.credits))
    }
}
