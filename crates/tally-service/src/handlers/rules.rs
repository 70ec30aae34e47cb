//! Rule handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{Rule, RuleStore};

use crate::auth::{AdminAuth, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// List rules response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRulesResponse {
    /// Every configured rule, active or not.
    pub rules: Vec<Rule>,
}

/// List every configured rule.
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    _service: ServiceAuth,
) -> Json<ListRulesResponse> {
    Json(ListRulesResponse {
        rules: state.ledger.rules().list_rules(),
    })
}

/// Insert or replace the rule for a transaction type.
pub async fn upsert_rule(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(rule): Json<Rule>,
) -> Result<Json<Rule>, ApiError> {
    validate_rule(&rule)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        transaction_type = %rule.transaction_type,
        base_points = rule.base_points,
        is_active = rule.is_active,
        "Rule updated"
    );

    state.ledger.rules().upsert_rule(rule.clone());

    Ok(Json(rule))
}

fn validate_rule(rule: &Rule) -> Result<(), ApiError> {
    if rule.base_points < 0 {
        return Err(ApiError::BadRequest("base_points must not be negative".into()));
    }
    if rule.max_daily_earnings.is_some_and(|cap| cap <= 0) {
        return Err(ApiError::BadRequest("max_daily_earnings must be positive".into()));
    }
    if rule.max_per_event.is_some_and(|cap| cap <= 0) {
        return Err(ApiError::BadRequest("max_per_event must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{RuleBook, TransactionType};

    #[test]
    fn rejects_negative_base_points() {
        let rule = Rule::new(TransactionType::EventShare, -5);
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn rejects_zero_caps() {
        let rule = Rule::new(TransactionType::EventShare, 5).with_daily_cap(0);
        assert!(validate_rule(&rule).is_err());

        let rule = Rule::new(TransactionType::EventShare, 5).with_event_cap(0);
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn accepts_standard_rules() {
        for rule in RuleBook::standard().list_rules() {
            assert!(validate_rule(&rule).is_ok(), "{rule:?}");
        }
    }
}
