//! Per-transaction-type award rules.
//!
//! Rules are read on every award and written rarely. A rule change only
//! affects awards made after it; nothing is recomputed retroactively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::security::VerificationLevel;
use crate::transaction::TransactionType;

/// Award configuration for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The transaction type this rule governs.
    pub transaction_type: TransactionType,

    /// Points awarded when the caller does not request an amount.
    pub base_points: i64,

    /// Cap on completed points of this type per UTC calendar day.
    #[serde(default)]
    pub max_daily_earnings: Option<i64>,

    /// Cap on completed points of this type per event.
    #[serde(default)]
    pub max_per_event: Option<i64>,

    /// Minimum verification tier required to earn this type.
    #[serde(default)]
    pub verification_level_required: VerificationLevel,

    /// Inactive rules behave as if absent.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl Rule {
    /// An active rule with no caps and no verification requirement.
    #[must_use]
    pub const fn new(transaction_type: TransactionType, base_points: i64) -> Self {
        Self {
            transaction_type,
            base_points,
            max_daily_earnings: None,
            max_per_event: None,
            verification_level_required: VerificationLevel::None,
            is_active: true,
        }
    }

    /// Set the daily cap.
    #[must_use]
    pub fn with_daily_cap(mut self, cap: i64) -> Self {
        self.max_daily_earnings = Some(cap);
        self
    }

    /// Set the per-event cap.
    #[must_use]
    pub fn with_event_cap(mut self, cap: i64) -> Self {
        self.max_per_event = Some(cap);
        self
    }

    /// Set the verification requirement.
    #[must_use]
    pub fn requiring(mut self, level: VerificationLevel) -> Self {
        self.verification_level_required = level;
        self
    }
}

/// Source of award rules.
pub trait RuleStore: Send + Sync {
    /// The active rule for `transaction_type`, or `None`.
    fn get_rule(&self, transaction_type: TransactionType) -> Option<Rule>;

    /// Every rule, active or not.
    fn list_rules(&self) -> Vec<Rule>;

    /// Insert or replace a rule.
    fn upsert_rule(&self, rule: Rule);
}

/// In-memory rule store.
#[derive(Debug, Default)]
pub struct RuleBook {
    rules: RwLock<BTreeMap<TransactionType, Rule>>,
}

impl RuleBook {
    /// An empty book. Every lookup misses until rules are added.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a list of rules; later entries win.
    #[must_use]
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| (rule.transaction_type, rule))
            .collect();
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Parse a JSON array of rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;
        Ok(Self::from_rules(rules))
    }

    /// The stock rules for the platform's point-earning actions.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_rules([
            Rule::new(TransactionType::EventCreate, 50).with_daily_cap(500),
            Rule::new(TransactionType::EventCheckin, 20).with_event_cap(40),
            Rule::new(TransactionType::EventRegister, 10).with_event_cap(20),
            Rule::new(TransactionType::EventShare, 5)
                .with_daily_cap(50)
                .with_event_cap(15),
            Rule::new(TransactionType::Referral, 100)
                .with_daily_cap(500)
                .requiring(VerificationLevel::Email),
            Rule::new(TransactionType::AchievementBonus, 0),
            Rule::new(TransactionType::AdminAdjustment, 0),
        ])
    }
}

impl RuleStore for RuleBook {
    fn get_rule(&self, transaction_type: TransactionType) -> Option<Rule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&transaction_type)
            .filter(|rule| rule.is_active)
            .cloned()
    }

    fn list_rules(&self) -> Vec<Rule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn upsert_rule(&self, rule: Rule) {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.transaction_type, rule);
    }
}
