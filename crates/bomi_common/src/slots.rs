//! Slot state: the structured intent accumulated across conversation turns.
//!
//! One `SlotState` per active conversation. Each turn's extraction produces
//! a delta that is merged left-biased onto the prior state: a newly resolved
//! value overrides, an unresolved one never clears. The single sanctioned
//! exception is the insurer-switch pivot, which replaces the insurer set
//! wholesale (see `dialogue`).

use serde::{Deserialize, Serialize};

/// Customer sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
        }
    }
}

/// Age band. Free-text ages are bucketed into one of three decades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Band30,
    Band40,
    Band50,
}

impl AgeBand {
    /// The representative decade (30/40/50), also the backend request value.
    pub fn decade(&self) -> u8 {
        match self {
            AgeBand::Band30 => 30,
            AgeBand::Band40 => 40,
            AgeBand::Band50 => 50,
        }
    }

    pub fn from_decade(decade: u8) -> Option<Self> {
        match decade {
            30 => Some(AgeBand::Band30),
            40 => Some(AgeBand::Band40),
            50 => Some(AgeBand::Band50),
            _ => None,
        }
    }
}

/// Premium sort preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Total,
    Monthly,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Total => "total",
            SortBy::Monthly => "monthly",
        }
    }
}

/// Which plan variants a comparison should span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanVariantScope {
    All,
    Standard,
    NoRefund,
}

impl PlanVariantScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanVariantScope::All => "all",
            PlanVariantScope::Standard => "standard",
            PlanVariantScope::NoRefund => "no_refund",
        }
    }
}

/// Premium query mode (Q1): whole-contract total or per-coverage breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PremiumMode {
    Total,
    ByCoverage,
}

impl PremiumMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PremiumMode::Total => "TOTAL",
            PremiumMode::ByCoverage => "BY_COVERAGE",
        }
    }
}

/// Accumulated slots for one conversation.
///
/// Scalar slots are `Option`; list slots are ordered and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    pub sex: Option<Sex>,
    pub age_band: Option<AgeBand>,
    pub sort_by: Option<SortBy>,
    pub plan_variant_scope: Option<PlanVariantScope>,
    pub premium_mode: Option<PremiumMode>,
    pub coverage_query_text: Option<String>,
    #[serde(default)]
    pub insurers: Vec<String>,
    #[serde(default)]
    pub coverage_names: Vec<String>,
    #[serde(default)]
    pub disease_subtypes: Vec<String>,
}

impl SlotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a turn's extraction delta onto this state. New non-null values
    /// override; null values never clear an already-resolved slot. List
    /// slots append missing entries, preserving first-seen order.
    pub fn merge(&mut self, delta: SlotState) {
        if delta.sex.is_some() {
            self.sex = delta.sex;
        }
        if delta.age_band.is_some() {
            self.age_band = delta.age_band;
        }
        if delta.sort_by.is_some() {
            self.sort_by = delta.sort_by;
        }
        if delta.plan_variant_scope.is_some() {
            self.plan_variant_scope = delta.plan_variant_scope;
        }
        if delta.premium_mode.is_some() {
            self.premium_mode = delta.premium_mode;
        }
        if delta.coverage_query_text.is_some() {
            self.coverage_query_text = delta.coverage_query_text;
        }
        for code in delta.insurers {
            if !self.insurers.contains(&code) {
                self.insurers.push(code);
            }
        }
        for name in delta.coverage_names {
            if !self.coverage_names.contains(&name) {
                self.coverage_names.push(name);
            }
        }
        for sub in delta.disease_subtypes {
            if !self.disease_subtypes.contains(&sub) {
                self.disease_subtypes.push(sub);
            }
        }
    }

    /// Insurer-switch pivot: replace the insurer set with a single insurer
    /// while keeping every other slot. Intentional override of the
    /// never-clear rule.
    pub fn pivot_insurer(&mut self, code: impl Into<String>) {
        self.insurers = vec![code.into()];
    }

    pub fn is_empty(&self) -> bool {
        *self == SlotState::default()
    }
}
