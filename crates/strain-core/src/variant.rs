//! Variants: rulesets a player activates, unlocked by strain progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
  pub variant_id: Uuid,
  pub name:       String,
  /// Tier 1 (common) to 5 (legendary).
  pub rarity:     u8,
  pub rules:      VariantRules,
}

/// An inclusive `"HH:MM"` window, compared as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: String,
  pub end:   String,
}

impl TimeWindow {
  pub fn contains(&self, hhmm: &str) -> bool {
    hhmm >= self.start.as_str() && hhmm <= self.end.as_str()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantRules {
  #[serde(default)]
  pub tag_limit:        Option<u32>,
  #[serde(default)]
  pub time_restriction: Option<TimeWindow>,
  /// Maximum infector-to-target distance in metres.
  #[serde(default)]
  pub radius:           Option<f64>,
  #[serde(default)]
  pub visibility:       Option<String>,
}

/// Unlock record, one per `(user, variant)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVariant {
  pub user_id:     Uuid,
  pub variant_id:  Uuid,
  pub unlocked_at: DateTime<Utc>,
}

/// Strain total needed to unlock a variant of the given rarity. `None` for
/// tiers outside 1–5, which never unlock.
pub fn rarity_threshold(rarity: u8) -> Option<f64> {
  match rarity {
    1 => Some(0.0),
    2 => Some(10.0),
    3 => Some(50.0),
    4 => Some(100.0),
    5 => Some(500.0),
    _ => None,
  }
}
