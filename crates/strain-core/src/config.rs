//! Tunables for [`crate::engine::InfectionEngine`].

use serde::Deserialize;

/// Engine configuration, usually nested under `[engine]` in `config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Per-(infector, method) cooldown window.
  pub cooldown_seconds:            u64,
  /// Search radius handed to the outbreak-zone detector.
  pub zone_radius_m:               f64,
  pub outbreak_window_minutes:     i64,
  /// Infection tags on the strain within the window needed for an outbreak.
  pub outbreak_tag_threshold:      u32,
  /// Outbreak multiplier that must be exceeded before checking for a burst.
  pub outbreak_multiplier_trigger: f64,
  /// Sorted set that receives strain totals from the ancestor climb.
  pub leaderboard_key:             String,
  pub variant_chain_cap:           u32,
  /// Proximity infections below this signal strength are rejected.
  pub min_signal_dbm:              i32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      cooldown_seconds:            300,
      zone_radius_m:               1000.0,
      outbreak_window_minutes:     60,
      outbreak_tag_threshold:      5,
      outbreak_multiplier_trigger: 5.0,
      leaderboard_key:             "global".to_owned(),
      variant_chain_cap:           10,
      min_signal_dbm:              -80,
    }
  }
}
