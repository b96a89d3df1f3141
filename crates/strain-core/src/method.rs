//! The closed set of ways one player can infect another.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// How an infection was delivered.
///
/// The snake_case string form is used in cooldown keys, the `infection_method`
/// column and the JSON API.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InfectionMethod {
  /// Face-to-face tag.
  Direct,
  /// Bluetooth/nearby detection, gated on signal strength.
  Proximity,
  Hotspot,
  ChainReaction,
  /// Passive spread to a bystander.
  Ambient,
  Qr,
  DeepLink,
  ChatLink,
  ShareCard,
  StoryQr,
  /// Claiming a geo-placed drop.
  TagDrop,
  GroupInfection,
  Npc,
}

impl InfectionMethod {
  /// Fixed per-method score multiplier.
  pub fn multiplier(self) -> f64 {
    match self {
      Self::Proximity => 1.2,
      Self::Hotspot => 1.15,
      Self::ChainReaction => 1.5,
      Self::Ambient => 0.5,
      Self::Direct
      | Self::Qr
      | Self::DeepLink
      | Self::ChatLink
      | Self::ShareCard
      | Self::StoryQr
      | Self::TagDrop
      | Self::GroupInfection
      | Self::Npc => 1.0,
    }
  }

  /// Link, QR and passive methods are not subject to a variant's radius rule.
  pub fn bypasses_radius(self) -> bool {
    match self {
      Self::Qr
      | Self::DeepLink
      | Self::ChatLink
      | Self::ShareCard
      | Self::StoryQr
      | Self::TagDrop
      | Self::GroupInfection
      | Self::Ambient
      | Self::Npc => true,
      Self::Direct | Self::Proximity | Self::Hotspot | Self::ChainReaction => {
        false
      }
    }
  }
}
