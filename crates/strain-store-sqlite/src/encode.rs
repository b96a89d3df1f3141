//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so they sort lexicographically. Structured fields (variant rules, mutation
//! boosts, id lists) are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use strain_core::{
  geo::GeoPoint,
  method::InfectionMethod,
  mutation::{MutationBoost, MutationNode},
  outbreak::{OutbreakZone, TagDrop},
  strain::Strain,
  tag::{ScoreSnapshot, Tag, UserTag},
  user::User,
  variant::{Variant, VariantRules},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_method(m: InfectionMethod) -> &'static str { m.into() }

pub fn decode_method(s: &str) -> Result<InfectionMethod> {
  InfectionMethod::from_str(s).map_err(|_| Error::UnknownValue {
    kind:  "infection method",
    value: s.to_owned(),
  })
}

fn decode_point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
  match (lat, lng) {
    (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
    _ => None,
  }
}

pub fn encode_ids(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, username, current_strain_id, \
  current_variant_id, root_user_id, parent_user_id, generation, tags_given, \
  tags_received, direct_score, indirect_score, last_lat, last_lng, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:            String,
  pub username:           String,
  pub current_strain_id:  Option<String>,
  pub current_variant_id: Option<String>,
  pub root_user_id:       Option<String>,
  pub parent_user_id:     Option<String>,
  pub generation:         u32,
  pub tags_given:         u32,
  pub tags_received:      u32,
  pub direct_score:       f64,
  pub indirect_score:     f64,
  pub last_lat:           Option<f64>,
  pub last_lng:           Option<f64>,
  pub created_at:         String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:            row.get(0)?,
      username:           row.get(1)?,
      current_strain_id:  row.get(2)?,
      current_variant_id: row.get(3)?,
      root_user_id:       row.get(4)?,
      parent_user_id:     row.get(5)?,
      generation:         row.get(6)?,
      tags_given:         row.get(7)?,
      tags_received:      row.get(8)?,
      direct_score:       row.get(9)?,
      indirect_score:     row.get(10)?,
      last_lat:           row.get(11)?,
      last_lng:           row.get(12)?,
      created_at:         row.get(13)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:            decode_uuid(&self.user_id)?,
      username:           self.username,
      current_strain_id:  decode_opt_uuid(self.current_strain_id)?,
      current_variant_id: decode_opt_uuid(self.current_variant_id)?,
      root_user_id:       decode_opt_uuid(self.root_user_id)?,
      parent_user_id:     decode_opt_uuid(self.parent_user_id)?,
      generation:         self.generation,
      tags_given:         self.tags_given,
      tags_received:      self.tags_received,
      direct_score:       self.direct_score,
      indirect_score:     self.indirect_score,
      last_location:      decode_point(self.last_lat, self.last_lng),
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

// ─── Strains ─────────────────────────────────────────────────────────────────

pub const STRAIN_COLUMNS: &str = "strain_id, origin_user_id, \
  direct_infections, indirect_infections, total_infections, depth, \
  mutation_points, outbreak_count, variant_chain_depth, countries, created_at";

pub struct RawStrain {
  pub strain_id:           String,
  pub origin_user_id:      String,
  pub direct_infections:   u32,
  pub indirect_infections: f64,
  pub total_infections:    f64,
  pub depth:               u32,
  pub mutation_points:     u32,
  pub outbreak_count:      u32,
  pub variant_chain_depth: u32,
  pub countries:           String,
  pub created_at:          String,
}

impl RawStrain {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      strain_id:           row.get(0)?,
      origin_user_id:      row.get(1)?,
      direct_infections:   row.get(2)?,
      indirect_infections: row.get(3)?,
      total_infections:    row.get(4)?,
      depth:               row.get(5)?,
      mutation_points:     row.get(6)?,
      outbreak_count:      row.get(7)?,
      variant_chain_depth: row.get(8)?,
      countries:           row.get(9)?,
      created_at:          row.get(10)?,
    })
  }

  pub fn into_strain(self) -> Result<Strain> {
    Ok(Strain {
      strain_id:           decode_uuid(&self.strain_id)?,
      origin_user_id:      decode_uuid(&self.origin_user_id)?,
      direct_infections:   self.direct_infections,
      indirect_infections: self.indirect_infections,
      total_infections:    self.total_infections,
      depth:               self.depth,
      mutation_points:     self.mutation_points,
      outbreak_count:      self.outbreak_count,
      variant_chain_depth: self.variant_chain_depth,
      countries:           serde_json::from_str(&self.countries)?,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub const TAG_COLUMNS: &str = "tag_id, tagger_id, target_id, strain_id, \
  variant_id, parent_tag_id, root_user_id, origin_user_id, generation, \
  outbreak_multiplier, region_multiplier, mutation_boost, \
  variant_chain_bonus, final_score, infection_method, infection_event_id, \
  lat, lng, created_at";

/// A `tags` row as plain column values; used for both reads and inserts.
#[derive(Clone)]
pub struct RawTag {
  pub tag_id:              String,
  pub tagger_id:           String,
  pub target_id:           String,
  pub strain_id:           String,
  pub variant_id:          Option<String>,
  pub parent_tag_id:       Option<String>,
  pub root_user_id:        String,
  pub origin_user_id:      String,
  pub generation:          u32,
  pub outbreak_multiplier: f64,
  pub region_multiplier:   f64,
  pub mutation_boost:      f64,
  pub variant_chain_bonus: f64,
  pub final_score:         f64,
  pub infection_method:    Option<String>,
  pub infection_event_id:  Option<String>,
  pub lat:                 Option<f64>,
  pub lng:                 Option<f64>,
  pub created_at:          String,
}

impl RawTag {
  pub fn from_tag(tag: &Tag) -> Self {
    Self {
      tag_id:              encode_uuid(tag.tag_id),
      tagger_id:           encode_uuid(tag.tagger_id),
      target_id:           encode_uuid(tag.target_id),
      strain_id:           encode_uuid(tag.strain_id),
      variant_id:          tag.variant_id.map(encode_uuid),
      parent_tag_id:       tag.parent_tag_id.map(encode_uuid),
      root_user_id:        encode_uuid(tag.root_user_id),
      origin_user_id:      encode_uuid(tag.origin_user_id),
      generation:          tag.generation,
      outbreak_multiplier: tag.snapshot.outbreak_multiplier,
      region_multiplier:   tag.snapshot.region_multiplier,
      mutation_boost:      tag.snapshot.mutation_boost,
      variant_chain_bonus: tag.snapshot.variant_chain_bonus,
      final_score:         tag.snapshot.final_score,
      infection_method:    tag.infection_method.map(|m| encode_method(m).to_owned()),
      infection_event_id:  tag.infection_event_id.map(encode_uuid),
      lat:                 tag.location.map(|p| p.lat),
      lng:                 tag.location.map(|p| p.lng),
      created_at:          encode_dt(tag.created_at),
    }
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tag_id:              row.get(0)?,
      tagger_id:           row.get(1)?,
      target_id:           row.get(2)?,
      strain_id:           row.get(3)?,
      variant_id:          row.get(4)?,
      parent_tag_id:       row.get(5)?,
      root_user_id:        row.get(6)?,
      origin_user_id:      row.get(7)?,
      generation:          row.get(8)?,
      outbreak_multiplier: row.get(9)?,
      region_multiplier:   row.get(10)?,
      mutation_boost:      row.get(11)?,
      variant_chain_bonus: row.get(12)?,
      final_score:         row.get(13)?,
      infection_method:    row.get(14)?,
      infection_event_id:  row.get(15)?,
      lat:                 row.get(16)?,
      lng:                 row.get(17)?,
      created_at:          row.get(18)?,
    })
  }

  /// Insert this row. Shared by single inserts and the infection commit.
  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      &format!(
        "INSERT INTO tags ({TAG_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
      ),
      rusqlite::params![
        self.tag_id,
        self.tagger_id,
        self.target_id,
        self.strain_id,
        self.variant_id,
        self.parent_tag_id,
        self.root_user_id,
        self.origin_user_id,
        self.generation,
        self.outbreak_multiplier,
        self.region_multiplier,
        self.mutation_boost,
        self.variant_chain_bonus,
        self.final_score,
        self.infection_method,
        self.infection_event_id,
        self.lat,
        self.lng,
        self.created_at,
      ],
    )?;
    Ok(())
  }

  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      tag_id:             decode_uuid(&self.tag_id)?,
      tagger_id:          decode_uuid(&self.tagger_id)?,
      target_id:          decode_uuid(&self.target_id)?,
      strain_id:          decode_uuid(&self.strain_id)?,
      variant_id:         decode_opt_uuid(self.variant_id)?,
      parent_tag_id:      decode_opt_uuid(self.parent_tag_id)?,
      root_user_id:       decode_uuid(&self.root_user_id)?,
      origin_user_id:     decode_uuid(&self.origin_user_id)?,
      generation:         self.generation,
      snapshot:           ScoreSnapshot {
        outbreak_multiplier: self.outbreak_multiplier,
        region_multiplier:   self.region_multiplier,
        mutation_boost:      self.mutation_boost,
        variant_chain_bonus: self.variant_chain_bonus,
        final_score:         self.final_score,
      },
      infection_method:   self
        .infection_method
        .as_deref()
        .map(decode_method)
        .transpose()?,
      infection_event_id: decode_opt_uuid(self.infection_event_id)?,
      location:           decode_point(self.lat, self.lng),
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

// ─── Carried tags ────────────────────────────────────────────────────────────

pub struct RawUserTag {
  pub user_id:          String,
  pub tag_id:           String,
  pub origin_user_id:   String,
  pub generation_depth: u32,
  pub created_at:       String,
}

impl RawUserTag {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      tag_id:           row.get(1)?,
      origin_user_id:   row.get(2)?,
      generation_depth: row.get(3)?,
      created_at:       row.get(4)?,
    })
  }

  pub fn into_user_tag(self) -> Result<UserTag> {
    Ok(UserTag {
      user_id:          decode_uuid(&self.user_id)?,
      tag_id:           decode_uuid(&self.tag_id)?,
      origin_user_id:   decode_uuid(&self.origin_user_id)?,
      generation_depth: self.generation_depth,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

// ─── Variants, mutations, zones, drops ───────────────────────────────────────

pub struct RawVariant {
  pub variant_id: String,
  pub name:       String,
  pub rarity:     u8,
  pub rules:      String,
}

impl RawVariant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variant_id: row.get(0)?,
      name:       row.get(1)?,
      rarity:     row.get(2)?,
      rules:      row.get(3)?,
    })
  }

  pub fn into_variant(self) -> Result<Variant> {
    let rules: VariantRules = serde_json::from_str(&self.rules)?;
    Ok(Variant {
      variant_id: decode_uuid(&self.variant_id)?,
      name: self.name,
      rarity: self.rarity,
      rules,
    })
  }
}

pub struct RawMutationNode {
  pub node_id: String,
  pub name:    String,
  pub boost:   String,
}

impl RawMutationNode {
  pub fn into_node(self) -> Result<MutationNode> {
    let boost: MutationBoost = serde_json::from_str(&self.boost)?;
    Ok(MutationNode {
      node_id: decode_uuid(&self.node_id)?,
      name: self.name,
      boost,
    })
  }
}

pub struct RawZone {
  pub zone_id:    String,
  pub region_id:  String,
  pub zone_type:  String,
  pub lat:        f64,
  pub lng:        f64,
  pub radius_m:   f64,
  pub multiplier: f64,
}

impl RawZone {
  pub fn into_zone(self) -> Result<OutbreakZone> {
    Ok(OutbreakZone {
      zone_id:    decode_uuid(&self.zone_id)?,
      region_id:  self.region_id,
      zone_type:  self.zone_type,
      center:     GeoPoint { lat: self.lat, lng: self.lng },
      radius_m:   self.radius_m,
      multiplier: self.multiplier,
    })
  }
}

pub struct RawTagDrop {
  pub drop_id:    String,
  pub creator_id: String,
  pub lat:        f64,
  pub lng:        f64,
  pub expires_at: String,
  pub claimed_by: String,
}

impl RawTagDrop {
  pub fn into_drop(self) -> Result<TagDrop> {
    Ok(TagDrop {
      drop_id:    decode_uuid(&self.drop_id)?,
      creator_id: decode_uuid(&self.creator_id)?,
      location:   GeoPoint { lat: self.lat, lng: self.lng },
      expires_at: decode_dt(&self.expires_at)?,
      claimed_by: decode_ids(&self.claimed_by)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let whole = Utc.timestamp_opt(1_700_000_005, 0).unwrap();
    let frac = Utc.timestamp_opt(1_700_000_005, 123_000).unwrap();
    assert!(encode_dt(whole) < encode_dt(frac));
    assert_eq!(decode_dt(&encode_dt(frac)).unwrap(), frac);
  }

  #[test]
  fn unknown_method_is_an_error() {
    assert!(matches!(
      decode_method("telepathy"),
      Err(Error::UnknownValue { kind: "infection method", .. })
    ));
  }
}
