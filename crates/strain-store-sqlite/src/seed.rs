//! Administrative writes for game content the engine only reads: variants,
//! mutation nodes, outbreak zones, region modifiers and tag drops.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use strain_core::{
  geo::GeoPoint,
  mutation::{MutationBoost, MutationNode},
  outbreak::{OutbreakZone, TagDrop},
  variant::{Variant, VariantRules},
};

use crate::{
  encode::{encode_dt, encode_uuid},
  store::SqliteStore,
  Error, Result,
};

impl SqliteStore {
  pub async fn insert_variant(
    &self,
    name: impl Into<String>,
    rarity: u8,
    rules: VariantRules,
  ) -> Result<Variant> {
    let variant = Variant {
      variant_id: Uuid::new_v4(),
      name: name.into(),
      rarity,
      rules,
    };

    let id_str    = encode_uuid(variant.variant_id);
    let name      = variant.name.clone();
    let rules_str = serde_json::to_string(&variant.rules)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO variants (variant_id, name, rarity, rules)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, rarity, rules_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(variant)
  }

  /// Set (or clear) the variant a player infects with by default.
  pub async fn set_current_variant(
    &self,
    user_id: Uuid,
    variant_id: Option<Uuid>,
  ) -> Result<()> {
    let user_str    = encode_uuid(user_id);
    let variant_str = variant_id.map(encode_uuid);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET current_variant_id = ?2 WHERE user_id = ?1",
          rusqlite::params![user_str, variant_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  pub async fn insert_mutation_node(
    &self,
    name: impl Into<String>,
    boost: MutationBoost,
  ) -> Result<MutationNode> {
    let node = MutationNode { node_id: Uuid::new_v4(), name: name.into(), boost };

    let id_str    = encode_uuid(node.node_id);
    let name      = node.name.clone();
    let boost_str = serde_json::to_string(&node.boost)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO mutation_nodes (node_id, name, boost) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, boost_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(node)
  }

  /// Grant a mutation node to a player. Re-granting is a no-op.
  pub async fn unlock_mutation(&self, user_id: Uuid, node_id: Uuid) -> Result<()> {
    let user_str = encode_uuid(user_id);
    let node_str = encode_uuid(node_id);
    let now_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO user_mutation_unlocks (user_id, node_id, unlocked_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![user_str, node_str, now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_outbreak_zone(
    &self,
    region_id: impl Into<String>,
    zone_type: impl Into<String>,
    center: GeoPoint,
    radius_m: f64,
    multiplier: f64,
  ) -> Result<OutbreakZone> {
    let zone = OutbreakZone {
      zone_id: Uuid::new_v4(),
      region_id: region_id.into(),
      zone_type: zone_type.into(),
      center,
      radius_m,
      multiplier,
    };

    let id_str    = encode_uuid(zone.zone_id);
    let region    = zone.region_id.clone();
    let zone_type = zone.zone_type.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO outbreak_zones
             (zone_id, region_id, zone_type, lat, lng, radius_m, multiplier)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, region, zone_type, center.lat, center.lng, radius_m, multiplier,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(zone)
  }

  /// Insert or replace the multiplier for a region.
  pub async fn set_region_modifier(
    &self,
    region_id: impl Into<String>,
    multiplier: f64,
  ) -> Result<()> {
    let region = region_id.into();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO region_modifiers (region_id, multiplier) VALUES (?1, ?2)
           ON CONFLICT (region_id) DO UPDATE SET multiplier = excluded.multiplier",
          rusqlite::params![region, multiplier],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_tag_drop(
    &self,
    creator_id: Uuid,
    location: GeoPoint,
    expires_at: DateTime<Utc>,
  ) -> Result<TagDrop> {
    let drop = TagDrop {
      drop_id: Uuid::new_v4(),
      creator_id,
      location,
      expires_at,
      claimed_by: Vec::new(),
    };

    let id_str      = encode_uuid(drop.drop_id);
    let creator_str = encode_uuid(creator_id);
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tag_drops (drop_id, creator_id, lat, lng, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, creator_str, location.lat, location.lng, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(drop)
  }
}
