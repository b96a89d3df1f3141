//! [`SqliteStore`], the SQLite implementation of [`InfectionStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use strain_core::{
  geo::{distance_m, GeoPoint},
  mutation::MutationNode,
  outbreak::{NewOutbreakEvent, OutbreakEvent, TagDrop, ZoneHit},
  store::{CommittedInfection, InfectionCommit, InfectionStore},
  strain::Strain,
  tag::{InfectionEvent, NewTag, NewUserTag, Tag, UserTag},
  user::{NewUser, User},
  variant::Variant,
};

use crate::{
  encode::{
    decode_uuid, encode_dt, encode_ids, encode_method, encode_uuid, RawMutationNode,
    RawStrain, RawTag, RawTagDrop, RawUser, RawUserTag, RawVariant, RawZone,
    STRAIN_COLUMNS, TAG_COLUMNS, USER_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A strain game store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_strain(&self, strain_id: String) -> Result<Option<Strain>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STRAIN_COLUMNS} FROM strains WHERE strain_id = ?1"),
              rusqlite::params![strain_id],
              RawStrain::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawStrain::into_strain).transpose()
  }

  /// Run a tag query expected to yield at most one row.
  async fn query_tag(
    &self,
    where_clause: &'static str,
    id: String,
  ) -> Result<Option<Tag>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TAG_COLUMNS} FROM tags {where_clause}"),
              rusqlite::params![id],
              RawTag::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTag::into_tag).transpose()
  }
}

/// Outcome of the transactional part of a commit: the strain row, or the id
/// of whichever player was missing.
type CommitRows = std::result::Result<RawStrain, String>;

// ─── InfectionStore impl ─────────────────────────────────────────────────────

impl InfectionStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:            Uuid::new_v4(),
      username:           input.username,
      current_strain_id:  None,
      current_variant_id: input.current_variant_id,
      root_user_id:       None,
      parent_user_id:     None,
      generation:         0,
      tags_given:         0,
      tags_received:      0,
      direct_score:       0.0,
      indirect_score:     0.0,
      last_location:      input.last_location,
      created_at:         Utc::now(),
    };

    let id_str       = encode_uuid(user.user_id);
    let username     = user.username.clone();
    let variant_str  = user.current_variant_id.map(encode_uuid);
    let lat          = user.last_location.map(|p| p.lat);
    let lng          = user.last_location.map(|p| p.lng);
    let created_str  = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users
             (user_id, username, current_variant_id, last_lat, last_lng, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, username, variant_str, lat, lng, created_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn add_user_scores(
    &self,
    user_id: Uuid,
    direct: f64,
    indirect: f64,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET direct_score   = direct_score + ?2,
               indirect_score = indirect_score + ?3
           WHERE user_id = ?1",
          rusqlite::params![id_str, direct, indirect],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  // ── Strains ───────────────────────────────────────────────────────────

  async fn create_strain(&self, origin_user_id: Uuid) -> Result<Strain> {
    let strain = Strain {
      strain_id:           Uuid::new_v4(),
      origin_user_id,
      direct_infections:   0,
      indirect_infections: 0.0,
      total_infections:    0.0,
      depth:               0,
      mutation_points:     0,
      outbreak_count:      0,
      variant_chain_depth: 0,
      countries:           Vec::new(),
      created_at:          Utc::now(),
    };

    let strain_str  = encode_uuid(strain.strain_id);
    let origin_str  = encode_uuid(origin_user_id);
    let created_str = encode_dt(strain.created_at);

    let user_found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let found = tx.execute(
          "UPDATE users
           SET current_strain_id = ?1,
               root_user_id      = COALESCE(root_user_id, user_id)
           WHERE user_id = ?2",
          rusqlite::params![strain_str, origin_str],
        )?;
        if found == 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO strains (strain_id, origin_user_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![strain_str, origin_str, created_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !user_found {
      return Err(Error::UserNotFound(origin_user_id));
    }
    Ok(strain)
  }

  async fn get_strain(&self, id: Uuid) -> Result<Option<Strain>> {
    self.query_strain(encode_uuid(id)).await
  }

  async fn add_strain_score(
    &self,
    strain_id: Uuid,
    contribution: f64,
  ) -> Result<Option<f64>> {
    let id_str = encode_uuid(strain_id);
    let total = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE strains
               SET indirect_infections = indirect_infections + ?2,
                   total_infections    = total_infections + ?2
               WHERE strain_id = ?1
               RETURNING total_infections",
              rusqlite::params![id_str, contribution],
              |r| r.get::<_, f64>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(total)
  }

  async fn award_mutation_points(
    &self,
    strain_id: Uuid,
    points: u32,
    reason: &'static str,
  ) -> Result<()> {
    let award_str   = encode_uuid(Uuid::new_v4());
    let strain_str  = encode_uuid(strain_id);
    let created_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO mutation_point_awards
             (award_id, strain_id, points, reason, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![award_str, strain_str, points, reason, created_str],
        )?;
        tx.execute(
          "UPDATE strains SET mutation_points = mutation_points + ?2
           WHERE strain_id = ?1",
          rusqlite::params![strain_str, points],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_variant_chain_depth(
    &self,
    strain_id: Uuid,
    depth: u32,
  ) -> Result<()> {
    let id_str = encode_uuid(strain_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE strains SET variant_chain_depth = MAX(variant_chain_depth, ?2)
           WHERE strain_id = ?1",
          rusqlite::params![id_str, depth],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_recent_strain_tags(
    &self,
    strain_id: Uuid,
    since: DateTime<Utc>,
  ) -> Result<u32> {
    let id_str    = encode_uuid(strain_id);
    let since_str = encode_dt(since);
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM tags
           WHERE strain_id = ?1
             AND infection_method IS NOT NULL
             AND created_at >= ?2",
          rusqlite::params![id_str, since_str],
          |r| r.get::<_, u32>(0),
        )?)
      })
      .await?;
    Ok(count)
  }

  async fn count_variant_chain(
    &self,
    strain_id: Uuid,
    variant_id: Uuid,
    cap: u32,
  ) -> Result<u32> {
    let strain_str  = encode_uuid(strain_id);
    let variant_str = encode_uuid(variant_id);
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM (
             SELECT 1 FROM tags
             WHERE strain_id = ?1 AND variant_id = ?2
             ORDER BY generation DESC
             LIMIT ?3
           )",
          rusqlite::params![strain_str, variant_str, cap],
          |r| r.get::<_, u32>(0),
        )?)
      })
      .await?;
    Ok(count)
  }

  // ── Outbreaks ─────────────────────────────────────────────────────────

  async fn detect_outbreak_zones(
    &self,
    point: GeoPoint,
    radius_m: f64,
  ) -> Result<Vec<ZoneHit>> {
    let raws: Vec<RawZone> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT zone_id, region_id, zone_type, lat, lng, radius_m, multiplier
           FROM outbreak_zones",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawZone {
              zone_id:    r.get(0)?,
              region_id:  r.get(1)?,
              zone_type:  r.get(2)?,
              lat:        r.get(3)?,
              lng:        r.get(4)?,
              radius_m:   r.get(5)?,
              multiplier: r.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut zones = raws
      .into_iter()
      .map(RawZone::into_zone)
      .collect::<Result<Vec<_>>>()?;
    // The point must lie inside the zone itself, not merely near its centre.
    zones.retain(|z| distance_m(point, z.center) <= z.radius_m.min(radius_m));
    zones.sort_by(|a, b| b.multiplier.total_cmp(&a.multiplier));

    Ok(
      zones
        .into_iter()
        .map(|z| ZoneHit {
          zone_type:  z.zone_type,
          multiplier: z.multiplier,
          region_id:  z.region_id,
        })
        .collect(),
    )
  }

  async fn region_modifier<'a>(&'a self, region_id: &'a str) -> Result<Option<f64>> {
    let region = region_id.to_owned();
    let multiplier = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT multiplier FROM region_modifiers WHERE region_id = ?1",
              rusqlite::params![region],
              |r| r.get::<_, f64>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(multiplier)
  }

  async fn create_outbreak_event(
    &self,
    input: NewOutbreakEvent,
  ) -> Result<OutbreakEvent> {
    let event = OutbreakEvent {
      outbreak_id: Uuid::new_v4(),
      details:     input,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(event.outbreak_id);
    let region      = event.details.region_id.clone();
    let strain_str  = encode_uuid(event.details.strain_id);
    let user_str    = encode_uuid(event.details.user_id);
    let multiplier  = event.details.multiplier;
    let zone_type   = event.details.zone_type.clone();
    let lat         = event.details.location.lat;
    let lng         = event.details.location.lng;
    let tag_count   = event.details.tag_count;
    let created_str = encode_dt(event.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO outbreak_events
             (outbreak_id, region_id, strain_id, user_id, multiplier, zone_type,
              lat, lng, tag_count, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str, region, strain_str, user_str, multiplier, zone_type, lat, lng,
            tag_count, created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn increment_outbreak_count(&self, strain_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(strain_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE strains SET outbreak_count = outbreak_count + 1
           WHERE strain_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_tag_drop(&self, id: Uuid) -> Result<Option<TagDrop>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT drop_id, creator_id, lat, lng, expires_at, claimed_by
               FROM tag_drops WHERE drop_id = ?1",
              rusqlite::params![id_str],
              |r| {
                Ok(RawTagDrop {
                  drop_id:    r.get(0)?,
                  creator_id: r.get(1)?,
                  lat:        r.get(2)?,
                  lng:        r.get(3)?,
                  expires_at: r.get(4)?,
                  claimed_by: r.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTagDrop::into_drop).transpose()
  }

  // ── Tags ──────────────────────────────────────────────────────────────

  async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>> {
    self.query_tag("WHERE tag_id = ?1", encode_uuid(id)).await
  }

  async fn find_root_tag(&self, user_id: Uuid) -> Result<Option<Tag>> {
    self
      .query_tag(
        "WHERE origin_user_id = ?1 AND tagger_id = ?1 AND target_id = ?1
           AND parent_tag_id IS NULL
         ORDER BY created_at, rowid
         LIMIT 1",
        encode_uuid(user_id),
      )
      .await
  }

  async fn latest_inbound_tag(&self, user_id: Uuid) -> Result<Option<Tag>> {
    self
      .query_tag(
        "WHERE target_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
        encode_uuid(user_id),
      )
      .await
  }

  async fn insert_tag(&self, input: NewTag) -> Result<Tag> {
    let tag = input.into_tag(Utc::now());
    let raw = RawTag::from_tag(&tag);
    self.conn.call(move |conn| Ok(raw.insert(conn)?)).await?;
    Ok(tag)
  }

  async fn commit_infection(
    &self,
    commit: InfectionCommit,
  ) -> Result<CommittedInfection> {
    let now = Utc::now();
    let event_id = Uuid::new_v4();

    let tags: Vec<Tag> = (0..commit.tag_count)
      .map(|_| {
        let mut tag = commit.tag.clone().into_tag(now);
        tag.infection_event_id = Some(event_id);
        tag
      })
      .collect();

    let event = InfectionEvent {
      event_id,
      infector_id: commit.infector_id,
      infected_id: commit.infected_id,
      tag_ids: tags.iter().map(|t| t.tag_id).collect(),
      method: commit.method,
      location: commit.location,
      tier: 0,
      created_at: now,
    };

    let raw_tags: Vec<RawTag> = tags.iter().map(RawTag::from_tag).collect();
    let event_str     = encode_uuid(event_id);
    let infector_str  = encode_uuid(commit.infector_id);
    let infected_str  = encode_uuid(commit.infected_id);
    let tag_ids_str   = encode_ids(&event.tag_ids)?;
    let method_str    = encode_method(commit.method);
    let lat           = commit.location.lat;
    let lng           = commit.location.lng;
    let now_str       = encode_dt(now);
    let strain_str    = encode_uuid(commit.tag.strain_id);
    let root_str      = encode_uuid(commit.infected_root_user_id);
    let generation    = commit.tag.generation;
    let tag_count     = commit.tag_count;
    let enhanced      = commit.enhanced_score;
    let drop_str      = commit.claim_drop.map(encode_uuid);

    let rows: CommitRows = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO infection_events
             (event_id, infector_id, infected_id, tag_ids, method, lat, lng, tier,
              created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
          rusqlite::params![
            event_str, infector_str, infected_str, tag_ids_str, method_str, lat,
            lng, now_str,
          ],
        )?;

        for raw in &raw_tags {
          raw.insert(&tx)?;
        }

        let infected = tx.execute(
          "UPDATE users
           SET parent_user_id    = ?2,
               root_user_id      = ?3,
               generation        = ?4,
               current_strain_id = ?5,
               tags_received     = tags_received + ?6,
               last_lat          = ?7,
               last_lng          = ?8
           WHERE user_id = ?1",
          rusqlite::params![
            infected_str, infector_str, root_str, generation, strain_str, tag_count,
            lat, lng,
          ],
        )?;
        if infected == 0 {
          return Ok(Err(infected_str));
        }

        let infector = tx.execute(
          "UPDATE users
           SET tags_given = tags_given + ?2,
               last_lat   = ?3,
               last_lng   = ?4
           WHERE user_id = ?1",
          rusqlite::params![infector_str, tag_count, lat, lng],
        )?;
        if infector == 0 {
          return Ok(Err(infector_str));
        }

        tx.execute(
          "UPDATE strains
           SET direct_infections = direct_infections + ?2,
               total_infections  = total_infections + ?3,
               depth             = MAX(depth, ?4)
           WHERE strain_id = ?1",
          rusqlite::params![strain_str, tag_count, enhanced, generation],
        )?;

        if let Some(drop_str) = drop_str {
          tx.execute(
            "UPDATE tag_drops SET claimed_by = json_insert(claimed_by, '$[#]', ?2)
             WHERE drop_id = ?1",
            rusqlite::params![drop_str, infected_str],
          )?;
        }

        let strain = tx.query_row(
          &format!("SELECT {STRAIN_COLUMNS} FROM strains WHERE strain_id = ?1"),
          rusqlite::params![strain_str],
          RawStrain::from_row,
        )?;

        tx.commit()?;
        Ok(Ok(strain))
      })
      .await?;

    let strain = match rows {
      Ok(raw) => raw.into_strain()?,
      Err(missing) => return Err(Error::UserNotFound(decode_uuid(&missing)?)),
    };

    Ok(CommittedInfection { event, tags, strain })
  }

  // ── Carried tags ──────────────────────────────────────────────────────

  async fn list_user_tags(&self, user_id: Uuid) -> Result<Vec<UserTag>> {
    let id_str = encode_uuid(user_id);
    let raws: Vec<RawUserTag> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, tag_id, origin_user_id, generation_depth, created_at
           FROM user_tags WHERE user_id = ?1
           ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawUserTag::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUserTag::into_user_tag).collect()
  }

  async fn insert_user_tags(&self, input: Vec<NewUserTag>) -> Result<Vec<UserTag>> {
    if input.is_empty() {
      return Ok(Vec::new());
    }

    let now = Utc::now();
    let now_str = encode_dt(now);
    let rows: Vec<(String, String, String, u32)> = input
      .iter()
      .map(|t| {
        (
          encode_uuid(t.user_id),
          encode_uuid(t.tag_id),
          encode_uuid(t.origin_user_id),
          t.generation_depth,
        )
      })
      .collect();

    let inserted: Vec<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO user_tags
               (user_id, tag_id, origin_user_id, generation_depth, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for (user, tag, origin, depth) in &rows {
            let n = stmt.execute(rusqlite::params![user, tag, origin, depth, now_str])?;
            inserted.push(n > 0);
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(
      input
        .into_iter()
        .zip(inserted)
        .filter(|(_, fresh)| *fresh)
        .map(|(t, _)| UserTag {
          user_id:          t.user_id,
          tag_id:           t.tag_id,
          origin_user_id:   t.origin_user_id,
          generation_depth: t.generation_depth,
          created_at:       now,
        })
        .collect(),
    )
  }

  // ── Variants and mutations ────────────────────────────────────────────

  async fn get_variant(&self, id: Uuid) -> Result<Option<Variant>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT variant_id, name, rarity, rules FROM variants
               WHERE variant_id = ?1",
              rusqlite::params![id_str],
              RawVariant::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawVariant::into_variant).transpose()
  }

  async fn list_variants(&self) -> Result<Vec<Variant>> {
    let raws: Vec<RawVariant> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT variant_id, name, rarity, rules FROM variants
           ORDER BY rarity, name",
        )?;
        let rows = stmt
          .query_map([], RawVariant::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVariant::into_variant).collect()
  }

  async fn unlocked_variant_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
    let id_str = encode_uuid(user_id);
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT variant_id FROM user_variants WHERE user_id = ?1
           ORDER BY unlocked_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn unlock_variant(&self, user_id: Uuid, variant_id: Uuid) -> Result<bool> {
    let user_str    = encode_uuid(user_id);
    let variant_str = encode_uuid(variant_id);
    let now_str     = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO user_variants (user_id, variant_id, unlocked_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![user_str, variant_str, now_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn unlocked_mutations(&self, user_id: Uuid) -> Result<Vec<MutationNode>> {
    let id_str = encode_uuid(user_id);
    let raws: Vec<RawMutationNode> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT n.node_id, n.name, n.boost
           FROM user_mutation_unlocks u
           JOIN mutation_nodes n ON n.node_id = u.node_id
           WHERE u.user_id = ?1
           ORDER BY u.unlocked_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| {
            Ok(RawMutationNode {
              node_id: r.get(0)?,
              name:    r.get(1)?,
              boost:   r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMutationNode::into_node).collect()
  }
}
