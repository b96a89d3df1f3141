//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use strain_core::{
  geo::GeoPoint,
  method::InfectionMethod,
  mutation::MutationBoost,
  outbreak::NewOutbreakEvent,
  store::{InfectionCommit, InfectionStore},
  tag::{NewTag, NewUserTag, ScoreSnapshot},
  user::NewUser,
  variant::VariantRules,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn here() -> GeoPoint { GeoPoint::new(51.5007, -0.1246) }

fn commit_for(
  infector: Uuid,
  infected: Uuid,
  strain_id: Uuid,
  parent: Uuid,
  tag_count: u32,
) -> InfectionCommit {
  InfectionCommit {
    tag: NewTag {
      tagger_id: infector,
      target_id: infected,
      strain_id,
      variant_id: None,
      parent_tag_id: Some(parent),
      root_user_id: infector,
      origin_user_id: infector,
      generation: 1,
      snapshot: ScoreSnapshot::default(),
      infection_method: Some(InfectionMethod::Direct),
      location: Some(here()),
    },
    tag_count,
    infector_id: infector,
    infected_id: infected,
    method: InfectionMethod::Direct,
    location: here(),
    infected_root_user_id: infector,
    enhanced_score: f64::from(tag_count),
    claim_drop: None,
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;

  let user = s.create_user(NewUser::new("alice").at(here())).await.unwrap();
  assert_eq!(user.username, "alice");
  assert_eq!(user.generation, 0);

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, user.user_id);
  assert_eq!(fetched.last_location, Some(here()));
  assert!(fetched.current_strain_id.is_none());
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn add_user_scores_accumulates() {
  let s = store().await;
  let user = s.create_user(NewUser::new("alice")).await.unwrap();

  s.add_user_scores(user.user_id, 1.0, 0.5).await.unwrap();
  s.add_user_scores(user.user_id, 2.0, 0.25).await.unwrap();

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.direct_score, 3.0);
  assert_eq!(fetched.indirect_score, 0.75);
}

#[tokio::test]
async fn add_user_scores_missing_user_errors() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let result = s.add_user_scores(missing, 1.0, 1.0).await;
  assert!(matches!(result, Err(Error::UserNotFound(id)) if id == missing));
}

// ─── Strains ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_strain_becomes_current() {
  let s = store().await;
  let user = s.create_user(NewUser::new("alice")).await.unwrap();

  let strain = s.create_strain(user.user_id).await.unwrap();
  assert_eq!(strain.origin_user_id, user.user_id);
  assert_eq!(strain.total_infections, 0.0);

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.current_strain_id, Some(strain.strain_id));
  assert_eq!(fetched.root_user_id, Some(user.user_id));
}

#[tokio::test]
async fn create_strain_for_missing_user_errors() {
  let s = store().await;
  let result = s.create_strain(Uuid::new_v4()).await;
  assert!(matches!(result, Err(Error::UserNotFound(_))));
}

#[tokio::test]
async fn add_strain_score_returns_new_total() {
  let s = store().await;
  let user = s.create_user(NewUser::new("alice")).await.unwrap();
  let strain = s.create_strain(user.user_id).await.unwrap();

  assert_eq!(s.add_strain_score(strain.strain_id, 2.5).await.unwrap(), Some(2.5));
  assert_eq!(s.add_strain_score(strain.strain_id, 0.5).await.unwrap(), Some(3.0));
  assert_eq!(s.add_strain_score(Uuid::new_v4(), 1.0).await.unwrap(), None);

  let fetched = s.get_strain(strain.strain_id).await.unwrap().unwrap();
  assert_eq!(fetched.indirect_infections, 3.0);
  assert_eq!(fetched.total_infections, 3.0);
}

#[tokio::test]
async fn mutation_points_and_chain_depth() {
  let s = store().await;
  let user = s.create_user(NewUser::new("alice")).await.unwrap();
  let strain = s.create_strain(user.user_id).await.unwrap();

  s.award_mutation_points(strain.strain_id, 5, "infection_milestone").await.unwrap();
  s.award_mutation_points(strain.strain_id, 2, "infection_milestone").await.unwrap();
  s.update_variant_chain_depth(strain.strain_id, 4).await.unwrap();
  s.update_variant_chain_depth(strain.strain_id, 2).await.unwrap();
  s.increment_outbreak_count(strain.strain_id).await.unwrap();

  let fetched = s.get_strain(strain.strain_id).await.unwrap().unwrap();
  assert_eq!(fetched.mutation_points, 7);
  assert_eq!(fetched.variant_chain_depth, 4);
  assert_eq!(fetched.outbreak_count, 1);
}

// ─── Tags ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_tag_lookup() {
  let s = store().await;
  let user = s.create_user(NewUser::new("alice")).await.unwrap();
  let strain = s.create_strain(user.user_id).await.unwrap();

  assert!(s.find_root_tag(user.user_id).await.unwrap().is_none());

  let root = s
    .insert_tag(NewTag::root(user.user_id, strain.strain_id))
    .await
    .unwrap();
  assert!(root.is_root());
  assert!(root.infection_method.is_none());

  let found = s.find_root_tag(user.user_id).await.unwrap().unwrap();
  assert_eq!(found.tag_id, root.tag_id);
  assert_eq!(found.generation, 0);

  let inbound = s.latest_inbound_tag(user.user_id).await.unwrap().unwrap();
  assert_eq!(inbound.tag_id, root.tag_id);
}

#[tokio::test]
async fn commit_infection_writes_everything() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let b = s.create_user(NewUser::new("bob")).await.unwrap();
  let strain = s.create_strain(a.user_id).await.unwrap();
  let root = s
    .insert_tag(NewTag::root(a.user_id, strain.strain_id))
    .await
    .unwrap();

  let committed = s
    .commit_infection(commit_for(a.user_id, b.user_id, strain.strain_id, root.tag_id, 3))
    .await
    .unwrap();

  assert_eq!(committed.tags.len(), 3);
  assert_eq!(committed.event.tag_ids.len(), 3);
  for tag in &committed.tags {
    let stored = s.get_tag(tag.tag_id).await.unwrap().unwrap();
    assert_eq!(stored.infection_event_id, Some(committed.event.event_id));
    assert_eq!(stored.parent_tag_id, Some(root.tag_id));
    assert_eq!(stored.infection_method, Some(InfectionMethod::Direct));
  }

  assert_eq!(committed.strain.direct_infections, 3);
  assert_eq!(committed.strain.total_infections, 3.0);
  assert_eq!(committed.strain.depth, 1);

  let infected = s.get_user(b.user_id).await.unwrap().unwrap();
  assert_eq!(infected.parent_user_id, Some(a.user_id));
  assert_eq!(infected.root_user_id, Some(a.user_id));
  assert_eq!(infected.generation, 1);
  assert_eq!(infected.current_strain_id, Some(strain.strain_id));
  assert_eq!(infected.tags_received, 3);

  let infector = s.get_user(a.user_id).await.unwrap().unwrap();
  assert_eq!(infector.tags_given, 3);
  assert_eq!(infector.last_location, Some(here()));

  let since = Utc::now() - Duration::minutes(5);
  assert_eq!(s.count_recent_strain_tags(strain.strain_id, since).await.unwrap(), 3);
}

#[tokio::test]
async fn commit_infection_rolls_back_for_missing_user() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let strain = s.create_strain(a.user_id).await.unwrap();
  let root = s
    .insert_tag(NewTag::root(a.user_id, strain.strain_id))
    .await
    .unwrap();
  let missing = Uuid::new_v4();

  let result = s
    .commit_infection(commit_for(a.user_id, missing, strain.strain_id, root.tag_id, 2))
    .await;
  assert!(matches!(result, Err(Error::UserNotFound(id)) if id == missing));

  let since = Utc::now() - Duration::minutes(5);
  assert_eq!(s.count_recent_strain_tags(strain.strain_id, since).await.unwrap(), 0);
  let infector = s.get_user(a.user_id).await.unwrap().unwrap();
  assert_eq!(infector.tags_given, 0);
}

#[tokio::test]
async fn latest_inbound_tag_prefers_newest() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let b = s.create_user(NewUser::new("bob")).await.unwrap();
  let strain = s.create_strain(a.user_id).await.unwrap();
  let root = s
    .insert_tag(NewTag::root(b.user_id, strain.strain_id))
    .await
    .unwrap();

  let committed = s
    .commit_infection(commit_for(a.user_id, b.user_id, strain.strain_id, root.tag_id, 1))
    .await
    .unwrap();

  let latest = s.latest_inbound_tag(b.user_id).await.unwrap().unwrap();
  assert_eq!(latest.tag_id, committed.tags[0].tag_id);
}

#[tokio::test]
async fn variant_chain_count_is_capped() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let strain = s.create_strain(a.user_id).await.unwrap();
  let variant = s.insert_variant("glow", 2, VariantRules::default()).await.unwrap();

  for _ in 0..4 {
    let mut tag = NewTag::root(a.user_id, strain.strain_id);
    tag.variant_id = Some(variant.variant_id);
    s.insert_tag(tag).await.unwrap();
  }

  let (sid, vid) = (strain.strain_id, variant.variant_id);
  assert_eq!(s.count_variant_chain(sid, vid, 10).await.unwrap(), 4);
  assert_eq!(s.count_variant_chain(sid, vid, 3).await.unwrap(), 3);
}

// ─── Carried tags ────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_user_tags_skips_existing() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let strain = s.create_strain(a.user_id).await.unwrap();
  let root = s
    .insert_tag(NewTag::root(a.user_id, strain.strain_id))
    .await
    .unwrap();

  let membership = NewUserTag {
    user_id:          a.user_id,
    tag_id:           root.tag_id,
    origin_user_id:   a.user_id,
    generation_depth: 0,
  };

  let first = s.insert_user_tags(vec![membership.clone()]).await.unwrap();
  assert_eq!(first.len(), 1);

  let second = s.insert_user_tags(vec![membership]).await.unwrap();
  assert!(second.is_empty());

  let carried = s.list_user_tags(a.user_id).await.unwrap();
  assert_eq!(carried.len(), 1);
  assert_eq!(carried[0].generation_depth, 0);
}

// ─── Variants, mutations, zones, drops ───────────────────────────────────────

#[tokio::test]
async fn variants_and_unlocks() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let rules = VariantRules { tag_limit: Some(3), ..VariantRules::default() };
  let variant = s.insert_variant("spark", 3, rules.clone()).await.unwrap();

  let fetched = s.get_variant(variant.variant_id).await.unwrap().unwrap();
  assert_eq!(fetched.rules, rules);
  assert_eq!(s.list_variants().await.unwrap().len(), 1);

  assert!(s.unlock_variant(a.user_id, variant.variant_id).await.unwrap());
  assert!(!s.unlock_variant(a.user_id, variant.variant_id).await.unwrap());
  assert_eq!(
    s.unlocked_variant_ids(a.user_id).await.unwrap(),
    vec![variant.variant_id]
  );
}

#[tokio::test]
async fn unlocked_mutations_join_nodes() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let boost = MutationBoost { spread_multiplier: Some(1.5), radius_boost: None };
  let node = s.insert_mutation_node("airborne", boost.clone()).await.unwrap();
  s.insert_mutation_node("unused", MutationBoost::default()).await.unwrap();

  s.unlock_mutation(a.user_id, node.node_id).await.unwrap();
  s.unlock_mutation(a.user_id, node.node_id).await.unwrap();

  let nodes = s.unlocked_mutations(a.user_id).await.unwrap();
  assert_eq!(nodes.len(), 1);
  assert_eq!(nodes[0].boost, boost);
}

#[tokio::test]
async fn zone_detection_orders_by_multiplier() {
  let s = store().await;
  s.insert_outbreak_zone("westminster", "city", here(), 500.0, 2.0).await.unwrap();
  s.insert_outbreak_zone("westminster", "stadium", here(), 200.0, 6.0).await.unwrap();
  s.insert_outbreak_zone("paris", "city", GeoPoint::new(48.8566, 2.3522), 500.0, 9.0)
    .await
    .unwrap();

  let hits = s.detect_outbreak_zones(here(), 1000.0).await.unwrap();
  assert_eq!(hits.len(), 2);
  assert_eq!(hits[0].zone_type, "stadium");
  assert_eq!(hits[0].multiplier, 6.0);
  assert_eq!(hits[1].zone_type, "city");
}

#[tokio::test]
async fn zone_detection_requires_point_inside_zone() {
  let s = store().await;
  // Both centres sit roughly 800 m north of `here()`.
  let north = GeoPoint::new(here().lat + 0.0072, here().lng);
  s.insert_outbreak_zone("westminster", "stadium", north, 200.0, 6.0).await.unwrap();
  s.insert_outbreak_zone("westminster", "district", north, 2500.0, 1.5).await.unwrap();

  let hits = s.detect_outbreak_zones(here(), 1000.0).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].zone_type, "district");

  assert!(s.detect_outbreak_zones(here(), 500.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn region_modifier_upserts() {
  let s = store().await;
  assert_eq!(s.region_modifier("westminster").await.unwrap(), None);

  s.set_region_modifier("westminster", 1.5).await.unwrap();
  s.set_region_modifier("westminster", 2.0).await.unwrap();
  assert_eq!(s.region_modifier("westminster").await.unwrap(), Some(2.0));
}

#[tokio::test]
async fn outbreak_event_round_trip_fields() {
  let s = store().await;
  let strain_id = Uuid::new_v4();
  let user_id = Uuid::new_v4();

  let event = s
    .create_outbreak_event(NewOutbreakEvent {
      region_id: "westminster".into(),
      strain_id,
      user_id,
      multiplier: 6.0,
      zone_type: "stadium".into(),
      location: here(),
      tag_count: 5,
    })
    .await
    .unwrap();
  assert_eq!(event.details.strain_id, strain_id);
  assert_eq!(event.details.tag_count, 5);
}

#[tokio::test]
async fn tag_drop_claim_is_recorded_by_commit() {
  let s = store().await;
  let a = s.create_user(NewUser::new("alice")).await.unwrap();
  let b = s.create_user(NewUser::new("bob")).await.unwrap();
  let strain = s.create_strain(a.user_id).await.unwrap();
  let root = s
    .insert_tag(NewTag::root(a.user_id, strain.strain_id))
    .await
    .unwrap();
  let drop = s
    .insert_tag_drop(a.user_id, here(), Utc::now() + Duration::hours(1))
    .await
    .unwrap();

  let mut commit = commit_for(a.user_id, b.user_id, strain.strain_id, root.tag_id, 1);
  commit.method = InfectionMethod::TagDrop;
  commit.claim_drop = Some(drop.drop_id);
  s.commit_infection(commit).await.unwrap();

  let fetched = s.get_tag_drop(drop.drop_id).await.unwrap().unwrap();
  assert!(fetched.is_claimed_by(b.user_id));
  assert!(!fetched.is_claimed_by(a.user_id));
}
