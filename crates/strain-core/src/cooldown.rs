//! The cooldown/leaderboard key-value store and an in-process implementation.
//!
//! The engine treats this store as optional: when it is absent or failing,
//! cooldowns are not enforced and leaderboard pushes are skipped.

use std::{
  convert::Infallible,
  future::Future,
  time::{Duration, Instant},
};

use moka::{Expiry, future::Cache};

/// Redis-shaped key-value operations with TTLs and sorted sets.
pub trait CooldownStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set_ex<'a>(
    &'a self,
    key: &'a str,
    ttl: Duration,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Set `key` only if it is absent (or expired). Returns `true` if this call
  /// set it. Must be atomic with respect to concurrent callers.
  fn set_nx_ex<'a>(
    &'a self,
    key: &'a str,
    ttl: Duration,
    value: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn zadd<'a>(
    &'a self,
    key: &'a str,
    score: f64,
    member: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn zscore<'a>(
    &'a self,
    key: &'a str,
    member: &'a str,
  ) -> impl Future<Output = Result<Option<f64>, Self::Error>> + Send + 'a;
}

// ─── In-memory implementation ────────────────────────────────────────────────

#[derive(Clone)]
struct Held {
  value: String,
  ttl:   Duration,
}

/// Each key lives for the TTL it was last written with.
struct WriteTtl;

impl Expiry<String, Held> for WriteTtl {
  fn expire_after_create(
    &self,
    _key: &String,
    held: &Held,
    _created_at: Instant,
  ) -> Option<Duration> {
    Some(held.ttl)
  }

  fn expire_after_update(
    &self,
    _key: &String,
    held: &Held,
    _updated_at: Instant,
    _remaining: Option<Duration>,
  ) -> Option<Duration> {
    Some(held.ttl)
  }
}

/// A process-local cooldown store backed by [`moka`]. Suitable for a single
/// engine instance and for tests. Expired keys are evicted by the cache's
/// housekeeping, not only when they are read again.
pub struct MemoryCooldownStore {
  values: Cache<String, Held>,
  /// Sorted-set members keyed by `(set, member)`.
  scores: Cache<(String, String), f64>,
}

impl MemoryCooldownStore {
  pub fn new() -> Self {
    Self {
      values: Cache::builder().expire_after(WriteTtl).build(),
      scores: Cache::builder().build(),
    }
  }
}

impl Default for MemoryCooldownStore {
  fn default() -> Self { Self::new() }
}

impl CooldownStore for MemoryCooldownStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.values.get(key).await.map(|held| held.value))
  }

  async fn set_ex(
    &self,
    key: &str,
    ttl: Duration,
    value: &str,
  ) -> Result<(), Infallible> {
    let held = Held { value: value.to_owned(), ttl };
    self.values.insert(key.to_owned(), held).await;
    Ok(())
  }

  async fn set_nx_ex(
    &self,
    key: &str,
    ttl: Duration,
    value: &str,
  ) -> Result<bool, Infallible> {
    let entry = self
      .values
      .entry(key.to_owned())
      .or_insert_with(async { Held { value: value.to_owned(), ttl } })
      .await;
    Ok(entry.is_fresh())
  }

  async fn delete(&self, key: &str) -> Result<(), Infallible> {
    self.values.invalidate(key).await;
    Ok(())
  }

  async fn zadd(
    &self,
    key: &str,
    score: f64,
    member: &str,
  ) -> Result<(), Infallible> {
    self
      .scores
      .insert((key.to_owned(), member.to_owned()), score)
      .await;
    Ok(())
  }

  async fn zscore(
    &self,
    key: &str,
    member: &str,
  ) -> Result<Option<f64>, Infallible> {
    Ok(self.scores.get(&(key.to_owned(), member.to_owned())).await)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn set_nx_only_once_while_live() {
    let store = MemoryCooldownStore::new();
    let ttl = Duration::from_secs(60);

    assert!(store.set_nx_ex("k", ttl, "a").await.unwrap());
    assert!(!store.set_nx_ex("k", ttl, "b").await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));
  }

  #[tokio::test]
  async fn expired_key_can_be_claimed_again() {
    let store = MemoryCooldownStore::new();

    assert!(
      store
        .set_nx_ex("k", Duration::from_millis(10), "a")
        .await
        .unwrap()
    );
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(store.get("k").await.unwrap().is_none());
    assert!(
      store
        .set_nx_ex("k", Duration::from_secs(60), "b")
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn set_ex_replaces_ttl() {
    let store = MemoryCooldownStore::new();
    store.set_ex("k", Duration::from_millis(10), "a").await.unwrap();
    store.set_ex("k", Duration::from_secs(60), "b").await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
  }

  #[tokio::test]
  async fn expired_keys_are_evicted() {
    let store = MemoryCooldownStore::new();
    for i in 0..1000 {
      let key = format!("cooldown:{i}");
      store.set_nx_ex(&key, Duration::from_millis(1), "a").await.unwrap();
    }
    store.values.run_pending_tasks().await;

    // Expiry is tracked on a timer wheel with roughly one-second ticks.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    store
      .set_nx_ex("live", Duration::from_secs(60), "b")
      .await
      .unwrap();
    store.values.run_pending_tasks().await;

    assert_eq!(store.values.entry_count(), 1);
  }

  #[tokio::test]
  async fn delete_releases_key() {
    let store = MemoryCooldownStore::new();
    store.set_ex("k", Duration::from_secs(60), "a").await.unwrap();
    store.delete("k").await.unwrap();
    assert!(store.get("k").await.unwrap().is_none());
    assert!(
      store
        .set_nx_ex("k", Duration::from_secs(60), "b")
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn zadd_overwrites_member_score() {
    let store = MemoryCooldownStore::new();
    store.zadd("global", 3.0, "s1").await.unwrap();
    store.zadd("global", 7.5, "s1").await.unwrap();
    assert_eq!(store.zscore("global", "s1").await.unwrap(), Some(7.5));
    assert_eq!(store.zscore("global", "s2").await.unwrap(), None);
    assert_eq!(store.zscore("weekly", "s1").await.unwrap(), None);
  }
}
