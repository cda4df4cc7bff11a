//! The `IdentityStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `polity-store-sqlite`,
//! or [`MemoryStore`](crate::memory::MemoryStore) for tests). The hierarchy
//! engine and query façade depend on this abstraction, not on any concrete
//! backend.
//!
//! Stores are dumb: they enforce uniqueness and answer indexed lookups, but
//! never compute `path`/`level` and never cascade.

use std::future::Future;

use crate::identity::Identity;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`IdentityStore::list_all`] and [`IdentityStore::count`].
#[derive(Debug, Clone, Default)]
pub struct IdentityFilter {
  pub level:     Option<u32>,
  pub is_active: Option<bool>,
  /// Case-insensitive substring matched against `name` or `abbr`.
  pub search:    Option<String>,
  /// Restrict to this node and its descendants.
  pub within:    Option<i64>,
  /// Restrict to this node and the ancestors on its path.
  pub lineage:   Option<i64>,
  /// Ignored by [`IdentityStore::count`].
  pub limit:     Option<usize>,
  /// Ignored by [`IdentityStore::count`].
  pub offset:    Option<usize>,
}

impl IdentityFilter {
  pub fn active() -> Self {
    Self { is_active: Some(true), ..Self::default() }
  }

  /// In-memory evaluation of everything except `within`, `lineage`,
  /// `limit` and `offset`, which need index access.
  pub fn matches(&self, identity: &Identity) -> bool {
    if self.level.is_some_and(|l| l != identity.level) {
      return false;
    }
    if self.is_active.is_some_and(|a| a != identity.is_active) {
      return false;
    }
    if let Some(needle) = self.search.as_deref() {
      let needle = needle.to_lowercase();
      if !identity.name.to_lowercase().contains(&needle)
        && !identity.abbr.to_lowercase().contains(&needle)
      {
        return false;
      }
    }
    true
  }
}

/// Canonical ordering of every list a store returns: `level`, `name`, `id`.
pub fn sort_key(identity: &Identity) -> (u32, &str, i64) {
  (identity.level, identity.name.as_str(), identity.id)
}

// ─── Error plumbing ──────────────────────────────────────────────────────────

/// Lift a backend result into the core [`crate::Result`].
pub trait StoreResultExt<T> {
  fn into_core(self) -> crate::Result<T>;
}

impl<T, E: Into<crate::Error>> StoreResultExt<T> for Result<T, E> {
  fn into_core(self) -> crate::Result<T> { self.map_err(Into::into) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an identity store backend.
///
/// All list methods return records ordered by [`sort_key`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  /// Backend error. Domain failures (`Conflict`, `NotFound`) must convert
  /// into the matching [`crate::Error`] variant.
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Lookups ───────────────────────────────────────────────────────────

  fn get_by_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn get_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Direct children of `parent_id`; `None` lists the roots.
  fn list_by_parent(
    &self,
    parent_id: Option<i64>,
    include_inactive: bool,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  /// Every node whose `path` contains `ancestor_id`, i.e. the full set of
  /// descendants. Must be answered from an index, not by walking the tree.
  fn list_by_path_contains(
    &self,
    ancestor_id: i64,
    include_inactive: bool,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  fn list_all<'a>(
    &'a self,
    filter: &'a IdentityFilter,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + 'a;

  /// Number of records matching `filter`, ignoring `limit` and `offset`.
  fn count<'a>(
    &'a self,
    filter: &'a IdentityFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// An id strictly greater than every stored id.
  fn next_id(&self) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new record. Fails with `Conflict` if its `id` or `slug` is
  /// already taken; the store is left unchanged.
  fn insert(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Replace the record with `identity.id`. Fails with `NotFound` when no
  /// such record exists and with `Conflict` when the slug belongs to a
  /// different record.
  fn update(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Replace several existing records as one atomic unit: either every
  /// record is written or none is, and concurrent readers never observe a
  /// partially applied batch.
  fn apply_batch(
    &self,
    identities: Vec<Identity>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
