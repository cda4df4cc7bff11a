//! [`MemoryStore`], an in-process [`IdentityStore`].
//!
//! Keeps three indexes behind one `RwLock`: records by id, ids by slug, and
//! an ancestor → descendants map mirroring every record's `path`, so the
//! descendant query is a single map lookup. Used as the substitutable fake in
//! tests and for ephemeral servers.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap, HashSet},
  sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
  Error, Result,
  identity::{Identity, IdentityRef},
  store::{IdentityFilter, IdentityStore, sort_key},
};

/// Cloning is cheap; clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
  by_id:       BTreeMap<i64, Identity>,
  by_slug:     HashMap<String, i64>,
  descendants: HashMap<i64, BTreeSet<i64>>,
}

impl Inner {
  fn index_path(&mut self, identity: &Identity) {
    for &ancestor in &identity.path {
      self.descendants.entry(ancestor).or_default().insert(identity.id);
    }
  }

  fn unindex_path(&mut self, identity: &Identity) {
    for ancestor in &identity.path {
      if let Some(set) = self.descendants.get_mut(ancestor) {
        set.remove(&identity.id);
        if set.is_empty() {
          self.descendants.remove(ancestor);
        }
      }
    }
  }

  /// Swap in `identity` for the stored record with the same id. The caller
  /// has already checked that the record exists and the slug is free.
  fn replace(&mut self, identity: Identity) {
    if let Some(old) = self.by_id.remove(&identity.id) {
      self.unindex_path(&old);
      if old.slug != identity.slug {
        self.by_slug.remove(&old.slug);
      }
    }
    self.by_slug.insert(identity.slug.clone(), identity.id);
    self.index_path(&identity);
    self.by_id.insert(identity.id, identity);
  }

  fn check_slug(&self, identity: &Identity) -> Result<()> {
    match self.by_slug.get(&identity.slug) {
      Some(&owner) if owner != identity.id => Err(Error::Conflict {
        field: "slug",
        value: identity.slug.clone(),
      }),
      _ => Ok(()),
    }
  }
}

fn sorted(mut identities: Vec<Identity>) -> Vec<Identity> {
  identities.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
  identities
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
    self
      .inner
      .read()
      .map_err(|e| Error::Store(e.to_string().into()))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
    self
      .inner
      .write()
      .map_err(|e| Error::Store(e.to_string().into()))
  }

  fn filtered(&self, filter: &IdentityFilter) -> Result<Vec<Identity>> {
    let inner = self.read()?;
    let within: Option<HashSet<i64>> = filter.within.map(|root| {
      let mut set: HashSet<i64> = inner
        .descendants
        .get(&root)
        .map(|d| d.iter().copied().collect())
        .unwrap_or_default();
      set.insert(root);
      set
    });
    let lineage: Option<HashSet<i64>> = filter.lineage.map(|id| {
      inner
        .by_id
        .get(&id)
        .map(|node| node.path.iter().copied().chain([id]).collect())
        .unwrap_or_default()
    });

    let matching = inner
      .by_id
      .values()
      .filter(|i| within.as_ref().is_none_or(|w| w.contains(&i.id)))
      .filter(|i| lineage.as_ref().is_none_or(|l| l.contains(&i.id)))
      .filter(|i| filter.matches(i))
      .cloned()
      .collect();
    Ok(sorted(matching))
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for MemoryStore {
  type Error = Error;

  async fn get_by_id(&self, id: i64) -> Result<Option<Identity>> {
    Ok(self.read()?.by_id.get(&id).cloned())
  }

  async fn get_by_slug(&self, slug: &str) -> Result<Option<Identity>> {
    let inner = self.read()?;
    Ok(
      inner
        .by_slug
        .get(slug)
        .and_then(|id| inner.by_id.get(id))
        .cloned(),
    )
  }

  async fn list_by_parent(
    &self,
    parent_id:        Option<i64>,
    include_inactive: bool,
  ) -> Result<Vec<Identity>> {
    let inner = self.read()?;
    let children = inner
      .by_id
      .values()
      .filter(|i| i.parent_id == parent_id && (include_inactive || i.is_active))
      .cloned()
      .collect();
    Ok(sorted(children))
  }

  async fn list_by_path_contains(
    &self,
    ancestor_id:      i64,
    include_inactive: bool,
  ) -> Result<Vec<Identity>> {
    let inner = self.read()?;
    let descendants = inner
      .descendants
      .get(&ancestor_id)
      .into_iter()
      .flatten()
      .filter_map(|id| inner.by_id.get(id))
      .filter(|i| include_inactive || i.is_active)
      .cloned()
      .collect();
    Ok(sorted(descendants))
  }

  async fn list_all(&self, filter: &IdentityFilter) -> Result<Vec<Identity>> {
    let all = self.filtered(filter)?;
    let offset = filter.offset.unwrap_or(0);
    let limit = filter.limit.unwrap_or(usize::MAX);
    Ok(all.into_iter().skip(offset).take(limit).collect())
  }

  async fn count(&self, filter: &IdentityFilter) -> Result<u64> {
    Ok(self.filtered(filter)?.len() as u64)
  }

  async fn next_id(&self) -> Result<i64> {
    let inner = self.read()?;
    match inner.by_id.keys().next_back() {
      None => Ok(1),
      Some(&max) => max.checked_add(1).ok_or(Error::Conflict {
        field: "id",
        value: max.to_string(),
      }),
    }
  }

  async fn insert(&self, identity: Identity) -> Result<Identity> {
    let mut inner = self.write()?;
    if inner.by_id.contains_key(&identity.id) {
      return Err(Error::Conflict {
        field: "id",
        value: identity.id.to_string(),
      });
    }
    inner.check_slug(&identity)?;
    inner.replace(identity.clone());
    Ok(identity)
  }

  async fn update(&self, identity: Identity) -> Result<Identity> {
    let mut inner = self.write()?;
    if !inner.by_id.contains_key(&identity.id) {
      return Err(Error::NotFound(IdentityRef::Id(identity.id)));
    }
    inner.check_slug(&identity)?;
    inner.replace(identity.clone());
    Ok(identity)
  }

  async fn apply_batch(&self, identities: Vec<Identity>) -> Result<()> {
    let mut inner = self.write()?;

    // Check the whole batch before touching anything.
    let mut batch_slugs = HashMap::with_capacity(identities.len());
    for identity in &identities {
      if !inner.by_id.contains_key(&identity.id) {
        return Err(Error::NotFound(IdentityRef::Id(identity.id)));
      }
      inner.check_slug(identity)?;
      if let Some(other) = batch_slugs.insert(identity.slug.as_str(), identity.id)
        && other != identity.id
      {
        return Err(Error::Conflict {
          field: "slug",
          value: identity.slug.clone(),
        });
      }
    }

    for identity in identities {
      inner.replace(identity);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(id: i64, slug: &str, path: Vec<i64>) -> Identity {
    Identity {
      id,
      parent_id: path.last().copied(),
      name: slug.to_uppercase(),
      slug: slug.into(),
      abbr: String::new(),
      color: "#000000".into(),
      description: String::new(),
      level: path.len() as u32,
      path,
      is_active: true,
    }
  }

  #[tokio::test]
  async fn duplicate_id_or_slug_conflicts() {
    let store = MemoryStore::new();
    store.insert(record(1, "a", vec![])).await.unwrap();

    let err = store.insert(record(1, "b", vec![])).await.unwrap_err();
    assert!(matches!(err, Error::Conflict { field: "id", .. }));

    let err = store.insert(record(2, "a", vec![])).await.unwrap_err();
    assert!(matches!(err, Error::Conflict { field: "slug", .. }));

    assert_eq!(store.count(&IdentityFilter::default()).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn descendant_index_follows_updates() {
    let store = MemoryStore::new();
    store.insert(record(1, "a", vec![])).await.unwrap();
    store.insert(record(2, "b", vec![1])).await.unwrap();
    store.insert(record(3, "c", vec![1, 2])).await.unwrap();
    store.insert(record(4, "d", vec![])).await.unwrap();

    let ids = |v: Vec<Identity>| v.into_iter().map(|i| i.id).collect::<Vec<_>>();
    assert_eq!(ids(store.list_by_path_contains(1, true).await.unwrap()), vec![2, 3]);

    store
      .apply_batch(vec![record(2, "b", vec![4]), record(3, "c", vec![4, 2])])
      .await
      .unwrap();

    assert!(store.list_by_path_contains(1, true).await.unwrap().is_empty());
    assert_eq!(ids(store.list_by_path_contains(4, true).await.unwrap()), vec![2, 3]);
  }

  #[tokio::test]
  async fn batch_with_unknown_record_changes_nothing() {
    let store = MemoryStore::new();
    store.insert(record(1, "a", vec![])).await.unwrap();
    store.insert(record(2, "b", vec![1])).await.unwrap();

    let mut moved = record(2, "b", vec![]);
    moved.name = "MOVED".into();
    let err = store
      .apply_batch(vec![moved, record(99, "ghost", vec![])])
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotFound(IdentityRef::Id(99))));

    let b = store.get_by_id(2).await.unwrap().unwrap();
    assert_eq!(b.name, "B");
    assert_eq!(b.path, vec![1]);
  }

  #[tokio::test]
  async fn next_id_at_max_is_a_conflict() {
    let store = MemoryStore::new();
    assert_eq!(store.next_id().await.unwrap(), 1);
    store.insert(record(i64::MAX, "max", vec![])).await.unwrap();
    let err = store.next_id().await.unwrap_err();
    assert!(matches!(err, Error::Conflict { field: "id", .. }));
  }

  #[tokio::test]
  async fn lineage_filter_returns_node_and_ancestors() {
    let store = MemoryStore::new();
    store.insert(record(1, "a", vec![])).await.unwrap();
    store.insert(record(2, "b", vec![1])).await.unwrap();
    store.insert(record(3, "c", vec![1, 2])).await.unwrap();
    store.insert(record(4, "d", vec![])).await.unwrap();

    let filter = IdentityFilter { lineage: Some(3), ..Default::default() };
    let ids: Vec<i64> = store.list_all(&filter).await.unwrap().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let filter = IdentityFilter { lineage: Some(99), ..Default::default() };
    assert!(store.list_all(&filter).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn filter_search_is_case_insensitive_on_name_and_abbr() {
    let store = MemoryStore::new();
    let mut dem = record(1, "democrat", vec![]);
    dem.name = "Democrat".into();
    dem.abbr = "D".into();
    let mut rep = record(2, "republican", vec![]);
    rep.name = "Republican".into();
    rep.abbr = "GOP".into();
    store.insert(dem).await.unwrap();
    store.insert(rep).await.unwrap();

    let filter = IdentityFilter { search: Some("DEMO".into()), ..Default::default() };
    let hits = store.list_all(&filter).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 1);

    let filter = IdentityFilter { search: Some("gop".into()), ..Default::default() };
    assert_eq!(store.list_all(&filter).await.unwrap()[0].id, 2);
  }

  #[tokio::test]
  async fn next_id_is_past_the_max() {
    let store = MemoryStore::new();
    assert_eq!(store.next_id().await.unwrap(), 1);
    store.insert(record(41, "x", vec![])).await.unwrap();
    assert_eq!(store.next_id().await.unwrap(), 42);
  }
}
