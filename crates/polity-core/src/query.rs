//! The read-only query façade consumed by the HTTP layer.
//!
//! Thin composition over [`IdentityStore`] lookups and tree assembly. Holds
//! no lock: reads only ever see records the store has committed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  hierarchy::assemble_tree,
  identity::{Identity, IdentityRef},
  store::{IdentityFilter, IdentityStore, StoreResultExt as _},
  tree::IdentityNode,
  validate::{ValidationErrors, Violation},
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters accepted by [`Directory::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
  pub level:            Option<u32>,
  /// Id or slug of a top-level identity; restricts results to its subtree.
  pub category:         Option<IdentityRef>,
  /// Case-insensitive substring of `name` or `abbr`.
  pub search:           Option<String>,
  pub include_inactive: bool,
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page:      u32,
  pub page_size: u32,
}

impl Default for Page {
  fn default() -> Self {
    Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
  }
}

impl Page {
  /// Normalise raw query values: page 0 becomes 1 and the size is clamped
  /// to `1..=MAX_PAGE_SIZE`.
  pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
    Self {
      page:      page.unwrap_or(1).max(1),
      page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    }
  }

  fn offset(&self) -> usize {
    (self.page as usize - 1) * self.page_size as usize
  }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub items:     Vec<T>,
  pub total:     u64,
  pub page:      u32,
  pub page_size: u32,
}

// ─── Façade ──────────────────────────────────────────────────────────────────

/// Read API over a store handle. Cloning is cheap.
pub struct Directory<S> {
  store: Arc<S>,
}

impl<S> Clone for Directory<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store) }
  }
}

impl<S: IdentityStore> Directory<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn lookup(&self, key: &IdentityRef) -> Result<Option<Identity>> {
    match key {
      IdentityRef::Id(id) => self.store.get_by_id(*id).await.into_core(),
      IdentityRef::Slug(slug) => self.store.get_by_slug(slug).await.into_core(),
    }
  }

  /// Filtered, paginated listing ordered by level, then name.
  pub async fn list(&self, filter: ListFilter, page: Page) -> Result<Paginated<Identity>> {
    let within = match &filter.category {
      None => None,
      Some(key) => {
        let category = self
          .lookup(key)
          .await?
          .ok_or_else(|| Error::NotFound(key.clone()))?;
        if !category.is_root() {
          return Err(
            ValidationErrors::single(
              "category",
              Violation::Invalid { reason: "must name a top-level identity" },
            )
            .into(),
          );
        }
        Some(category.id)
      }
    };

    let store_filter = IdentityFilter {
      level: filter.level,
      is_active: (!filter.include_inactive).then_some(true),
      search: filter.search.filter(|s| !s.trim().is_empty()),
      within,
      lineage: None,
      limit: Some(page.page_size as usize),
      offset: Some(page.offset()),
    };

    let total = self.store.count(&store_filter).await.into_core()?;
    let items = self.store.list_all(&store_filter).await.into_core()?;
    Ok(Paginated { items, total, page: page.page, page_size: page.page_size })
  }

  /// Fetch by id or slug. Inactive records are returned too, so historical
  /// references stay resolvable.
  pub async fn get_one(&self, key: &IdentityRef) -> Result<Identity> {
    self
      .lookup(key)
      .await?
      .ok_or_else(|| Error::NotFound(key.clone()))
  }

  pub async fn get_descendants(&self, id: i64, include_inactive: bool) -> Result<Vec<Identity>> {
    if self.store.get_by_id(id).await.into_core()?.is_none() {
      return Err(Error::NotFound(IdentityRef::Id(id)));
    }
    self
      .store
      .list_by_path_contains(id, include_inactive)
      .await
      .into_core()
  }

  /// The ancestor chain of `id`, root-first, resolved from its path.
  ///
  /// The node and its ancestors come from a single store read, so a
  /// concurrent move is seen either entirely or not at all.
  pub async fn get_ancestors(&self, id: i64) -> Result<Vec<Identity>> {
    let filter = IdentityFilter { lineage: Some(id), ..IdentityFilter::default() };
    let mut lineage = self.store.list_all(&filter).await.into_core()?;
    let Some(pos) = lineage.iter().position(|i| i.id == id) else {
      return Err(Error::NotFound(IdentityRef::Id(id)));
    };
    let node = lineage.remove(pos);
    if lineage.len() != node.path.len() {
      return Err(Error::Store(
        format!("identity {id} names ancestors the store does not hold").into(),
      ));
    }
    // Levels along one path are distinct, so store order is root-first.
    Ok(lineage)
  }

  /// All active top-level identities.
  pub async fn get_categories(&self) -> Result<Vec<Identity>> {
    self.store.list_by_parent(None, false).await.into_core()
  }

  /// The whole active hierarchy as nested trees.
  pub async fn get_hierarchy(&self) -> Result<Vec<IdentityNode>> {
    assemble_tree(self.store.as_ref(), None).await
  }

  /// The subtree rooted at `root`.
  pub async fn get_subtree(&self, root: i64) -> Result<Vec<IdentityNode>> {
    assemble_tree(self.store.as_ref(), Some(root)).await
  }
}
