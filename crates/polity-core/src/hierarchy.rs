//! The hierarchy engine, the only writer of `path` and `level`.
//!
//! Every mutation runs under one async write lock, so a read-compute-write
//! sequence (e.g. collecting a subtree and rewriting its paths) can never
//! interleave with another mutation. Multi-record writes go through
//! [`IdentityStore::apply_batch`], which the store applies atomically.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
  Error, Result,
  identity::{DEFAULT_COLOR, Identity, IdentityPatch, IdentityRef, NewIdentity},
  store::{IdentityFilter, IdentityStore, StoreResultExt as _},
  tree::{self, IdentityNode},
  validate::{slugify, validate_identity},
};

/// Hierarchy engine over a store handle.
///
/// Cloning is cheap; clones share the store and the write lock.
pub struct Hierarchy<S> {
  store:      Arc<S>,
  write_lock: Arc<Mutex<()>>,
}

impl<S> Clone for Hierarchy<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      write_lock: Arc::clone(&self.write_lock),
    }
  }
}

impl<S: IdentityStore> Hierarchy<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, write_lock: Arc::new(Mutex::new(())) }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  async fn require(&self, id: i64) -> Result<Identity> {
    self
      .store
      .get_by_id(id)
      .await
      .into_core()?
      .ok_or(Error::NotFound(IdentityRef::Id(id)))
  }

  async fn active_parent(&self, parent_id: i64) -> Result<Identity> {
    match self.store.get_by_id(parent_id).await.into_core()? {
      Some(parent) if parent.is_active => Ok(parent),
      _ => Err(Error::ParentNotFound(parent_id)),
    }
  }

  // ── Create / edit ─────────────────────────────────────────────────────

  /// Create a new identity under `input.parent_id` (or as a root).
  pub async fn create(&self, input: NewIdentity) -> Result<Identity> {
    let _guard = self.write_lock.lock().await;

    let path = match input.parent_id {
      None => Vec::new(),
      Some(parent_id) => self.active_parent(parent_id).await?.child_path(),
    };

    let id = match input.id {
      Some(id) => id,
      None => self.store.next_id().await.into_core()?,
    };

    let identity = Identity {
      id,
      parent_id: input.parent_id,
      slug: input.slug.unwrap_or_else(|| slugify(&input.name)),
      name: input.name,
      abbr: input.abbr,
      color: input.color.unwrap_or_else(|| DEFAULT_COLOR.to_owned()),
      description: input.description,
      level: path.len() as u32,
      path,
      is_active: true,
    };
    validate_identity(&identity)?;

    let identity = self.store.insert(identity).await.into_core()?;
    info!(
      id = identity.id,
      parent_id = ?identity.parent_id,
      slug = %identity.slug,
      "created identity"
    );
    Ok(identity)
  }

  /// Edit leaf fields of an existing identity.
  pub async fn update(&self, id: i64, patch: IdentityPatch) -> Result<Identity> {
    let _guard = self.write_lock.lock().await;

    let mut identity = self.require(id).await?;
    if patch.is_empty() {
      return Ok(identity);
    }
    patch.apply_to(&mut identity);
    validate_identity(&identity)?;

    let identity = self.store.update(identity).await.into_core()?;
    info!(id, "updated identity");
    Ok(identity)
  }

  // ── Move ──────────────────────────────────────────────────────────────

  /// Reparent `id` (and its whole subtree) under `new_parent_id`, or make
  /// it a root when `new_parent_id` is `None`.
  ///
  /// Moving a node to the parent it already has is a no-op.
  pub async fn move_node(&self, id: i64, new_parent_id: Option<i64>) -> Result<Identity> {
    let _guard = self.write_lock.lock().await;

    let node = self.require(id).await?;

    let new_path = match new_parent_id {
      None => Vec::new(),
      Some(parent_id) if parent_id == id => {
        return Err(Error::CycleDetected { id, parent_id });
      }
      Some(parent_id) => {
        let parent = self.active_parent(parent_id).await?;
        if parent.descends_from(id) {
          return Err(Error::CycleDetected { id, parent_id });
        }
        parent.child_path()
      }
    };

    if node.parent_id == new_parent_id && node.path == new_path {
      debug!(id, "move is a no-op");
      return Ok(node);
    }

    let descendants = self
      .store
      .list_by_path_contains(id, true)
      .await
      .into_core()?;

    let mut new_prefix = new_path.clone();
    new_prefix.push(id);

    let mut moved = node;
    moved.parent_id = new_parent_id;
    moved.level = new_path.len() as u32;
    moved.path = new_path;

    let mut batch = Vec::with_capacity(descendants.len() + 1);
    batch.push(moved.clone());
    for mut descendant in descendants {
      // Everything up to and including `id` is the old prefix.
      let Some(pos) = descendant.path.iter().position(|&a| a == id) else {
        return Err(Error::Store(
          format!("identity {} was indexed under {id} but its path omits it", descendant.id)
            .into(),
        ));
      };
      let tail = descendant.path.split_off(pos + 1);
      descendant.path = new_prefix.iter().copied().chain(tail).collect();
      descendant.level = descendant.path.len() as u32;
      batch.push(descendant);
    }

    let written = batch.len();
    self.store.apply_batch(batch).await.into_core()?;
    info!(id, new_parent_id = ?new_parent_id, records = written, "moved identity");
    Ok(moved)
  }

  // ── Soft delete ───────────────────────────────────────────────────────

  /// Soft-delete `id`. Without `cascade`, fails if the node has active
  /// children; with it, deactivates the whole active subtree.
  ///
  /// Returns the records that changed.
  pub async fn deactivate(&self, id: i64, cascade: bool) -> Result<Vec<Identity>> {
    let _guard = self.write_lock.lock().await;

    let mut node = self.require(id).await?;

    if !cascade {
      let active_children = self
        .store
        .list_by_parent(Some(id), false)
        .await
        .into_core()?;
      if !active_children.is_empty() {
        return Err(Error::HasActiveChildren(id));
      }
      if !node.is_active {
        return Ok(Vec::new());
      }
      node.is_active = false;
      let node = self.store.update(node).await.into_core()?;
      info!(id, "deactivated identity");
      return Ok(vec![node]);
    }

    let mut batch = Vec::new();
    if node.is_active {
      node.is_active = false;
      batch.push(node);
    }
    batch.extend(
      self
        .store
        .list_by_path_contains(id, false)
        .await
        .into_core()?
        .into_iter()
        .map(|mut d| {
          d.is_active = false;
          d
        }),
    );

    if batch.is_empty() {
      return Ok(batch);
    }
    self.store.apply_batch(batch.clone()).await.into_core()?;
    info!(id, records = batch.len(), "deactivated subtree");
    Ok(batch)
  }

  /// Undo a soft delete of a single node. The parent, if any, must be
  /// active. Descendants are left as they are.
  pub async fn activate(&self, id: i64) -> Result<Identity> {
    let _guard = self.write_lock.lock().await;

    let mut node = self.require(id).await?;
    if node.is_active {
      return Ok(node);
    }
    if let Some(parent_id) = node.parent_id {
      self.active_parent(parent_id).await?;
    }

    node.is_active = true;
    let node = self.store.update(node).await.into_core()?;
    info!(id, "activated identity");
    Ok(node)
  }

  // ── Tree views ────────────────────────────────────────────────────────

  pub async fn assemble_tree(&self, root: Option<i64>) -> Result<Vec<IdentityNode>> {
    assemble_tree(self.store.as_ref(), root).await
  }
}

/// Nested view of the active hierarchy, or of the subtree under `root`.
///
/// One flat fetch and one in-memory grouping pass; never one query per node.
/// The root itself is included even when inactive; below it only active
/// records appear.
pub async fn assemble_tree<S: IdentityStore>(
  store: &S,
  root:  Option<i64>,
) -> Result<Vec<IdentityNode>> {
  let flat = match root {
    None => store
      .list_all(&IdentityFilter::active())
      .await
      .into_core()?,
    Some(root_id) => {
      let filter = IdentityFilter { within: Some(root_id), ..IdentityFilter::default() };
      let mut flat = store.list_all(&filter).await.into_core()?;
      if !flat.iter().any(|i| i.id == root_id) {
        return Err(Error::NotFound(IdentityRef::Id(root_id)));
      }
      flat.retain(|i| i.id == root_id || i.is_active);
      flat
    }
  };
  Ok(tree::assemble(flat, root))
}
