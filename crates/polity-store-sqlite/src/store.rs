//! [`SqliteStore`], the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use polity_core::{
  identity::{Identity, IdentityRef},
  store::{IdentityFilter, IdentityStore},
};
use rusqlite::{OptionalExtension as _, functions::FunctionFlags};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{COLUMNS, PendingWrite, RawIdentity, decode_all},
  schema::SCHEMA,
};

/// `WHERE` clause shared by `list_all` and `count`.
///
/// ?1 level, ?2 is_active, ?3 lowercased search needle, ?4 subtree root,
/// ?5 lineage leaf.
const FILTER_WHERE: &str = "
  WHERE (?1 IS NULL OR i.level = ?1)
    AND (?2 IS NULL OR i.is_active = ?2)
    AND (?3 IS NULL OR instr(ulower(i.name), ?3) > 0 OR instr(ulower(i.abbr), ?3) > 0)
    AND (?4 IS NULL OR i.id = ?4 OR i.id IN (
          SELECT descendant_id FROM identity_ancestors WHERE ancestor_id = ?4))
    AND (?5 IS NULL OR i.id = ?5 OR i.id IN (
          SELECT ancestor_id FROM identity_ancestors WHERE descendant_id = ?5))";

const ORDER_BY: &str = "ORDER BY i.level, i.name, i.id";

// ─── Write rejections ────────────────────────────────────────────────────────

/// A precondition that failed inside a write transaction. The transaction is
/// rolled back and the rejection surfaces as a core error.
enum Rejection {
  IdTaken(i64),
  SlugTaken(String),
  Missing(i64),
}

impl From<Rejection> for Error {
  fn from(r: Rejection) -> Self {
    let core = match r {
      Rejection::IdTaken(id) => polity_core::Error::Conflict {
        field: "id",
        value: id.to_string(),
      },
      Rejection::SlugTaken(slug) => polity_core::Error::Conflict { field: "slug", value: slug },
      Rejection::Missing(id) => polity_core::Error::NotFound(IdentityRef::Id(id)),
    };
    Error::Core(core)
  }
}

fn id_exists(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM identities WHERE id = ?1", [id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

/// Register `ulower`, a Unicode-aware `lower()`; the builtin folds ASCII only.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "ulower",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
  )
}

fn slug_owner(conn: &rusqlite::Connection, slug: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row("SELECT id FROM identities WHERE slug = ?1", [slug], |r| r.get(0))
    .optional()
}

/// Rewrite the closure-table rows for `descendant_id` from its path.
fn reindex(conn: &rusqlite::Connection, descendant_id: i64, path: &[i64]) -> rusqlite::Result<()> {
  conn.execute(
    "DELETE FROM identity_ancestors WHERE descendant_id = ?1",
    [descendant_id],
  )?;
  let mut stmt = conn.prepare_cached(
    "INSERT INTO identity_ancestors (ancestor_id, descendant_id, depth) VALUES (?1, ?2, ?3)",
  )?;
  for (i, ancestor_id) in path.iter().enumerate() {
    let depth = (path.len() - i) as i64;
    stmt.execute(rusqlite::params![ancestor_id, descendant_id, depth])?;
  }
  Ok(())
}

fn insert_row(conn: &rusqlite::Connection, raw: &RawIdentity) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO identities (
       id, parent_id, name, slug, abbr, color, description, level, path, is_active
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    rusqlite::params![
      raw.id,
      raw.parent_id,
      raw.name,
      raw.slug,
      raw.abbr,
      raw.color,
      raw.description,
      raw.level,
      raw.path,
      raw.is_active,
    ],
  )?;
  Ok(())
}

fn update_row(conn: &rusqlite::Connection, raw: &RawIdentity) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE identities SET
       parent_id = ?2, name = ?3, slug = ?4, abbr = ?5, color = ?6,
       description = ?7, level = ?8, path = ?9, is_active = ?10
     WHERE id = ?1",
    rusqlite::params![
      raw.id,
      raw.parent_id,
      raw.name,
      raw.slug,
      raw.abbr,
      raw.color,
      raw.description,
      raw.level,
      raw.path,
      raw.is_active,
    ],
  )?;
  Ok(())
}

/// Check and apply replacements of existing rows on an open transaction.
fn replace_rows(
  tx:     &rusqlite::Transaction<'_>,
  writes: &[PendingWrite],
) -> rusqlite::Result<Option<Rejection>> {
  for w in writes {
    if !id_exists(tx, w.raw.id)? {
      return Ok(Some(Rejection::Missing(w.raw.id)));
    }
    if slug_owner(tx, &w.raw.slug)?.is_some_and(|owner| owner != w.raw.id) {
      return Ok(Some(Rejection::SlugTaken(w.raw.slug.clone())));
    }
    update_row(tx, &w.raw)?;
    reindex(tx, w.raw.id, &w.path)?;
  }
  Ok(None)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An identity store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let version: i64 = self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
      })
      .await?;
    debug!(version, "sqlite schema ready");
    Ok(())
  }

  /// Run `sql` (which must select [`COLUMNS`]) with `params` and decode.
  async fn select(
    &self,
    sql:    String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Identity>> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    decode_all(raws)
  }

  async fn select_one(
    &self,
    condition: &str,
    param:     rusqlite::types::Value,
  ) -> Result<Option<Identity>> {
    let sql = format!("SELECT {COLUMNS} FROM identities i WHERE {condition}");
    Ok(self.select(sql, vec![param]).await?.into_iter().next())
  }
}

fn filter_params(filter: &IdentityFilter) -> Vec<rusqlite::types::Value> {
  use rusqlite::types::Value;
  vec![
    filter.level.map_or(Value::Null, |l| Value::Integer(i64::from(l))),
    filter.is_active.map_or(Value::Null, |a| Value::Integer(i64::from(a))),
    filter
      .search
      .as_deref()
      .map_or(Value::Null, |s| Value::Text(s.to_lowercase())),
    filter.within.map_or(Value::Null, Value::Integer),
    filter.lineage.map_or(Value::Null, Value::Integer),
  ]
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn get_by_id(&self, id: i64) -> Result<Option<Identity>> {
    self.select_one("i.id = ?1", id.into()).await
  }

  async fn get_by_slug(&self, slug: &str) -> Result<Option<Identity>> {
    self.select_one("i.slug = ?1", slug.to_owned().into()).await
  }

  async fn list_by_parent(
    &self,
    parent_id:        Option<i64>,
    include_inactive: bool,
  ) -> Result<Vec<Identity>> {
    let sql = format!(
      "SELECT {COLUMNS} FROM identities i
       WHERE i.parent_id IS ?1 AND (?2 OR i.is_active = 1)
       {ORDER_BY}"
    );
    let parent = parent_id.map_or(rusqlite::types::Value::Null, Into::into);
    self.select(sql, vec![parent, include_inactive.into()]).await
  }

  async fn list_by_path_contains(
    &self,
    ancestor_id:      i64,
    include_inactive: bool,
  ) -> Result<Vec<Identity>> {
    let sql = format!(
      "SELECT {COLUMNS} FROM identity_ancestors a
       JOIN identities i ON i.id = a.descendant_id
       WHERE a.ancestor_id = ?1 AND (?2 OR i.is_active = 1)
       {ORDER_BY}"
    );
    self
      .select(sql, vec![ancestor_id.into(), include_inactive.into()])
      .await
  }

  async fn list_all(&self, filter: &IdentityFilter) -> Result<Vec<Identity>> {
    let sql = format!(
      "SELECT {COLUMNS} FROM identities i {FILTER_WHERE} {ORDER_BY} LIMIT ?6 OFFSET ?7"
    );
    let mut params = filter_params(filter);
    // LIMIT -1 means no limit in SQLite.
    params.push(filter.limit.map_or(-1, |l| l as i64).into());
    params.push((filter.offset.unwrap_or(0) as i64).into());
    self.select(sql, params).await
  }

  async fn count(&self, filter: &IdentityFilter) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM identities i {FILTER_WHERE}");
    let params = filter_params(filter);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |r| r.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }

  async fn next_id(&self) -> Result<i64> {
    let max: Option<i64> = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT MAX(id) FROM identities", [], |r| r.get(0))?))
      .await?;
    match max {
      None => Ok(1),
      Some(max) => max.checked_add(1).ok_or_else(|| {
        Error::Core(polity_core::Error::Conflict { field: "id", value: max.to_string() })
      }),
    }
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert(&self, identity: Identity) -> Result<Identity> {
    let write = PendingWrite::new(&identity)?;

    let rejection = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if id_exists(&tx, write.raw.id)? {
          return Ok(Some(Rejection::IdTaken(write.raw.id)));
        }
        if slug_owner(&tx, &write.raw.slug)?.is_some() {
          return Ok(Some(Rejection::SlugTaken(write.raw.slug)));
        }
        insert_row(&tx, &write.raw)?;
        reindex(&tx, write.raw.id, &write.path)?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match rejection {
      Some(r) => Err(r.into()),
      None => Ok(identity),
    }
  }

  async fn update(&self, identity: Identity) -> Result<Identity> {
    self.apply_batch(vec![identity.clone()]).await?;
    Ok(identity)
  }

  async fn apply_batch(&self, identities: Vec<Identity>) -> Result<()> {
    let writes = identities
      .iter()
      .map(PendingWrite::new)
      .collect::<Result<Vec<_>>>()?;

    let rejection = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(r) = replace_rows(&tx, &writes)? {
          // Dropping `tx` rolls back whatever was already written.
          return Ok(Some(r));
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match rejection {
      Some(r) => Err(r.into()),
      None => Ok(()),
    }
  }
}
