//! Import a nested identity tree from a TOML file.
//!
//! ```toml
//! [[identities]]
//! name  = "Partisan"
//! color = "#6A5ACD"
//!
//!   [[identities.children]]
//!   name = "Democrat"
//!   abbr = "D"
//! ```

use anyhow::{Context, Result};
use polity_core::identity::{Identity, NewIdentity};
use serde::Deserialize;
use tracing::info;

use crate::client::ApiClient;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
  #[serde(default)]
  pub identities: Vec<SeedNode>,
}

#[derive(Debug, Deserialize)]
pub struct SeedNode {
  pub id:          Option<i64>,
  pub name:        String,
  pub slug:        Option<String>,
  #[serde(default)]
  pub abbr:        String,
  pub color:       Option<String>,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub children:    Vec<SeedNode>,
}

impl SeedFile {
  pub fn parse(raw: &str) -> Result<Self> {
    toml::from_str(raw).context("parsing seed file")
  }

  /// Total number of nodes in the file.
  pub fn node_count(&self) -> usize {
    fn count(nodes: &[SeedNode]) -> usize {
      nodes.iter().map(|n| 1 + count(&n.children)).sum()
    }
    count(&self.identities)
  }
}

impl SeedNode {
  fn to_new(&self, parent_id: Option<i64>) -> NewIdentity {
    NewIdentity {
      id: self.id,
      parent_id,
      name: self.name.clone(),
      slug: self.slug.clone(),
      abbr: self.abbr.clone(),
      color: self.color.clone(),
      description: self.description.clone(),
    }
  }
}

/// Creation order for `nodes`: every parent precedes its children. Each
/// entry carries the index of its parent entry, if any.
pub fn plan(nodes: &[SeedNode]) -> Vec<(Option<usize>, &SeedNode)> {
  let mut order = Vec::new();
  let mut stack: Vec<(Option<usize>, &SeedNode)> =
    nodes.iter().rev().map(|n| (None, n)).collect();

  while let Some((parent, node)) = stack.pop() {
    let index = order.len();
    order.push((parent, node));
    stack.extend(node.children.iter().rev().map(|c| (Some(index), c)));
  }
  order
}

/// Create every node in `file` through the API, wiring each child to the
/// id the server assigned its parent.
pub async fn import(client: &ApiClient, file: &SeedFile) -> Result<Vec<Identity>> {
  let mut created: Vec<Identity> = Vec::with_capacity(file.node_count());

  for (parent, node) in plan(&file.identities) {
    let parent_id = parent.map(|i| created[i].id);
    let identity = client
      .create(&node.to_new(parent_id))
      .await
      .with_context(|| format!("creating {:?}", node.name))?;
    info!(id = identity.id, slug = %identity.slug, "seeded identity");
    created.push(identity);
  }
  Ok(created)
}
