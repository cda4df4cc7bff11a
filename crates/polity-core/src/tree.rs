//! Nested hierarchy views assembled from flat records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// An identity together with its (recursively nested) children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityNode {
  #[serde(flatten)]
  pub identity: Identity,
  pub children: Vec<IdentityNode>,
}

impl IdentityNode {
  /// Number of nodes in this subtree, including `self`.
  pub fn size(&self) -> usize {
    1 + self.children.iter().map(IdentityNode::size).sum::<usize>()
  }
}

/// Build nested trees from a flat list in one grouping pass.
///
/// With `root = None` the result holds one tree per record whose
/// `parent_id` is `None`. With `root = Some(id)` it holds the single tree
/// rooted at `id`, or nothing if `id` is not among `identities`. Records
/// whose parent is absent from `identities` are left out. Sibling order is
/// the order of `identities`.
pub fn assemble(identities: Vec<Identity>, root: Option<i64>) -> Vec<IdentityNode> {
  let mut by_parent: HashMap<Option<i64>, Vec<Identity>> = HashMap::new();
  let mut root_record = None;

  for identity in identities {
    if root == Some(identity.id) {
      root_record = Some(identity);
    } else {
      by_parent.entry(identity.parent_id).or_default().push(identity);
    }
  }

  match root {
    None => {
      let roots = by_parent.remove(&None).unwrap_or_default();
      roots.into_iter().map(|r| attach(r, &mut by_parent)).collect()
    }
    Some(_) => root_record
      .map(|r| vec![attach(r, &mut by_parent)])
      .unwrap_or_default(),
  }
}

fn attach(identity: Identity, by_parent: &mut HashMap<Option<i64>, Vec<Identity>>) -> IdentityNode {
  let children = by_parent
    .remove(&Some(identity.id))
    .unwrap_or_default()
    .into_iter()
    .map(|child| attach(child, by_parent))
    .collect();
  IdentityNode { identity, children }
}
