//! Comment reply trees
//!
//! The closure of a set of root comments is resolved level by level before
//! anything is deleted. Nodes are keyed by id with their parent and depth, so
//! deletion can run deepest level first.

use crate::orm::comments;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub parent: Option<i32>,
    pub depth: u32,
}

#[derive(Clone, Debug, Default)]
pub struct CommentTree {
    nodes: BTreeMap<i32, Node>,
}

impl CommentTree {
    /// Load the full descendant closure of `roots` from the store.
    pub async fn load<C>(db: &C, roots: &[i32]) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut tree = Self::default();
        for &root in roots {
            tree.nodes.insert(root, Node { parent: None, depth: 0 });
        }

        let mut frontier: Vec<i32> = roots.to_vec();
        let mut depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let children = comments::Entity::find()
                .filter(comments::Column::ParentCommentId.is_in(frontier.clone()))
                .all(db)
                .await?;

            let mut next = Vec::new();
            for child in children {
                // A corrupt cycle would otherwise loop forever.
                if tree.nodes.contains_key(&child.id) {
                    continue;
                }
                tree.nodes.insert(
                    child.id,
                    Node {
                        parent: child.parent_comment_id,
                        depth,
                    },
                );
                next.push(child.id);
            }
            frontier = next;
        }

        Ok(tree)
    }

    pub fn ids(&self) -> Vec<i32> {
        self.nodes.keys().copied().collect()
    }

    /// Ids grouped by depth, deepest group first.
    pub fn levels_deepest_first(&self) -> Vec<Vec<i32>> {
        let max_depth = self.nodes.values().map(|n| n.depth).max().unwrap_or(0);
        let mut levels = vec![Vec::new(); max_depth as usize + 1];
        for (&id, node) in &self.nodes {
            levels[node.depth as usize].push(id);
        }
        levels.retain(|level| !level.is_empty());
        levels.reverse();
        levels
    }
}
