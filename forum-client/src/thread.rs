use std::{collections::HashMap, sync::Arc};

use crate::api::{Comment, CommentId};

/// Two-level view of a flat comment list
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ThreadTree {
    /// Comments without a parent, in the order the server sent them
    pub roots: Vec<Comment>,

    /// Every reply, whatever its depth, bucketed under its top-level ancestor
    pub replies_by_root: HashMap<CommentId, Vec<Comment>>,
}

/// A comment along with the replies rendered under it
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThreadNode {
    pub comment: Comment,
    pub replies: Vec<ThreadNode>,
}

pub fn build_tree(comments: &[Comment]) -> ThreadTree {
    let by_id = comments
        .iter()
        .map(|c| (c.id, c))
        .collect::<HashMap<_, _>>();
    let mut tree = ThreadTree::default();
    for c in comments {
        let parent = match c.parent_id {
            None => {
                tree.roots.push(c.clone());
                continue;
            }
            Some(p) => p,
        };
        match attach_point(c, parent, &by_id) {
            Some(root) => tree
                .replies_by_root
                .entry(root)
                .or_insert_with(Vec::new)
                .push(c.clone()),
            None => tracing::warn!(
                comment = ?c.id,
                ?parent,
                root = ?c.root,
                "dropping reply whose root does not match its ancestry"
            ),
        }
    }
    tree
}

/// Root bucket for a reply, or None if its linkage cannot be trusted.
/// A root missing from the list (eg. on another page) is not an error.
fn attach_point(
    c: &Comment,
    parent: CommentId,
    by_id: &HashMap<CommentId, &Comment>,
) -> Option<CommentId> {
    let root = c.root?;
    if root == c.id || parent == c.id {
        return None;
    }
    if let Some(r) = by_id.get(&root) {
        if !r.is_root() {
            return None;
        }
    }
    match by_id.get(&parent) {
        Some(p) if p.is_root() && p.id != root => None,
        Some(p) if !p.is_root() && p.root != Some(root) => None,
        _ => Some(root),
    }
}

impl ThreadTree {
    pub fn replies(&self, root: CommentId) -> &[Comment] {
        self.replies_by_root
            .get(&root)
            .map(|r| &r[..])
            .unwrap_or(&[])
    }

    pub fn nodes(&self) -> Vec<ThreadNode> {
        self.roots
            .iter()
            .map(|r| ThreadNode {
                comment: r.clone(),
                replies: self
                    .replies(r.id)
                    .iter()
                    .map(|c| ThreadNode {
                        comment: c.clone(),
                        replies: Vec::new(),
                    })
                    .collect(),
            })
            .collect()
    }
}

impl ThreadNode {
    /// Bottom-up fold over this node and its descendants. `f` receives each
    /// comment with its depth (0 for this node) and the already-rendered
    /// replies.
    pub fn render<T, F>(&self, f: &mut F) -> T
    where
        F: FnMut(&Comment, usize, Vec<T>) -> T,
    {
        self.render_at(0, f)
    }

    fn render_at<T, F>(&self, depth: usize, f: &mut F) -> T
    where
        F: FnMut(&Comment, usize, Vec<T>) -> T,
    {
        let replies = self
            .replies
            .iter()
            .map(|r| r.render_at(depth + 1, &mut *f))
            .collect();
        f(&self.comment, depth, replies)
    }
}

/// Keeps the last built tree for as long as the same list is passed in
#[derive(Debug, Default)]
pub struct ThreadCache {
    last: Option<(Arc<Vec<Comment>>, Arc<ThreadTree>)>,
}

impl ThreadCache {
    pub fn get(&mut self, comments: &Arc<Vec<Comment>>) -> Arc<ThreadTree> {
        if let Some((list, tree)) = &self.last {
            if Arc::ptr_eq(list, comments) {
                return tree.clone();
            }
        }
        let tree = Arc::new(build_tree(comments));
        self.last = Some((comments.clone(), tree.clone()));
        tree
    }
}
