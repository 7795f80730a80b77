use std::collections::{BTreeMap, BTreeSet};

use crate::{
    api::{Comment, CommentId, Time},
    time, Locale, ReplySession, ThreadTree,
};

/// Everything a comment section shows, ready to be laid out
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SectionView {
    /// Number of comments loaded, replies included
    pub comment_count: usize,

    /// Shown in place of the thread when there are no comments at all
    pub placeholder: Option<String>,

    pub roots: Vec<CommentView>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentView {
    pub id: CommentId,
    pub depth: usize,
    pub author_name: String,
    pub author_group_name: String,
    pub author_group_color: String,
    pub author_avatar: Option<String>,

    /// The content, or a placeholder once deleted
    pub text: String,
    pub is_deleted: bool,
    pub time_label: String,

    pub is_liked: bool,
    pub likes_count: u64,
    pub likes_label: String,

    pub can_reply: bool,
    pub can_modify: bool,

    /// Set when the reply composer is open under this comment
    pub reply_draft: Option<String>,

    /// Set when this comment is being edited
    pub edit_draft: Option<String>,

    /// All replies, whether or not they are currently shown
    pub replies: Vec<CommentView>,
    pub replies_expanded: bool,

    /// Label of the show/hide replies button, absent when there is nothing
    /// to reveal
    pub replies_toggle_label: Option<String>,
}

pub(crate) struct ViewContext<'a> {
    pub reply: &'a ReplySession,
    pub edits: &'a BTreeMap<CommentId, String>,
    pub expanded: &'a BTreeSet<CommentId>,
    pub now: Time,
    pub locale: Locale,
}

impl<'a> ViewContext<'a> {
    fn comment(&self, c: &Comment, depth: usize, replies: Vec<CommentView>) -> CommentView {
        let reply_draft = match self.reply {
            ReplySession::Composing { target, draft } if *target == c.id => Some(draft.clone()),
            _ => None,
        };
        let replies_expanded = self.expanded.contains(&c.id);
        let replies_toggle_label = match (replies.len(), replies_expanded) {
            (0, _) => None,
            (_, true) => Some(String::from(self.locale.hide_replies())),
            (n, false) => Some(self.locale.show_replies(n)),
        };
        CommentView {
            id: c.id,
            depth,
            author_name: c.author_name.clone(),
            author_group_name: c.author_group_name.clone(),
            author_group_color: c.author_group_color.clone(),
            author_avatar: c.author_avatar.clone(),
            text: String::from(
                c.display_content()
                    .unwrap_or_else(|| self.locale.deleted_placeholder()),
            ),
            is_deleted: c.is_locked,
            time_label: time::time_since(c.created_at, self.now, self.locale),
            is_liked: c.is_liked,
            likes_count: c.likes_count,
            likes_label: time::compact_count(c.likes_count),
            can_reply: c.can_reply(),
            can_modify: c.can_modify(),
            reply_draft,
            edit_draft: self.edits.get(&c.id).cloned(),
            replies,
            replies_expanded,
            replies_toggle_label,
        }
    }

    pub fn section(&self, tree: &ThreadTree, comment_count: usize) -> SectionView {
        SectionView {
            comment_count,
            placeholder: (comment_count == 0).then(|| String::from(self.locale.empty_thread())),
            roots: tree
                .nodes()
                .iter()
                .map(|n| n.render(&mut |c: &Comment, depth, replies| self.comment(c, depth, replies)))
                .collect(),
        }
    }
}
