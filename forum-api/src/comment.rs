use crate::{CommentId, PostId, Time};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,

    /// Only meaningful while `is_locked` is false
    pub content: String,

    /// Immediate parent, `None` for a root comment
    #[serde(default)]
    pub parent_id: Option<CommentId>,

    /// Top-level ancestor, `None` for a root comment
    #[serde(default)]
    pub root: Option<CommentId>,

    pub created_at: Time,

    /// Set by the server when the viewing user authored this comment
    #[serde(default)]
    pub is_mine: bool,

    /// Set once soft-deleted
    #[serde(default)]
    pub is_locked: bool,

    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_group_name: String,
    #[serde(default)]
    pub author_group_color: String,
    #[serde(default)]
    pub author_avatar: Option<String>,

    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub likes_count: u64,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The text to show, or `None` if the comment was soft-deleted
    pub fn display_content(&self) -> Option<&str> {
        (!self.is_locked).then(|| &self.content as &str)
    }

    pub fn can_reply(&self) -> bool {
        !self.is_locked
    }

    /// Whether edit and delete should be offered to the viewing user
    pub fn can_modify(&self) -> bool {
        self.is_mine && !self.is_locked
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub post: PostId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<CommentId>,
    pub content: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedComment {
    pub comment_id: CommentId,
}

/// Body of a `PATCH /comment/{id}`
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum CommentPatch {
    Content {
        content: String,
    },
    Lock {
        #[serde(rename = "isLocked")]
        is_locked: bool,
    },
}

impl CommentPatch {
    pub fn content(text: String) -> CommentPatch {
        CommentPatch::Content { content: text }
    }

    pub fn lock() -> CommentPatch {
        CommentPatch::Lock { is_locked: true }
    }
}

/// Canonical like state, as far as the server chose to return it
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    #[serde(default)]
    pub is_liked: Option<bool>,
    #[serde(default)]
    pub likes_count: Option<u64>,
}
