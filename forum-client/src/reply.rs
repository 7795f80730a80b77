use crate::api::CommentId;

/// Which comment, if any, currently shows a reply composer. There is at most
/// one per comment section.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ReplySession {
    #[default]
    Idle,
    Composing {
        target: CommentId,
        draft: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplySubmission {
    pub target: CommentId,
    pub content: String,
}

impl ReplySession {
    pub fn active(&self) -> Option<CommentId> {
        match self {
            ReplySession::Idle => None,
            ReplySession::Composing { target, .. } => Some(*target),
        }
    }

    pub fn is_composing(&self, id: CommentId) -> bool {
        self.active() == Some(id)
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            ReplySession::Idle => None,
            ReplySession::Composing { draft, .. } => Some(draft),
        }
    }

    /// Opens the composer on `id`. Switching away from another target drops
    /// its unsent draft.
    pub fn open(&mut self, id: CommentId) {
        match self {
            ReplySession::Composing { target, .. } if *target == id => (),
            ReplySession::Composing { target, draft } => {
                tracing::debug!(from = ?target, to = ?id, discarded_len = draft.len(), "switching reply target");
                *self = ReplySession::Composing {
                    target: id,
                    draft: String::new(),
                };
            }
            ReplySession::Idle => {
                *self = ReplySession::Composing {
                    target: id,
                    draft: String::new(),
                };
            }
        }
    }

    /// Re-opens the composer with text that failed to go through. Does
    /// nothing if the user moved on to another composer in the meantime.
    pub fn restore(&mut self, submission: ReplySubmission) {
        if *self == ReplySession::Idle {
            *self = ReplySession::Composing {
                target: submission.target,
                draft: submission.content,
            };
        }
    }

    /// Returns false when no composer is open
    pub fn set_draft(&mut self, text: String) -> bool {
        match self {
            ReplySession::Idle => false,
            ReplySession::Composing { draft, .. } => {
                *draft = text;
                true
            }
        }
    }

    pub fn cancel(&mut self) {
        *self = ReplySession::Idle;
    }

    /// Closes the composer and hands back what to send, unless `text` is
    /// blank, in which case nothing changes.
    pub fn submit(&mut self, text: &str) -> Option<ReplySubmission> {
        let target = self.active()?;
        if text.trim().is_empty() {
            return None;
        }
        *self = ReplySession::Idle;
        Some(ReplySubmission {
            target,
            content: String::from(text),
        })
    }

    /// Same as `submit` with the composer's own draft
    pub fn submit_draft(&mut self) -> Option<ReplySubmission> {
        let draft = String::from(self.draft()?);
        self.submit(&draft)
    }
}
