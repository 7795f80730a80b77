mod boards;
pub use boards::{BoardList, FollowToggle};

mod config;
pub use config::ClientConfig;

mod locale;
pub use locale::{Locale, UnknownLocale};

mod notify;
pub use notify::{Confirm, Notice, Notifier, Tone};

pub mod optimistic;
pub use optimistic::{Outcome, Skip};

mod reply;
pub use reply::{ReplySession, ReplySubmission};

mod section;
pub use section::{CommentSection, EditContent, LikeToggle, SoftDelete};

mod thread;
pub use thread::{build_tree, ThreadCache, ThreadNode, ThreadTree};

pub mod time;

mod view;
pub use view::{CommentView, SectionView};

pub mod api {
    pub use forum_api::*;
}
