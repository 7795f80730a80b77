use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    api::{
        Comment, CommentId, CommentPatch, CreatedComment, Error, LikeState, NewComment, PostId,
        Remote, Time,
    },
    optimistic::{self, InFlight, Mutation, Store},
    view::ViewContext,
    ClientConfig, Confirm, Locale, Notice, Notifier, Outcome, ReplySession, ReplySubmission,
    SectionView, Skip, ThreadCache, ThreadTree,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LikeToggle;

impl Mutation<Comment> for LikeToggle {
    type Response = LikeState;

    fn describe(&self) -> &'static str {
        "like toggle"
    }

    fn optimistic(&self, c: &mut Comment) {
        c.is_liked = !c.is_liked;
        c.likes_count = match c.is_liked {
            true => c.likes_count.saturating_add(1),
            false => c.likes_count.saturating_sub(1),
        };
    }

    fn confirmed(&self, c: &mut Comment, res: LikeState) {
        if let Some(is_liked) = res.is_liked {
            c.is_liked = is_liked;
        }
        if let Some(count) = res.likes_count {
            c.likes_count = count;
        }
    }

    fn success_message(&self, c: &Comment, res: &LikeState, locale: Locale) -> String {
        String::from(locale.like_saved(res.is_liked.unwrap_or(c.is_liked)))
    }
}

/// Locks the comment: it keeps its place in the thread, without its content
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SoftDelete;

impl Mutation<Comment> for SoftDelete {
    type Response = ();

    fn describe(&self) -> &'static str {
        "soft delete"
    }

    fn optimistic(&self, c: &mut Comment) {
        c.is_locked = true;
    }

    fn success_message(&self, _: &Comment, _: &(), locale: Locale) -> String {
        String::from(locale.comment_deleted())
    }
}

/// Replaces the content once the server accepted it. Nothing changes locally
/// before that.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EditContent(pub String);

impl Mutation<Comment> for EditContent {
    type Response = ();

    fn describe(&self) -> &'static str {
        "edit"
    }

    fn optimistic(&self, _: &mut Comment) {}

    fn confirmed(&self, c: &mut Comment, (): ()) {
        c.content = self.0.clone();
    }

    fn success_message(&self, _: &Comment, _: &(), locale: Locale) -> String {
        String::from(locale.comment_updated())
    }
}

#[derive(Debug, Default)]
struct SectionState {
    // server order
    comments: Arc<Vec<Comment>>,
    reply: ReplySession,
    edits: BTreeMap<CommentId, String>,
    // roots whose replies are shown
    expanded: BTreeSet<CommentId>,
    in_flight: InFlight<CommentId, Comment>,
    cache: ThreadCache,
    // bumped by each refresh, so only the latest one lands
    generation: u64,
    closed: bool,
}

impl SectionState {
    fn find(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }
}

impl Store<CommentId, Comment> for SectionState {
    fn optimistic_parts(
        &mut self,
        id: &CommentId,
    ) -> (&mut InFlight<CommentId, Comment>, Option<&mut Comment>) {
        // copy on write, so that trees built from the previous list stay valid
        let comment = Arc::make_mut(&mut self.comments)
            .iter_mut()
            .find(|c| c.id == *id);
        (&mut self.in_flight, comment)
    }
}

/// The comments of one post, along with the user's pending interactions
/// with them
pub struct CommentSection<R, N, C> {
    post: PostId,
    remote: R,
    notifier: N,
    confirm: C,
    config: ClientConfig,
    state: RefCell<SectionState>,
}

impl<R, N, C> CommentSection<R, N, C>
where
    R: Remote,
    N: Notifier,
    C: Confirm,
{
    pub fn new(
        post: PostId,
        remote: R,
        notifier: N,
        confirm: C,
        config: ClientConfig,
    ) -> CommentSection<R, N, C> {
        CommentSection {
            post,
            remote,
            notifier,
            confirm,
            config,
            state: RefCell::new(SectionState::default()),
        }
    }

    pub fn post(&self) -> PostId {
        self.post
    }

    fn locale(&self) -> Locale {
        self.config.locale
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Reloads every page of comments. Only the most recent refresh gets to
    /// replace the list, and a failed one leaves it as it was.
    pub async fn refresh(&self) -> Outcome {
        let generation = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return Outcome::Discarded;
            }
            state.generation += 1;
            state.generation
        };
        let res = self.fetch_all().await;
        let mut state = self.state.borrow_mut();
        if state.closed || state.generation != generation {
            tracing::debug!(post = %self.post, generation, "dropping superseded comment list");
            return Outcome::Discarded;
        }
        match res {
            Ok(mut comments) => {
                tracing::debug!(post = %self.post, comments = comments.len(), "loaded comments");
                state
                    .edits
                    .retain(|id, _| comments.iter().any(|c| c.id == *id && c.can_modify()));
                state
                    .expanded
                    .retain(|id| comments.iter().any(|c| c.id == *id));
                for c in comments.iter_mut() {
                    let id = c.id;
                    state.in_flight.rebase(&id, c);
                }
                state.comments = Arc::new(comments);
                Outcome::Applied
            }
            Err(err) => {
                drop(state);
                tracing::error!(post = %self.post, %err, "failed loading comments");
                self.notifier
                    .notify(Notice::failure(self.locale().load_failed()));
                Outcome::Failed(err)
            }
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Comment>, Error> {
        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.remote.list_comments(self.post, page).await?;
            let full = batch.len() >= self.config.page_size;
            comments.extend(batch);
            if !full {
                return Ok(comments);
            }
            if page >= self.config.max_pages {
                tracing::warn!(post = %self.post, pages = page, "stopping at page limit");
                return Ok(comments);
            }
            page += 1;
        }
    }

    /// The flat list, in server order
    pub fn comments(&self) -> Arc<Vec<Comment>> {
        self.state.borrow().comments.clone()
    }

    pub fn comment(&self, id: CommentId) -> Option<Comment> {
        self.state.borrow().find(id).cloned()
    }

    /// Rebuilt only when the list changed since the last call
    pub fn tree(&self) -> Arc<ThreadTree> {
        let mut state = self.state.borrow_mut();
        let comments = state.comments.clone();
        state.cache.get(&comments)
    }

    pub fn is_pending(&self, id: CommentId) -> bool {
        self.state.borrow().in_flight.is_pending(&id)
    }

    /// Whether `id` is loaded and offers the action `allowed` checks for
    fn target(&self, id: CommentId, allowed: fn(&Comment) -> bool) -> Result<(), Outcome> {
        let state = self.state.borrow();
        if state.closed {
            return Err(Outcome::Discarded);
        }
        match state.find(id) {
            None => Err(Outcome::Skipped(Skip::NotFound)),
            Some(c) if !allowed(c) => Err(Outcome::Skipped(Skip::NotAllowed)),
            Some(_) => Ok(()),
        }
    }

    /// Shows or hides the replies under `root`. Returns whether they are
    /// now shown.
    pub fn toggle_replies(&self, root: CommentId) -> bool {
        let mut state = self.state.borrow_mut();
        if state.expanded.remove(&root) {
            return false;
        }
        if state.find(root).map_or(false, Comment::is_root) {
            state.expanded.insert(root);
            return true;
        }
        false
    }

    pub fn replies_shown(&self, root: CommentId) -> bool {
        self.state.borrow().expanded.contains(&root)
    }

    pub fn reply_session(&self) -> ReplySession {
        self.state.borrow().reply.clone()
    }

    /// Opens the reply composer under `id`, closing any other one. Returns
    /// false if `id` cannot be replied to.
    pub fn open_reply(&self, id: CommentId) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.find(id).map_or(false, Comment::can_reply) {
            return false;
        }
        state.reply.open(id);
        true
    }

    pub fn cancel_reply(&self) {
        self.state.borrow_mut().reply.cancel();
    }

    pub fn set_reply_draft(&self, text: String) -> bool {
        self.state.borrow_mut().reply.set_draft(text)
    }

    pub async fn submit_root_comment(&self, text: &str) -> Outcome {
        if text.trim().is_empty() {
            return Outcome::Skipped(Skip::Blank);
        }
        if self.is_closed() {
            return Outcome::Discarded;
        }
        let res = self
            .remote
            .create_comment(NewComment {
                post: self.post,
                parent: None,
                content: String::from(text),
            })
            .await;
        self.created(res, self.locale().comment_posted(), None).await
    }

    /// Sends a reply to `parent`. If sending fails, the composer re-opens
    /// with the text, unless another one was opened in the meantime.
    pub async fn submit_reply(&self, parent: CommentId, text: &str) -> Outcome {
        if text.trim().is_empty() {
            return Outcome::Skipped(Skip::Blank);
        }
        if let Err(skipped) = self.target(parent, Comment::can_reply) {
            return skipped;
        }
        let submission = {
            let mut state = self.state.borrow_mut();
            state.reply.open(parent);
            match state.reply.submit(text) {
                Some(s) => s,
                None => return Outcome::Skipped(Skip::Blank),
            }
        };
        let res = self
            .remote
            .create_comment(NewComment {
                post: self.post,
                parent: Some(submission.target),
                content: submission.content.clone(),
            })
            .await;
        self.created(res, self.locale().reply_posted(), Some(submission))
            .await
    }

    async fn created(
        &self,
        res: Result<CreatedComment, Error>,
        message: &str,
        submission: Option<ReplySubmission>,
    ) -> Outcome {
        if self.is_closed() {
            return Outcome::Discarded;
        }
        match res {
            Ok(created) => {
                tracing::debug!(post = %self.post, id = %created.comment_id, "comment created");
                self.notifier.notify(Notice::success(message));
                self.changed().await;
                Outcome::Applied
            }
            Err(err) => {
                tracing::error!(post = %self.post, %err, "failed creating comment");
                if let Some(s) = submission {
                    self.state.borrow_mut().reply.restore(s);
                }
                self.notifier
                    .notify(Notice::failure(self.locale().operation_failed()));
                Outcome::Failed(err)
            }
        }
    }

    /// Follows every accepted create, edit or delete
    async fn changed(&self) {
        self.state.borrow_mut().reply.cancel();
        // a failed reload already notified the user
        let _ = self.refresh().await;
    }

    /// Opens the editor on one of the user's own comments, pre-filled with
    /// its content. An editor already open on it keeps its draft.
    pub fn request_edit(&self, id: CommentId) -> bool {
        let mut state = self.state.borrow_mut();
        let content = match state.find(id) {
            Some(c) if c.can_modify() => c.content.clone(),
            _ => return false,
        };
        state.edits.entry(id).or_insert(content);
        true
    }

    pub fn edit_draft(&self, id: CommentId) -> Option<String> {
        self.state.borrow().edits.get(&id).cloned()
    }

    pub fn set_edit_draft(&self, id: CommentId, text: String) -> bool {
        match self.state.borrow_mut().edits.get_mut(&id) {
            Some(draft) => {
                *draft = text;
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&self, id: CommentId) {
        self.state.borrow_mut().edits.remove(&id);
    }

    /// Saves `text` as the new content of `id`. The editor closes while
    /// saving and re-opens with `text` if that did not go through.
    pub async fn confirm_edit(&self, id: CommentId, text: &str) -> Outcome {
        if text.trim().is_empty() {
            return Outcome::Skipped(Skip::Blank);
        }
        if let Err(skipped) = self.target(id, Comment::can_modify) {
            return skipped;
        }
        self.state.borrow_mut().edits.remove(&id);
        let outcome = optimistic::run(
            &self.state,
            id,
            &EditContent(String::from(text)),
            || self.remote.patch_comment(id, CommentPatch::content(String::from(text))),
            &self.notifier,
            self.locale(),
        )
        .await;
        match outcome {
            Outcome::Applied => self.changed().await,
            Outcome::RolledBack(_) | Outcome::Skipped(Skip::Busy) => {
                self.state
                    .borrow_mut()
                    .edits
                    .insert(id, String::from(text));
            }
            _ => (),
        }
        outcome
    }

    /// Asks for confirmation, then soft-deletes `id`
    pub async fn request_delete(&self, id: CommentId) -> Outcome {
        if let Err(skipped) = self.target(id, Comment::can_modify) {
            return skipped;
        }
        if !self.confirm.confirm(self.locale().delete_prompt()) {
            tracing::debug!(post = %self.post, %id, "delete declined");
            return Outcome::Skipped(Skip::Declined);
        }
        let outcome = optimistic::run(
            &self.state,
            id,
            &SoftDelete,
            || self.remote.patch_comment(id, CommentPatch::lock()),
            &self.notifier,
            self.locale(),
        )
        .await;
        if outcome.is_applied() {
            self.state.borrow_mut().edits.remove(&id);
            self.changed().await;
        }
        outcome
    }

    pub async fn toggle_like(&self, id: CommentId) -> Outcome {
        if self.is_closed() {
            return Outcome::Discarded;
        }
        optimistic::run(
            &self.state,
            id,
            &LikeToggle,
            || self.remote.like_comment(id),
            &self.notifier,
            self.locale(),
        )
        .await
    }

    pub fn view(&self, now: Time) -> SectionView {
        let tree = self.tree();
        let state = self.state.borrow();
        ViewContext {
            reply: &state.reply,
            edits: &state.edits,
            expanded: &state.expanded,
            now,
            locale: self.locale(),
        }
        .section(&tree, state.comments.len())
    }

    /// Tears the section down: answers still on their way are dropped
    /// without notice
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.in_flight.clear();
        tracing::debug!(post = %self.post, "comment section closed");
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use chrono::Utc;
    use forum_mock_server::{MockServer, Op};
    use futures::join;

    use super::*;
    use crate::Tone;

    const POST: PostId = PostId(1);

    type Notices = Rc<RefCell<Vec<Notice>>>;
    type Section<C> = CommentSection<Rc<MockServer>, Notices, C>;

    fn yes(_: &str) -> bool {
        true
    }

    fn config(page_size: usize) -> ClientConfig {
        ClientConfig {
            page_size,
            ..ClientConfig::default()
        }
    }

    async fn loaded<C: Confirm>(server: &Rc<MockServer>, confirm: C) -> (Notices, Section<C>) {
        let notices = Notices::default();
        let section = CommentSection::new(
            POST,
            server.clone(),
            notices.clone(),
            confirm,
            config(server.page_size()),
        );
        assert_eq!(section.refresh().await, Outcome::Applied);
        (notices, section)
    }

    /// A comment the viewing user authored
    async fn own_comment(server: &MockServer, parent: Option<CommentId>, text: &str) -> CommentId {
        server
            .create_comment(NewComment {
                post: POST,
                parent,
                content: String::from(text),
            })
            .await
            .unwrap()
            .comment_id
    }

    fn last(notices: &Notices) -> Notice {
        notices.borrow().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn refresh_reads_pages_until_a_short_one() {
        let server = Rc::new(MockServer::with_page_size(2));
        for i in 0..4 {
            server.seed_comment(POST, None, "amy", &format!("c{i}"));
        }
        let (_, section) = loaded(&server, yes).await;
        assert_eq!(section.comments().len(), 4);
        // the last page came back empty
        assert_eq!(server.calls(Op::ListComments), 3);

        server.seed_comment(POST, None, "amy", "c4");
        assert_eq!(section.refresh().await, Outcome::Applied);
        assert_eq!(section.comments().len(), 5);
        assert_eq!(server.calls(Op::ListComments), 6);
    }

    #[tokio::test]
    async fn refresh_stops_at_page_limit() {
        let server = Rc::new(MockServer::with_page_size(2));
        for i in 0..5 {
            server.seed_comment(POST, None, "amy", &format!("c{i}"));
        }
        let section = CommentSection::new(
            POST,
            server.clone(),
            Notices::default(),
            yes,
            ClientConfig {
                max_pages: 2,
                ..config(2)
            },
        );
        assert_eq!(section.refresh().await, Outcome::Applied);
        assert_eq!(section.comments().len(), 4);
        assert_eq!(server.calls(Op::ListComments), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_list() {
        let server = Rc::new(MockServer::new());
        server.seed_comment(POST, None, "amy", "hi");
        let (notices, section) = loaded(&server, yes).await;
        server.seed_comment(POST, None, "bob", "hey");
        server.fail_next(Op::ListComments);
        assert!(matches!(section.refresh().await, Outcome::Failed(Error::Network(_))));
        assert_eq!(section.comments().len(), 1);
        assert_eq!(last(&notices), Notice::failure(Locale::En.load_failed()));
    }

    #[tokio::test]
    async fn only_latest_refresh_lands() {
        let server = Rc::new(MockServer::new());
        let (_, section) = loaded(&server, yes).await;
        let hold = server.hold(Op::ListComments);
        let stale = section.refresh();
        let fresh = async {
            server.seed_comment(POST, None, "amy", "hi");
            assert_eq!(section.refresh().await, Outcome::Applied);
            hold.release();
        };
        let (stale, ()) = join!(stale, fresh);
        assert_eq!(stale, Outcome::Discarded);
        assert_eq!(section.comments().len(), 1);
    }

    #[tokio::test]
    async fn tree_is_cached_until_list_changes() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        server.seed_comment(POST, Some(a), "bob", "reply");
        let (_, section) = loaded(&server, yes).await;
        let first = section.tree();
        assert!(Arc::ptr_eq(&first, &section.tree()));
        assert_eq!(first.replies(a).len(), 1);
        assert_eq!(section.toggle_like(a).await, Outcome::Applied);
        let second = section.tree();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.roots[0].is_liked);
        assert!(!first.roots[0].is_liked);
    }

    #[tokio::test]
    async fn root_comment_is_posted_then_reloaded() {
        let server = Rc::new(MockServer::new());
        let (notices, section) = loaded(&server, yes).await;
        assert_eq!(
            section.submit_root_comment(" \n").await,
            Outcome::Skipped(Skip::Blank)
        );
        assert_eq!(server.calls(Op::CreateComment), 0);

        assert_eq!(section.submit_root_comment("hello").await, Outcome::Applied);
        assert_eq!(server.calls(Op::ListComments), 2);
        let comments = section.comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "hello");
        assert!(comments[0].is_root());
        assert_eq!(
            notices.borrow().as_slice(),
            &[Notice::success(Locale::En.comment_posted())]
        );
    }

    #[tokio::test]
    async fn reply_is_posted_under_its_root() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let b = server.seed_comment(POST, Some(a), "bob", "reply");
        let (notices, section) = loaded(&server, yes).await;
        assert!(section.open_reply(b));
        assert!(section.set_reply_draft(String::from("nested")));
        assert_eq!(section.submit_reply(b, "nested").await, Outcome::Applied);
        assert_eq!(section.reply_session(), ReplySession::Idle);
        let tree = section.tree();
        assert_eq!(tree.replies(a).len(), 2);
        let c = &tree.replies(a)[1];
        assert_eq!((c.parent_id, c.root), (Some(b), Some(a)));
        assert_eq!(last(&notices), Notice::success(Locale::En.reply_posted()));
    }

    #[tokio::test]
    async fn blank_reply_leaves_composer_alone() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let (_, section) = loaded(&server, yes).await;
        assert!(section.open_reply(a));
        section.set_reply_draft(String::from("  "));
        let before = section.reply_session();
        assert_eq!(section.submit_reply(a, "  ").await, Outcome::Skipped(Skip::Blank));
        assert_eq!(section.reply_session(), before);
        assert_eq!(server.calls(Op::CreateComment), 0);
    }

    #[tokio::test]
    async fn reply_to_unknown_comment_is_skipped() {
        let server = Rc::new(MockServer::new());
        let (notices, section) = loaded(&server, yes).await;
        assert!(!section.open_reply(CommentId(42)));
        assert_eq!(
            section.submit_reply(CommentId(42), "hi").await,
            Outcome::Skipped(Skip::NotFound)
        );
        assert_eq!(server.calls(Op::CreateComment), 0);
        assert!(notices.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_reply_reopens_composer() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let (notices, section) = loaded(&server, yes).await;
        section.open_reply(a);
        server.fail_next(Op::CreateComment);
        assert!(matches!(
            section.submit_reply(a, "retry me").await,
            Outcome::Failed(_)
        ));
        assert_eq!(
            section.reply_session(),
            ReplySession::Composing {
                target: a,
                draft: String::from("retry me"),
            }
        );
        assert_eq!(last(&notices).tone, Tone::Failure);
        assert_eq!(server.calls(Op::ListComments), 1);
    }

    #[tokio::test]
    async fn failed_reply_does_not_replace_newer_composer() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let b = server.seed_comment(POST, None, "bob", "other");
        let (_, section) = loaded(&server, yes).await;
        server.fail(Op::CreateComment);
        let hold = server.hold(Op::CreateComment);
        let pending = section.submit_reply(a, "lost");
        let meanwhile = async {
            assert_eq!(section.reply_session(), ReplySession::Idle);
            assert!(section.open_reply(b));
            hold.release();
        };
        let (outcome, ()) = join!(pending, meanwhile);
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(section.reply_session().active(), Some(b));
        assert_eq!(section.reply_session().draft(), Some(""));
    }

    #[tokio::test]
    async fn locked_comment_cannot_be_replied_to() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "soon gone").await;
        let (_, section) = loaded(&server, yes).await;
        assert_eq!(section.request_delete(mine).await, Outcome::Applied);
        assert!(!section.open_reply(mine));
        assert_eq!(section.reply_session(), ReplySession::Idle);
        assert_eq!(
            section.submit_reply(mine, "too late").await,
            Outcome::Skipped(Skip::NotAllowed)
        );
        assert_eq!(section.reply_session(), ReplySession::Idle);
        assert_eq!(server.calls(Op::CreateComment), 1);
    }

    #[tokio::test]
    async fn edit_is_only_offered_on_own_comments() {
        let server = Rc::new(MockServer::new());
        let theirs = server.seed_comment(POST, None, "amy", "top");
        let mine = own_comment(&server, Some(theirs), "original").await;
        let (_, section) = loaded(&server, yes).await;
        assert!(!section.request_edit(theirs));
        assert!(section.request_edit(mine));
        assert_eq!(section.edit_draft(mine).as_deref(), Some("original"));
        assert!(section.set_edit_draft(mine, String::from("changed")));
        // asking again keeps the draft
        assert!(section.request_edit(mine));
        assert_eq!(section.edit_draft(mine).as_deref(), Some("changed"));
        section.cancel_edit(mine);
        assert_eq!(section.edit_draft(mine), None);
        assert!(!section.set_edit_draft(mine, String::from("nope")));
    }

    #[tokio::test]
    async fn edit_shows_only_once_accepted() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "original").await;
        let (notices, section) = loaded(&server, yes).await;
        section.request_edit(mine);
        let hold = server.hold(Op::PatchComment);
        let pending = section.confirm_edit(mine, "updated");
        let meanwhile = async {
            assert_eq!(section.comment(mine).unwrap().content, "original");
            assert_eq!(section.edit_draft(mine), None);
            hold.release();
        };
        let (outcome, ()) = join!(pending, meanwhile);
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(section.comment(mine).unwrap().content, "updated");
        assert_eq!(server.comment(POST, mine).unwrap().content, "updated");
        assert_eq!(server.calls(Op::ListComments), 2);
        assert_eq!(
            notices.borrow().as_slice(),
            &[Notice::success(Locale::En.comment_updated())]
        );
    }

    #[tokio::test]
    async fn failed_edit_reopens_editor() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "original").await;
        let (notices, section) = loaded(&server, yes).await;
        section.request_edit(mine);
        server.fail_next(Op::PatchComment);
        assert!(matches!(
            section.confirm_edit(mine, "rewritten").await,
            Outcome::RolledBack(Error::Network(_))
        ));
        assert_eq!(section.comment(mine).unwrap().content, "original");
        assert_eq!(section.edit_draft(mine).as_deref(), Some("rewritten"));
        assert_eq!(last(&notices).tone, Tone::Failure);
        assert_eq!(
            section.confirm_edit(mine, "").await,
            Outcome::Skipped(Skip::Blank)
        );
        assert_eq!(server.calls(Op::PatchComment), 1);
    }

    #[tokio::test]
    async fn foreign_comments_are_not_sent_for_edit_or_delete() {
        let server = Rc::new(MockServer::new());
        let theirs = server.seed_comment(POST, None, "amy", "theirs");
        let prompts = Rc::new(Cell::new(0));
        let asked = prompts.clone();
        let (notices, section) = loaded(&server, move |_: &str| {
            asked.set(asked.get() + 1);
            true
        })
        .await;
        assert_eq!(
            section.confirm_edit(theirs, "hijacked").await,
            Outcome::Skipped(Skip::NotAllowed)
        );
        assert_eq!(section.edit_draft(theirs), None);
        assert_eq!(
            section.request_delete(theirs).await,
            Outcome::Skipped(Skip::NotAllowed)
        );
        assert_eq!(prompts.get(), 0);
        assert_eq!(
            section.confirm_edit(CommentId(99), "nobody").await,
            Outcome::Skipped(Skip::NotFound)
        );
        assert_eq!(section.edit_draft(CommentId(99)), None);
        assert_eq!(section.comment(theirs).unwrap().content, "theirs");
        assert_eq!(server.calls(Op::PatchComment), 0);
        assert!(notices.borrow().is_empty());
    }

    #[tokio::test]
    async fn busy_edit_keeps_the_draft() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "original").await;
        let (_, section) = loaded(&server, yes).await;
        let hold = server.hold(Op::PatchComment);
        let first = section.request_delete(mine);
        let second = async {
            assert_eq!(
                section.confirm_edit(mine, "second thoughts").await,
                Outcome::Skipped(Skip::NotAllowed)
            );
            assert_eq!(section.edit_draft(mine), None);
            hold.release();
        };
        let (first, ()) = join!(first, second);
        assert_eq!(first, Outcome::Applied);

        let mine = own_comment(&server, None, "again").await;
        assert_eq!(section.refresh().await, Outcome::Applied);
        let hold = server.hold(Op::LikeComment);
        let like = section.toggle_like(mine);
        let edit = async {
            section.request_edit(mine);
            assert_eq!(
                section.confirm_edit(mine, "while liking").await,
                Outcome::Skipped(Skip::Busy)
            );
            assert_eq!(section.edit_draft(mine).as_deref(), Some("while liking"));
            hold.release();
        };
        let (like, ()) = join!(like, edit);
        assert_eq!(like, Outcome::Applied);
        assert_eq!(server.calls(Op::PatchComment), 1);
    }

    #[tokio::test]
    async fn declined_delete_does_nothing() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "keep").await;
        let prompts = Rc::new(Cell::new(0));
        let asked = prompts.clone();
        let (notices, section) = loaded(&server, move |prompt: &str| {
            assert_eq!(prompt, Locale::En.delete_prompt());
            asked.set(asked.get() + 1);
            false
        })
        .await;
        assert_eq!(
            section.request_delete(mine).await,
            Outcome::Skipped(Skip::Declined)
        );
        assert_eq!(prompts.get(), 1);
        assert!(!section.comment(mine).unwrap().is_locked);
        assert_eq!(server.calls(Op::PatchComment), 0);
        assert!(notices.borrow().is_empty());

        assert_eq!(
            section.request_delete(CommentId(99)).await,
            Outcome::Skipped(Skip::NotFound)
        );
        assert_eq!(prompts.get(), 1);
    }

    #[tokio::test]
    async fn delete_locks_in_place() {
        let server = Rc::new(MockServer::new());
        let first = server.seed_comment(POST, None, "amy", "first");
        let mine = own_comment(&server, None, "bye").await;
        let last_one = server.seed_comment(POST, None, "bob", "last");
        let (notices, section) = loaded(&server, yes).await;
        section.open_reply(first);
        let hold = server.hold(Op::PatchComment);
        let pending = section.request_delete(mine);
        let meanwhile = async {
            assert!(section.comment(mine).unwrap().is_locked);
            assert!(section.is_pending(mine));
            hold.release();
        };
        let (outcome, ()) = join!(pending, meanwhile);
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(section.reply_session(), ReplySession::Idle);
        assert!(server.comment(POST, mine).unwrap().is_locked);
        let ids = section.comments().iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![first, mine, last_one]);
        let view = section.view(Utc::now());
        assert_eq!(view.roots[1].text, Locale::En.deleted_placeholder());
        assert_eq!(last(&notices), Notice::success(Locale::En.comment_deleted()));
    }

    #[tokio::test]
    async fn failed_delete_restores_comment() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "still here").await;
        let (notices, section) = loaded(&server, yes).await;
        server.fail(Op::PatchComment);
        assert!(matches!(
            section.request_delete(mine).await,
            Outcome::RolledBack(_)
        ));
        let c = section.comment(mine).unwrap();
        assert!(!c.is_locked);
        assert_eq!(c.display_content(), Some("still here"));
        assert_eq!(last(&notices).tone, Tone::Failure);
        assert_eq!(server.calls(Op::ListComments), 1);
    }

    #[tokio::test]
    async fn failed_like_after_reload_keeps_server_state() {
        let server = Rc::new(MockServer::new());
        let mine = own_comment(&server, None, "mine").await;
        let (notices, section) = loaded(&server, yes).await;
        server.fail(Op::LikeComment);
        let hold = server.hold(Op::LikeComment);
        let pending = section.toggle_like(mine);
        let meanwhile = async {
            server.patch_comment(mine, CommentPatch::lock()).await.unwrap();
            assert_eq!(section.refresh().await, Outcome::Applied);
            let c = section.comment(mine).unwrap();
            assert!(c.is_locked);
            assert_eq!((c.is_liked, c.likes_count), (true, 1));
            hold.release();
        };
        let (outcome, ()) = join!(pending, meanwhile);
        assert!(matches!(outcome, Outcome::RolledBack(_)));
        let c = section.comment(mine).unwrap();
        assert!(c.is_locked);
        assert_eq!((c.is_liked, c.likes_count), (false, 0));
        assert!(!section.is_pending(mine));
        assert_eq!(last(&notices).tone, Tone::Failure);
    }

    #[tokio::test]
    async fn reply_under_wrong_root_is_counted_but_not_shown() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "first");
        let b = server.seed_comment(POST, None, "bob", "second");
        // parent is under a, root claims b
        server.seed_raw_comment(POST, crate::testing::comment(50, Some(a.0), Some(b.0)));
        let (_, section) = loaded(&server, yes).await;
        assert_eq!(section.comments().len(), 3);

        let tree = section.tree();
        assert!(tree.replies(a).is_empty());
        assert!(tree.replies(b).is_empty());

        let view = section.view(Utc::now());
        assert_eq!(view.comment_count, 3);
        assert_eq!(view.roots.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a, b]);
        assert!(view.roots.iter().all(|r| r.replies.is_empty()));
    }

    #[tokio::test]
    async fn replies_toggle_per_root() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let r = server.seed_comment(POST, Some(a), "bob", "reply");
        let (_, section) = loaded(&server, yes).await;
        let view = section.view(Utc::now());
        assert!(!view.roots[0].replies_expanded);
        assert_eq!(view.roots[0].replies_toggle_label.as_deref(), Some("View 1 reply"));

        assert!(section.toggle_replies(a));
        assert!(!section.toggle_replies(r));
        assert!(!section.toggle_replies(CommentId(99)));
        assert_eq!(section.refresh().await, Outcome::Applied);
        assert!(section.replies_shown(a));
        let view = section.view(Utc::now());
        assert!(view.roots[0].replies_expanded);
        assert_eq!(view.roots[0].replies_toggle_label.as_deref(), Some("Hide replies"));

        assert!(!section.toggle_replies(a));
        assert!(!section.replies_shown(a));
    }

    #[tokio::test]
    async fn like_is_optimistic_and_not_reloaded() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let (notices, section) = loaded(&server, yes).await;
        let hold = server.hold(Op::LikeComment);
        let pending = section.toggle_like(a);
        let meanwhile = async {
            let c = section.comment(a).unwrap();
            assert_eq!((c.is_liked, c.likes_count), (true, 1));
            assert_eq!(
                section.toggle_like(a).await,
                Outcome::Skipped(Skip::Busy)
            );
            hold.release();
        };
        let (outcome, ()) = join!(pending, meanwhile);
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(server.calls(Op::LikeComment), 1);
        assert_eq!(server.calls(Op::ListComments), 1);
        assert_eq!(
            notices.borrow().as_slice(),
            &[Notice::success(Locale::En.like_saved(true))]
        );

        server.fail_next(Op::LikeComment);
        assert!(matches!(section.toggle_like(a).await, Outcome::RolledBack(_)));
        let c = section.comment(a).unwrap();
        assert_eq!((c.is_liked, c.likes_count), (true, 1));
    }

    #[tokio::test]
    async fn close_discards_late_answers() {
        let server = Rc::new(MockServer::new());
        let a = server.seed_comment(POST, None, "amy", "top");
        let (notices, section) = loaded(&server, yes).await;
        let like_hold = server.hold(Op::LikeComment);
        let list_hold = server.hold(Op::ListComments);
        let like = section.toggle_like(a);
        let reload = section.refresh();
        let teardown = async {
            server.seed_comment(POST, None, "bob", "late");
            section.close();
            like_hold.release();
            list_hold.release();
        };
        let (like, reload, ()) = join!(like, reload, teardown);
        assert_eq!(like, Outcome::Discarded);
        assert_eq!(reload, Outcome::Discarded);
        assert_eq!(section.comments().len(), 1);
        assert!(notices.borrow().is_empty());
        assert_eq!(section.submit_root_comment("hi").await, Outcome::Discarded);
        assert_eq!(server.calls(Op::CreateComment), 0);
    }
}
