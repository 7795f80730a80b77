use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
};

use async_trait::async_trait;
use chrono::Utc;
use forum_api::{
    BoardId, BoardListing, Comment, CommentId, CommentPatch, CreatedComment, Error, FollowState,
    LikeState, NewComment, PostId, Remote, Time,
};
use futures::channel::oneshot;

/// Endpoints of the forum server, for failure injection and call counting
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Op {
    ListComments,
    CreateComment,
    PatchComment,
    LikeComment,
    FollowBoard,
    ListBoards,
}

/// In-memory forum server, seen from one viewing user
pub struct MockServer {
    db: RefCell<Db>,
    page_size: usize,
}

#[derive(Default)]
struct Db {
    // server order, ie. creation order
    posts: BTreeMap<PostId, Vec<Comment>>,
    boards: Vec<BoardListing>,
    next_comment_id: i64,
    failing: HashSet<Op>,
    fail_next: HashMap<Op, usize>,
    holds: HashMap<Op, VecDeque<oneshot::Receiver<()>>>,
    calls: HashMap<Op, usize>,
}

/// Keeps one call waiting until released or dropped
pub struct Hold(oneshot::Sender<()>);

impl Hold {
    pub fn release(self) {
        // the call may already have been abandoned
        let _ = self.0.send(());
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::with_page_size(20)
    }

    pub fn with_page_size(page_size: usize) -> MockServer {
        MockServer {
            db: RefCell::new(Db {
                next_comment_id: 1,
                ..Db::default()
            }),
            page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Adds a comment as another user would, computing its root from its
    /// parent. Panics if the parent does not exist.
    pub fn seed_comment(
        &self,
        post: PostId,
        parent: Option<CommentId>,
        author: &str,
        content: &str,
    ) -> CommentId {
        self.db
            .borrow_mut()
            .insert_comment(post, parent, author, content, false)
            .unwrap_or_else(|e| panic!("seeding comment under {parent:?}: {e}"))
    }

    /// Stores a comment as-is, even with broken linkage
    pub fn seed_raw_comment(&self, post: PostId, c: Comment) {
        let mut db = self.db.borrow_mut();
        db.next_comment_id = db.next_comment_id.max(c.id.0 + 1);
        db.posts.entry(post).or_insert_with(Vec::new).push(c);
    }

    pub fn seed_board(&self, b: BoardListing) {
        self.db.borrow_mut().boards.push(b);
    }

    pub fn comments(&self, post: PostId) -> Vec<Comment> {
        self.db
            .borrow()
            .posts
            .get(&post)
            .cloned()
            .unwrap_or_default()
    }

    pub fn comment(&self, post: PostId, id: CommentId) -> Option<Comment> {
        self.comments(post).into_iter().find(|c| c.id == id)
    }

    pub fn board(&self, id: &BoardId) -> Option<BoardListing> {
        self.db
            .borrow()
            .boards
            .iter()
            .find(|b| b.id == *id)
            .cloned()
    }

    /// Every later call to `op` fails until `heal`
    pub fn fail(&self, op: Op) {
        self.db.borrow_mut().failing.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.db.borrow_mut().failing.remove(&op);
    }

    /// Only the next call to `op` fails
    pub fn fail_next(&self, op: Op) {
        *self.db.borrow_mut().fail_next.entry(op).or_insert(0) += 1;
    }

    /// The next call to `op` waits for the returned `Hold` to be released
    /// before doing anything
    pub fn hold(&self, op: Op) -> Hold {
        let (sender, receiver) = oneshot::channel();
        self.db
            .borrow_mut()
            .holds
            .entry(op)
            .or_insert_with(VecDeque::new)
            .push_back(receiver);
        Hold(sender)
    }

    pub fn calls(&self, op: Op) -> usize {
        self.db.borrow().calls.get(&op).copied().unwrap_or(0)
    }

    /// Counts the call, waits for any hold, then reports injected failures
    async fn enter(&self, op: Op) -> Result<(), Error> {
        let hold = {
            let mut db = self.db.borrow_mut();
            *db.calls.entry(op).or_insert(0) += 1;
            db.holds.get_mut(&op).and_then(|h| h.pop_front())
        };
        if let Some(hold) = hold {
            // a dropped Hold releases too
            let _ = hold.await;
        }
        let mut db = self.db.borrow_mut();
        if let Some(n) = db.fail_next.get_mut(&op) {
            if *n > 0 {
                *n -= 1;
                tracing::debug!(?op, "injecting one-off failure");
                return Err(Error::Network(format!("injected failure on {op:?}")));
            }
        }
        if db.failing.contains(&op) {
            tracing::debug!(?op, "injecting failure");
            return Err(Error::Unknown(format!("{op:?} is failing")));
        }
        Ok(())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

impl Db {
    fn now() -> Time {
        Utc::now()
    }

    fn insert_comment(
        &mut self,
        post: PostId,
        parent: Option<CommentId>,
        author: &str,
        content: &str,
        is_mine: bool,
    ) -> Result<CommentId, Error> {
        let root = match parent {
            None => None,
            Some(p) => {
                let above = self
                    .posts
                    .get(&post)
                    .and_then(|comments| comments.iter().find(|c| c.id == p))
                    .ok_or(Error::NotFound)?;
                Some(above.root.unwrap_or(above.id))
            }
        };
        let id = CommentId(self.next_comment_id);
        self.next_comment_id += 1;
        self.posts.entry(post).or_insert_with(Vec::new).push(Comment {
            id,
            content: String::from(content),
            parent_id: parent,
            root,
            created_at: Db::now(),
            is_mine,
            is_locked: false,
            author_name: String::from(author),
            author_group_name: String::new(),
            author_group_color: String::new(),
            author_avatar: None,
            is_liked: false,
            likes_count: 0,
        });
        Ok(id)
    }

    fn find_comment(&mut self, id: CommentId) -> Result<&mut Comment, Error> {
        self.posts
            .values_mut()
            .flat_map(|comments| comments.iter_mut())
            .find(|c| c.id == id)
            .ok_or(Error::NotFound)
    }
}

#[async_trait(?Send)]
impl Remote for MockServer {
    async fn list_comments(&self, post: PostId, page: u32) -> Result<Vec<Comment>, Error> {
        self.enter(Op::ListComments).await?;
        let skip = (page.max(1) as usize - 1) * self.page_size;
        Ok(self
            .comments(post)
            .into_iter()
            .skip(skip)
            .take(self.page_size)
            .collect())
    }

    async fn create_comment(&self, c: NewComment) -> Result<CreatedComment, Error> {
        self.enter(Op::CreateComment).await?;
        let comment_id =
            self.db
                .borrow_mut()
                .insert_comment(c.post, c.parent, "me", &c.content, true)?;
        Ok(CreatedComment { comment_id })
    }

    async fn patch_comment(&self, id: CommentId, patch: CommentPatch) -> Result<(), Error> {
        self.enter(Op::PatchComment).await?;
        let mut db = self.db.borrow_mut();
        let c = db.find_comment(id)?;
        if !c.is_mine {
            return Err(Error::PermissionDenied);
        }
        match patch {
            CommentPatch::Content { content } => c.content = content,
            CommentPatch::Lock { is_locked } => c.is_locked = is_locked,
        }
        Ok(())
    }

    async fn like_comment(&self, id: CommentId) -> Result<LikeState, Error> {
        self.enter(Op::LikeComment).await?;
        let mut db = self.db.borrow_mut();
        let c = db.find_comment(id)?;
        c.is_liked = !c.is_liked;
        c.likes_count = match c.is_liked {
            true => c.likes_count + 1,
            false => c.likes_count.saturating_sub(1),
        };
        Ok(LikeState {
            is_liked: Some(c.is_liked),
            likes_count: Some(c.likes_count),
        })
    }

    async fn follow_board(&self, id: &BoardId) -> Result<FollowState, Error> {
        self.enter(Op::FollowBoard).await?;
        let mut db = self.db.borrow_mut();
        let b = db
            .boards
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or(Error::NotFound)?;
        let now_followed = !b.is_followed.unwrap_or(false);
        let count = b.follower_count.unwrap_or(0);
        b.is_followed = Some(now_followed);
        b.follower_count = Some(match now_followed {
            true => count + 1,
            false => count.saturating_sub(1),
        });
        Ok(FollowState {
            message: Some(String::from(match now_followed {
                true => "followed",
                false => "unfollowed",
            })),
            is_follow: b.is_followed,
            follower_count: b.follower_count,
        })
    }

    async fn list_boards(&self) -> Result<Vec<BoardListing>, Error> {
        self.enter(Op::ListBoards).await?;
        Ok(self.db.borrow().boards.clone())
    }
}
