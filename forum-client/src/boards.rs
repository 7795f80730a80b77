use std::cell::RefCell;

use crate::{
    api::{Board, BoardId, FollowState, Remote},
    optimistic::{self, InFlight, Mutation, Store},
    ClientConfig, Locale, Notice, Notifier, Outcome,
};

/// Follows an unfollowed board and the other way round
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FollowToggle;

impl Mutation<Board> for FollowToggle {
    type Response = FollowState;

    fn describe(&self) -> &'static str {
        "follow toggle"
    }

    fn optimistic(&self, b: &mut Board) {
        b.is_follow = !b.is_follow;
        b.follower_count = match b.is_follow {
            true => b.follower_count.saturating_add(1),
            false => b.follower_count.saturating_sub(1),
        };
    }

    fn confirmed(&self, b: &mut Board, res: FollowState) {
        if let Some(is_follow) = res.is_follow {
            b.is_follow = is_follow;
        }
        if let Some(count) = res.follower_count {
            b.follower_count = count;
        }
    }

    fn success_message(&self, b: &Board, res: &FollowState, locale: Locale) -> String {
        match res.message.as_deref().filter(|m| !m.is_empty()) {
            Some(m) => String::from(m),
            None => String::from(locale.follow_saved(res.is_follow.unwrap_or(b.is_follow))),
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    boards: Vec<Board>,
    follows: InFlight<BoardId, Board>,
    closed: bool,
}

impl Store<BoardId, Board> for BoardState {
    fn optimistic_parts(
        &mut self,
        id: &BoardId,
    ) -> (&mut InFlight<BoardId, Board>, Option<&mut Board>) {
        (&mut self.follows, self.boards.iter_mut().find(|b| b.id == *id))
    }
}

pub struct BoardList<R, N> {
    remote: R,
    notifier: N,
    config: ClientConfig,
    state: RefCell<BoardState>,
}

impl<R: Remote, N: Notifier> BoardList<R, N> {
    pub fn new(remote: R, notifier: N, config: ClientConfig) -> BoardList<R, N> {
        BoardList {
            remote,
            notifier,
            config,
            state: RefCell::new(BoardState::default()),
        }
    }

    /// Replaces the list with the server's. On failure the list is kept.
    pub async fn refresh(&self) -> Outcome {
        if self.state.borrow().closed {
            return Outcome::Discarded;
        }
        let res = self.remote.list_boards().await;
        let mut state = self.state.borrow_mut();
        if state.closed {
            tracing::debug!("board list closed while loading");
            return Outcome::Discarded;
        }
        match res {
            Ok(listings) => {
                let mut boards = listings.into_iter().map(Board::from).collect::<Vec<_>>();
                for b in boards.iter_mut() {
                    let id = b.id.clone();
                    state.follows.rebase(&id, b);
                }
                state.boards = boards;
                tracing::debug!(boards = state.boards.len(), "loaded boards");
                Outcome::Applied
            }
            Err(err) => {
                drop(state);
                tracing::error!(%err, "failed loading boards");
                self.notifier
                    .notify(Notice::failure(self.config.locale.load_failed()));
                Outcome::Failed(err)
            }
        }
    }

    pub fn boards(&self) -> Vec<Board> {
        self.state.borrow().boards.clone()
    }

    pub fn board(&self, id: &BoardId) -> Option<Board> {
        self.state
            .borrow()
            .boards
            .iter()
            .find(|b| b.id == *id)
            .cloned()
    }

    /// Whether a follow toggle on `id` still awaits the server
    pub fn is_pending(&self, id: &BoardId) -> bool {
        self.state.borrow().follows.is_pending(id)
    }

    pub async fn toggle_follow(&self, id: &BoardId) -> Outcome {
        if self.state.borrow().closed {
            return Outcome::Discarded;
        }
        optimistic::run(
            &self.state,
            id.clone(),
            &FollowToggle,
            || self.remote.follow_board(id),
            &self.notifier,
            self.config.locale,
        )
        .await
    }

    /// Answers that arrive after this are dropped without notice
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.follows.clear();
    }
}
