use async_trait::async_trait;

use crate::{
    BoardId, BoardListing, Comment, CommentId, CommentPatch, CreatedComment, Error, FollowState,
    LikeState, NewComment, PostId,
};

/// Data-access collaborator. Any failure, whatever its transport-level
/// cause, comes back as an `Error`.
#[async_trait(?Send)]
pub trait Remote {
    /// Pages start at 1
    async fn list_comments(&self, post: PostId, page: u32) -> Result<Vec<Comment>, Error>;
    async fn create_comment(&self, c: NewComment) -> Result<CreatedComment, Error>;
    async fn patch_comment(&self, id: CommentId, patch: CommentPatch) -> Result<(), Error>;
    async fn like_comment(&self, id: CommentId) -> Result<LikeState, Error>;
    async fn follow_board(&self, id: &BoardId) -> Result<FollowState, Error>;
    async fn list_boards(&self) -> Result<Vec<BoardListing>, Error>;
}

#[async_trait(?Send)]
impl<T: Remote + ?Sized> Remote for std::rc::Rc<T> {
    async fn list_comments(&self, post: PostId, page: u32) -> Result<Vec<Comment>, Error> {
        (**self).list_comments(post, page).await
    }

    async fn create_comment(&self, c: NewComment) -> Result<CreatedComment, Error> {
        (**self).create_comment(c).await
    }

    async fn patch_comment(&self, id: CommentId, patch: CommentPatch) -> Result<(), Error> {
        (**self).patch_comment(id, patch).await
    }

    async fn like_comment(&self, id: CommentId) -> Result<LikeState, Error> {
        (**self).like_comment(id).await
    }

    async fn follow_board(&self, id: &BoardId) -> Result<FollowState, Error> {
        (**self).follow_board(id).await
    }

    async fn list_boards(&self) -> Result<Vec<BoardListing>, Error> {
        (**self).list_boards().await
    }
}
