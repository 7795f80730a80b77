use async_trait::async_trait;
use forum_client::api::{
    BoardId, BoardListing, Comment, CommentId, CommentPatch, CreatedComment, Envelope, Error,
    FollowState, LikeState, NewComment, PostId, Remote,
};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// `Remote` backed by the forum's REST endpoints
pub struct HttpRemote {
    client: reqwest::Client,
    host: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(host: &str, token: Option<String>) -> HttpRemote {
        HttpRemote {
            client: reqwest::Client::new(),
            host: String::from(host.trim_end_matches('/')),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Envelope<T>, Error> {
        let req = match &self.token {
            Some(tok) => req.bearer_auth(tok),
            None => req,
        };
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        if !status.is_success() {
            tracing::debug!(%status, "server refused request");
            return Err(Error::from_response(status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait(?Send)]
impl Remote for HttpRemote {
    async fn list_comments(&self, post: PostId, page: u32) -> Result<Vec<Comment>, Error> {
        let req = self
            .client
            .get(self.url("comment"))
            .query(&[("post", post.0.to_string()), ("page", page.to_string())]);
        Ok(self.send(req).await?.data)
    }

    async fn create_comment(&self, c: NewComment) -> Result<CreatedComment, Error> {
        let req = self.client.post(self.url("comment")).json(&c);
        Ok(self.send(req).await?.data)
    }

    async fn patch_comment(&self, id: CommentId, patch: CommentPatch) -> Result<(), Error> {
        let req = self
            .client
            .patch(self.url(&format!("comment/{id}")))
            .json(&patch);
        self.send::<Option<serde_json::Value>>(req).await?;
        Ok(())
    }

    async fn like_comment(&self, id: CommentId) -> Result<LikeState, Error> {
        let req = self.client.post(self.url(&format!("comment/{id}/like/")));
        Ok(self
            .send::<Option<LikeState>>(req)
            .await?
            .data
            .unwrap_or_default())
    }

    async fn follow_board(&self, id: &BoardId) -> Result<FollowState, Error> {
        let req = self.client.post(self.url(&format!("boards/{id}/follow")));
        let res = self.send::<Option<FollowState>>(req).await?;
        let mut state = res.data.unwrap_or_default();
        if state.message.is_none() {
            state.message = res.message;
        }
        Ok(state)
    }

    async fn list_boards(&self) -> Result<Vec<BoardListing>, Error> {
        let req = self.client.get(self.url("boards"));
        Ok(self.send(req).await?.data)
    }
}
