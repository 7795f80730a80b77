use crate::BoardId;

const DEFAULT_MODERATOR_COLOR: &str = "#000000";

/// A board as the list view shows it
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub description: String,
    pub avatar: Option<String>,
    pub color: String,
    pub url: String,
    pub moderator: String,
    pub moderator_avatar: Option<String>,
    pub moderator_group_color: String,
    pub posts_count: u64,

    // follower_count and is_follow only ever change together
    pub follower_count: u64,
    pub is_follow: bool,
}

/// A board as `GET /boards` returns it
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardListing {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub moderator: String,
    #[serde(default)]
    pub moderator_avatar: Option<String>,
    #[serde(default)]
    pub moderator_group_color: Option<String>,
    #[serde(default)]
    pub posts_count: Option<u64>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub is_followed: Option<bool>,
}

impl From<BoardListing> for Board {
    fn from(b: BoardListing) -> Board {
        Board {
            id: b.id,
            title: b.name,
            description: b.description,
            avatar: b.avatar.filter(|a| !a.is_empty()),
            color: b.color,
            url: b.url,
            moderator: b.moderator,
            moderator_avatar: b.moderator_avatar.filter(|a| !a.is_empty()),
            moderator_group_color: b
                .moderator_group_color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| String::from(DEFAULT_MODERATOR_COLOR)),
            posts_count: b.posts_count.unwrap_or(0),
            follower_count: b.follower_count.unwrap_or(0),
            is_follow: b.is_followed.unwrap_or(false),
        }
    }
}

/// Answer to a follow toggle. Every field is optional: the server may only
/// return a message, in which case the optimistic values stand.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_follow: Option<bool>,
    #[serde(default)]
    pub follower_count: Option<u64>,
}
