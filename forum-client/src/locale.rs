use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Unit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl Locale {
    pub(crate) fn ago(&self, n: i64, unit: Unit) -> String {
        match self {
            Locale::En => {
                let unit = match unit {
                    Unit::Year => "years",
                    Unit::Month => "months",
                    Unit::Day => "days",
                    Unit::Hour => "hours",
                    Unit::Minute => "minutes",
                };
                format!("{n} {unit} ago")
            }
            Locale::ZhTw => {
                let unit = match unit {
                    Unit::Year => "年前",
                    Unit::Month => "個月前",
                    Unit::Day => "天前",
                    Unit::Hour => "小時前",
                    Unit::Minute => "分鐘前",
                };
                format!("{n} {unit}")
            }
        }
    }

    pub fn just_now(&self) -> &'static str {
        match self {
            Locale::En => "just now",
            Locale::ZhTw => "剛剛",
        }
    }

    pub fn comment_posted(&self) -> &'static str {
        match self {
            Locale::En => "Comment posted",
            Locale::ZhTw => "留言成功",
        }
    }

    pub fn reply_posted(&self) -> &'static str {
        match self {
            Locale::En => "Reply posted",
            Locale::ZhTw => "回覆成功",
        }
    }

    pub fn comment_updated(&self) -> &'static str {
        match self {
            Locale::En => "Comment updated",
            Locale::ZhTw => "留言已更新",
        }
    }

    pub fn comment_deleted(&self) -> &'static str {
        match self {
            Locale::En => "Comment deleted",
            Locale::ZhTw => "留言已刪除",
        }
    }

    pub fn like_saved(&self, liked: bool) -> &'static str {
        match (self, liked) {
            (Locale::En, true) => "Liked",
            (Locale::En, false) => "Like removed",
            (Locale::ZhTw, true) => "已按讚",
            (Locale::ZhTw, false) => "已取消讚",
        }
    }

    pub fn follow_saved(&self, following: bool) -> &'static str {
        match (self, following) {
            (Locale::En, true) => "Following board",
            (Locale::En, false) => "Unfollowed board",
            (Locale::ZhTw, true) => "已追蹤",
            (Locale::ZhTw, false) => "已取消追蹤",
        }
    }

    pub fn operation_failed(&self) -> &'static str {
        match self {
            Locale::En => "Operation failed, please retry",
            Locale::ZhTw => "操作失敗，請重試",
        }
    }

    pub fn load_failed(&self) -> &'static str {
        match self {
            Locale::En => "Could not load, please retry",
            Locale::ZhTw => "載入失敗，請重試",
        }
    }

    pub fn delete_prompt(&self) -> &'static str {
        match self {
            Locale::En => "Delete this comment?",
            Locale::ZhTw => "確定要刪除嗎？",
        }
    }

    pub fn deleted_placeholder(&self) -> &'static str {
        match self {
            Locale::En => "This comment has been deleted",
            Locale::ZhTw => "此留言已被刪除",
        }
    }

    pub fn empty_thread(&self) -> &'static str {
        match self {
            Locale::En => "No comments yet, be the first to leave one!",
            Locale::ZhTw => "還沒有留言，快來留下第一則留言吧！",
        }
    }

    pub fn show_replies(&self, n: usize) -> String {
        match self {
            Locale::En if n == 1 => String::from("View 1 reply"),
            Locale::En => format!("View {n} replies"),
            Locale::ZhTw => format!("查看 {n} 則回覆"),
        }
    }

    pub fn hide_replies(&self) -> &'static str {
        match self {
            Locale::En => "Hide replies",
            Locale::ZhTw => "收起回覆",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::En => "en",
            Locale::ZhTw => "zh-TW",
        })
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown locale {0:?}, expected en or zh-TW")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Locale, UnknownLocale> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "zh-tw" | "zh-hant" => Ok(Locale::ZhTw),
            _ => Err(UnknownLocale(String::from(s))),
        }
    }
}
