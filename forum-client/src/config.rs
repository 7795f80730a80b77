use crate::Locale;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Number of comments the server returns per full page
    pub page_size: usize,

    /// Upper bound on the pages fetched by one refresh
    pub max_pages: u32,

    pub locale: Locale,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            page_size: 20,
            max_pages: 50,
            locale: Locale::En,
        }
    }
}
