use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Stories REST endpoint, e.g. `https://site/wp-json/web-stories/v1/web-story`.
    pub story_api: String,
    /// Editor base URL including its query string; `&post=<id>` is appended.
    pub edit_story_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            story_api: String::new(),
            edit_story_url: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub application_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: None,
            application_password: None,
        }
    }
}
