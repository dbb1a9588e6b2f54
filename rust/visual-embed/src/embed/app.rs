use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{EmbedError, Param, browser::Browser, sdk::Settings};

use super::{DEFAULT_FULL_HEIGHT, EmbedCore, ViewConfig};

/// Pages of the application that can be opened first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Home page
    #[default]
    Home,
    /// Search page
    Search,
    /// Saved answers listing
    Answers,
    /// Liveboards listing
    Liveboards,
    /// Liveboards listing under its former name
    Pinboards,
    /// Data management page
    Data,
}

impl Page {
    /// The application route of this page
    pub fn route(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Search => "answer",
            Page::Answers => "answers",
            Page::Liveboards | Page::Pinboards => "pinboards",
            Page::Data => "data/tables",
        }
    }
}

/// Configuration of a full application embed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppViewConfig {
    /// Settings shared with every view
    #[serde(flatten)]
    pub view: ViewConfig,
    /// Show the application's main navigation bar
    #[serde(default)]
    pub show_primary_navbar: bool,
    /// Hide the profile and help buttons in the navigation bar
    #[serde(default)]
    pub disable_profile_and_help: bool,
    /// Grow the frame to the height of the page shown
    #[serde(default)]
    pub full_height: bool,
    /// Minimum height in pixels when `full_height` is set
    #[serde(default)]
    pub default_height: Option<u32>,
    /// A path inside the application. Takes precedence over `page_id`.
    #[serde(default)]
    pub path: Option<String>,
    /// The page to open first
    #[serde(default)]
    pub page_id: Option<Page>,
    /// Restrict listings to objects carrying this tag
    #[serde(default)]
    pub tag: Option<String>,
    /// Ids of objects to hide
    #[serde(default)]
    pub hide_objects: Vec<String>,
}

impl AppViewConfig {
    /// A configuration opening the home page
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `page` first
    pub fn with_page(mut self, page: Page) -> Self {
        self.page_id = Some(page);
        self
    }

    /// Open `path` first
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Show or hide the navigation bar
    pub fn with_primary_navbar(mut self, show: bool) -> Self {
        self.show_primary_navbar = show;
        self
    }

    /// Grow the frame to the height of the page shown
    pub fn with_full_height(mut self, full_height: bool) -> Self {
        self.full_height = full_height;
        self
    }

    /// Filter listings by `tag`
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Replace the shared view settings
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    pub(super) fn min_height(&self) -> u32 {
        self.default_height.unwrap_or(DEFAULT_FULL_HEIGHT)
    }

    /// The route opened first: the explicit path without a leading slash,
    /// or the route of the configured page.
    pub fn route(&self) -> String {
        match self.path.as_deref().filter(|path| !path.is_empty()) {
            Some(path) => path.strip_prefix('/').unwrap_or(path).to_string(),
            None => self.page_id.unwrap_or_default().route().to_string(),
        }
    }
}

pub(super) fn frame_url<B: Browser>(
    core: &EmbedCore<B>,
    settings: &Settings<B>,
    config: &AppViewConfig,
) -> Result<String, EmbedError> {
    let mut params = core.base_params(settings)?;
    if config.full_height {
        params.insert(Param::FULL_HEIGHT, true);
    }
    if let Some(tag) = config.tag.as_deref() {
        params.insert(Param::TAG, tag);
    }
    if !config.hide_objects.is_empty() {
        params.insert(Param::HIDE_OBJECTS, json!(config.hide_objects));
    }

    let query = core.query_string(&params);
    let base = core.v1_base_path(
        settings,
        &query,
        Some((config.show_primary_navbar, config.disable_profile_and_help)),
    );
    Ok(format!("{base}/{}", config.route()))
}
