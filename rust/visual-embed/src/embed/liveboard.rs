use serde::{Deserialize, Serialize};

use crate::{EmbedError, Param, browser::Browser, sdk::Settings};

use super::{DEFAULT_FULL_HEIGHT, EmbedCore, ViewConfig};

/// Configuration of a liveboard or visualization embed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveboardViewConfig {
    /// Settings shared with every view
    #[serde(flatten)]
    pub view: ViewConfig,
    /// Grow the frame to the height of the liveboard
    #[serde(default)]
    pub full_height: bool,
    /// Minimum height in pixels when `full_height` is set
    #[serde(default)]
    pub default_height: Option<u32>,
    /// Allow transformations on visualizations
    #[serde(default)]
    pub enable_viz_transformations: Option<bool>,
    /// The liveboard to show
    #[serde(default)]
    pub liveboard_id: Option<String>,
    /// The liveboard to show, under its former name
    #[serde(default)]
    pub pinboard_id: Option<String>,
    /// A single visualization of the liveboard to show
    #[serde(default)]
    pub viz_id: Option<String>,
    /// Stop users from removing liveboard filters
    #[serde(default)]
    pub prevent_liveboard_filter_removal: bool,
    /// Stop users from removing liveboard filters, under its former name
    #[serde(default)]
    pub prevent_pinboard_filter_removal: bool,
}

impl LiveboardViewConfig {
    /// A configuration showing the liveboard `liveboard_id`
    pub fn new(liveboard_id: impl Into<String>) -> Self {
        Self {
            liveboard_id: Some(liveboard_id.into()),
            ..Default::default()
        }
    }

    /// Show only the visualization `viz_id`
    pub fn with_viz(mut self, viz_id: impl Into<String>) -> Self {
        self.viz_id = Some(viz_id.into());
        self
    }

    /// Grow the frame to the liveboard's height
    pub fn with_full_height(mut self, full_height: bool) -> Self {
        self.full_height = full_height;
        self
    }

    /// Set the minimum full height
    pub fn with_default_height(mut self, height: u32) -> Self {
        self.default_height = Some(height);
        self
    }

    /// Replace the shared view settings
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// The liveboard to show, under either name
    pub fn id(&self) -> Option<&str> {
        self.liveboard_id
            .as_deref()
            .or(self.pinboard_id.as_deref())
    }

    pub(super) fn min_height(&self) -> u32 {
        self.default_height.unwrap_or(DEFAULT_FULL_HEIGHT)
    }
}

pub(super) fn frame_url<B: Browser>(
    core: &EmbedCore<B>,
    settings: &Settings<B>,
    config: &LiveboardViewConfig,
) -> Result<String, EmbedError> {
    let id = config.id().ok_or(EmbedError::MissingLiveboardId)?;

    let mut params = core.base_params(settings)?;
    if config.full_height {
        params.insert(Param::FULL_HEIGHT, true);
    }
    if let Some(enabled) = config.enable_viz_transformations {
        params.insert(Param::ENABLE_VIZ_TRANSFORMATIONS, enabled.to_string());
    }
    if config.prevent_liveboard_filter_removal || config.prevent_pinboard_filter_removal {
        params.insert(Param::PREVENT_LIVEBOARD_FILTER_REMOVAL, true);
    }
    params.insert(Param::LIVEBOARD_EMBED, true);

    let query = core.query_string(&params);
    let mut url = format!("{}/viz/{id}", core.v1_base_path(settings, &query, None));
    if let Some(viz_id) = config.viz_id.as_deref() {
        url = format!("{url}/{viz_id}");
    }
    Ok(url)
}
