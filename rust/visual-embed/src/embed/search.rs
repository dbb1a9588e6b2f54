use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{DataSourceVisualMode, EmbedError, Param, browser::Browser, sdk::Settings};

use super::{EmbedCore, ViewConfig};

/// A search to load the view with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// The search tokens, e.g. `[sales] by [region]`
    pub search_token_string: String,
    /// Run the search on load instead of leaving the tokens in the bar
    #[serde(default)]
    pub execute_search: bool,
}

/// Configuration of a search embed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchViewConfig {
    /// Settings shared with every view
    #[serde(flatten)]
    pub view: ViewConfig,
    /// Collapse the data sources panel on load
    #[serde(default)]
    pub collapse_data_sources: bool,
    /// Hide the data sources panel
    #[serde(default)]
    pub hide_data_sources: bool,
    /// Hide charts and tables of the answer
    #[serde(default)]
    pub hide_results: bool,
    /// Turn on search assist
    #[serde(default)]
    pub enable_search_assist: bool,
    /// Present results as a table by default
    #[serde(default)]
    pub force_table: bool,
    /// Ids of the data sources selected on load
    #[serde(default)]
    pub data_sources: Vec<String>,
    /// The search to load
    #[serde(default)]
    pub search_options: Option<SearchOptions>,
    /// A saved answer to open instead of a new search
    #[serde(default)]
    pub answer_id: Option<String>,
}

impl SearchViewConfig {
    /// A configuration for a new, empty search
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `data_sources` on load
    pub fn with_data_sources<I, S>(mut self, data_sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_sources = data_sources.into_iter().map(Into::into).collect();
        self
    }

    /// Load the search `tokens`, running it when `execute` is set
    pub fn with_search(mut self, tokens: impl Into<String>, execute: bool) -> Self {
        self.search_options = Some(SearchOptions {
            search_token_string: tokens.into(),
            execute_search: execute,
        });
        self
    }

    /// Open the saved answer `answer_id`
    pub fn with_answer(mut self, answer_id: impl Into<String>) -> Self {
        self.answer_id = Some(answer_id.into());
        self
    }

    /// Replace the shared view settings
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// How the data sources panel starts out. Hiding wins over collapsing.
    pub fn data_source_mode(&self) -> DataSourceVisualMode {
        if self.hide_data_sources {
            DataSourceVisualMode::Hidden
        } else if self.collapse_data_sources {
            DataSourceVisualMode::Collapsed
        } else {
            DataSourceVisualMode::Expanded
        }
    }
}

pub(super) fn frame_url<B: Browser>(
    core: &EmbedCore<B>,
    settings: &Settings<B>,
    config: &SearchViewConfig,
) -> Result<String, EmbedError> {
    let mut params = core.base_params(settings)?;
    if !config.data_sources.is_empty() {
        params.insert(Param::DATA_SOURCES, json!(config.data_sources));
    }
    if let Some(search) = config
        .search_options
        .as_ref()
        .filter(|search| !search.search_token_string.is_empty())
    {
        params.insert(
            Param::SEARCH_TOKEN_STRING,
            urlencoding::encode(&search.search_token_string).into_owned(),
        );
        if search.execute_search {
            params.insert(Param::EXECUTE_SEARCH, true);
        }
    }
    if config.enable_search_assist {
        params.insert(Param::ENABLE_SEARCH_ASSIST, true);
    }
    if config.hide_results {
        params.insert(Param::HIDE_RESULT, true);
    }
    if config.force_table {
        params.insert(Param::FORCE_TABLE, true);
    }
    params
        .insert(Param::DATA_SOURCE_MODE, config.data_source_mode().as_str())
        .insert(Param::USE_LAST_SELECTED_DATA_SOURCE, false);

    let answer_path = match config.answer_id.as_deref() {
        Some(id) => format!("saved-answer/{id}"),
        None => "answer".to_string(),
    };
    Ok(format!(
        "{}/{answer_path}",
        core.v2_base_path(settings, params.to_query_string())
    ))
}
