//! Wire-level vocabulary shared with the embedded application: event names,
//! host commands, menu actions, runtime filters and query parameter keys.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Events the embedded application (or the SDK itself) emits to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbedEvent {
    /// Rendering of the frame has started
    #[serde(rename = "init")]
    Init,
    /// The embedded app pushed its session descriptor
    #[serde(rename = "authInit")]
    AuthInit,
    /// The frame finished loading
    #[serde(rename = "load")]
    Load,
    /// Answer data changed
    #[serde(rename = "data")]
    Data,
    /// Filters changed inside the embedded view
    #[serde(rename = "filtersChanged")]
    FiltersChanged,
    /// The search query changed
    #[serde(rename = "queryChanged")]
    QueryChanged,
    /// A drill down was performed
    #[serde(rename = "drillDown")]
    Drilldown,
    /// The data sources selection changed
    #[serde(rename = "dataSourceSelected")]
    DataSourceSelected,
    /// A custom action was clicked
    #[serde(rename = "customAction")]
    CustomAction,
    /// A chart point was double clicked
    #[serde(rename = "vizPointDoubleClick")]
    VizPointDoubleClick,
    /// An error occurred in the SDK or the embedded app
    #[serde(rename = "Error")]
    Error,
    /// The embedded app raised an alert
    #[serde(rename = "alert")]
    Alert,
    /// The embedded session expired
    #[serde(rename = "ThoughtspotAuthExpired")]
    AuthExpire,
    /// The embedded content reported its height
    #[serde(rename = "EMBED_HEIGHT")]
    EmbedHeight,
    /// The embedded content asked for the frame's visible centre
    #[serde(rename = "EmbedIframeCenter")]
    EmbedIframeCenter,
    /// The route inside the embedded app changed
    #[serde(rename = "ROUTE_CHANGE")]
    RouteChange,
    /// Legacy name of [`EmbedEvent::Data`] used by v1 embeds
    #[serde(rename = "exportVizDataToParent")]
    V1Data,
    /// Third party cookies are blocked
    #[serde(rename = "noCookieAccess")]
    NoCookieAccess,
    /// The SSO popup finished authenticating
    #[serde(rename = "samlComplete")]
    SamlComplete,
    /// A dialog opened inside the embedded app
    #[serde(rename = "dialog-open")]
    DialogOpen,
    /// A dialog closed inside the embedded app
    #[serde(rename = "dialog-close")]
    DialogClose,
}

impl EmbedEvent {
    /// The string that identifies this event on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedEvent::Init => "init",
            EmbedEvent::AuthInit => "authInit",
            EmbedEvent::Load => "load",
            EmbedEvent::Data => "data",
            EmbedEvent::FiltersChanged => "filtersChanged",
            EmbedEvent::QueryChanged => "queryChanged",
            EmbedEvent::Drilldown => "drillDown",
            EmbedEvent::DataSourceSelected => "dataSourceSelected",
            EmbedEvent::CustomAction => "customAction",
            EmbedEvent::VizPointDoubleClick => "vizPointDoubleClick",
            EmbedEvent::Error => "Error",
            EmbedEvent::Alert => "alert",
            EmbedEvent::AuthExpire => "ThoughtspotAuthExpired",
            EmbedEvent::EmbedHeight => "EMBED_HEIGHT",
            EmbedEvent::EmbedIframeCenter => "EmbedIframeCenter",
            EmbedEvent::RouteChange => "ROUTE_CHANGE",
            EmbedEvent::V1Data => "exportVizDataToParent",
            EmbedEvent::NoCookieAccess => "noCookieAccess",
            EmbedEvent::SamlComplete => "samlComplete",
            EmbedEvent::DialogOpen => "dialog-open",
            EmbedEvent::DialogClose => "dialog-close",
        }
    }

    /// Events whose name changed between the v1 and v2 embedded apps map
    /// to their v1 name; everything else maps to itself.
    pub fn v1_compatible(self) -> Self {
        match self {
            EmbedEvent::Data => EmbedEvent::V1Data,
            other => other,
        }
    }
}

impl Display for EmbedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands the host sends into the embedded application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostEvent {
    /// Run a search
    #[serde(rename = "search")]
    Search,
    /// Drill down on a data point
    #[serde(rename = "triggerDrillDown")]
    DrillDown,
    /// Apply filters
    #[serde(rename = "filter")]
    Filter,
    /// Reload the frame
    #[serde(rename = "reload")]
    Reload,
    /// Restrict the visualizations shown on a liveboard
    #[serde(rename = "SetPinboardVisibleVizs")]
    SetVisibleVizs,
}

impl HostEvent {
    /// The string that identifies this command on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HostEvent::Search => "search",
            HostEvent::DrillDown => "triggerDrillDown",
            HostEvent::Filter => "filter",
            HostEvent::Reload => "reload",
            HostEvent::SetVisibleVizs => "SetPinboardVisibleVizs",
        }
    }
}

impl Display for HostEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators accepted in a [`RuntimeFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeFilterOp {
    /// Equals
    Eq,
    /// Does not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal to
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Ge,
    /// Contains
    Contains,
    /// Begins with
    BeginsWith,
    /// Ends with
    EndsWith,
    /// Between, inclusive of the upper bound
    BwIncMax,
    /// Between, inclusive of the lower bound
    BwIncMin,
    /// Between, inclusive of both bounds
    BwInc,
    /// Between, exclusive of both bounds
    Bw,
    /// Member of a list
    In,
}

impl RuntimeFilterOp {
    /// The operator name used in the `op{n}` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeFilterOp::Eq => "EQ",
            RuntimeFilterOp::Ne => "NE",
            RuntimeFilterOp::Lt => "LT",
            RuntimeFilterOp::Le => "LE",
            RuntimeFilterOp::Gt => "GT",
            RuntimeFilterOp::Ge => "GE",
            RuntimeFilterOp::Contains => "CONTAINS",
            RuntimeFilterOp::BeginsWith => "BEGINS_WITH",
            RuntimeFilterOp::EndsWith => "ENDS_WITH",
            RuntimeFilterOp::BwIncMax => "BW_INC_MAX",
            RuntimeFilterOp::BwIncMin => "BW_INC_MIN",
            RuntimeFilterOp::BwInc => "BW_INC",
            RuntimeFilterOp::Bw => "BW",
            RuntimeFilterOp::In => "IN",
        }
    }
}

/// An operand of a runtime filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A boolean operand
    Bool(bool),
    /// A numeric operand
    Number(serde_json::Number),
    /// A textual operand
    Text(String),
}

impl Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Bool(value) => write!(f, "{value}"),
            FilterValue::Number(value) => write!(f, "{value}"),
            FilterValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value.into())
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        FilterValue::Number(value.into())
    }
}

/// A column predicate applied to embedded content when it loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeFilter {
    /// The column to filter on
    pub column_name: String,
    /// How the column is compared to the operands
    pub operator: RuntimeFilterOp,
    /// The operands, in order
    pub values: Vec<FilterValue>,
}

impl RuntimeFilter {
    /// Create a runtime filter
    pub fn new(
        column_name: impl Into<String>,
        operator: RuntimeFilterOp,
        values: impl IntoIterator<Item = FilterValue>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            operator,
            values: values.into_iter().collect(),
        }
    }
}

/// How the data sources panel of an embedded search is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceVisualMode {
    /// The panel is hidden
    #[serde(rename = "hide")]
    Hidden,
    /// The panel is collapsed but can be expanded
    #[serde(rename = "collapse")]
    Collapsed,
    /// The panel is expanded
    #[serde(rename = "expand")]
    Expanded,
}

impl DataSourceVisualMode {
    /// The value used in the `dataSourceMode` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceVisualMode::Hidden => "hide",
            DataSourceVisualMode::Collapsed => "collapse",
            DataSourceVisualMode::Expanded => "expand",
        }
    }
}

/// Query parameter keys understood by the embedded application.
pub struct Param;

#[allow(missing_docs)]
impl Param {
    pub const DATA_SOURCES: &'static str = "dataSources";
    pub const DATA_SOURCE_MODE: &'static str = "dataSourceMode";
    pub const DISABLE_ACTIONS: &'static str = "disableAction";
    pub const DISABLE_ACTION_REASON: &'static str = "disableHint";
    pub const FORCE_TABLE: &'static str = "forceTable";
    pub const PREVENT_LIVEBOARD_FILTER_REMOVAL: &'static str = "preventPinboardFilterRemoval";
    pub const HIDE_ACTIONS: &'static str = "hideAction";
    pub const HIDE_OBJECTS: &'static str = "hideObjects";
    pub const HOST_APP_URL: &'static str = "hostAppUrl";
    pub const ENABLE_VIZ_TRANSFORMATIONS: &'static str = "enableVizTransform";
    pub const ENABLE_SEARCH_ASSIST: &'static str = "enableSearchAssist";
    pub const HIDE_RESULT: &'static str = "hideResult";
    pub const USE_LAST_SELECTED_DATA_SOURCE: &'static str = "useLastSelectedSources";
    pub const TAG: &'static str = "tag";
    pub const SEARCH_TOKEN_STRING: &'static str = "searchTokenString";
    pub const EXECUTE_SEARCH: &'static str = "executeSearch";
    pub const FULL_HEIGHT: &'static str = "isFullHeightPinboard";
    pub const LIVEBOARD_EMBED: &'static str = "isLiveboardEmbed";
    pub const VERSION: &'static str = "sdkVersion";
    pub const VIEW_PORT_HEIGHT: &'static str = "viewPortHeight";
    pub const VIEW_PORT_WIDTH: &'static str = "viewPortWidth";
    pub const VISIBLE_ACTIONS: &'static str = "visibleAction";
    pub const CUSTOM_CSS_URL: &'static str = "customCssUrl";
    pub const EMBED_APP: &'static str = "embedApp";
    pub const PRIMARY_NAV_HIDDEN: &'static str = "primaryNavHidden";
    pub const PROFILE_AND_HELP_HIDDEN: &'static str = "profileAndHelpInNavBarHidden";
    pub const BASE64_ENCODED_FLAGS: &'static str = "base64UrlEncodedFlags";
}

/// The data operations a custom action may ask the host to paginate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Fetch a chart together with its data
    GetChartWithData,
    /// Fetch a table together with its headline data
    GetTableWithHeadlineData,
}

impl OperationType {
    /// The GraphQL operation name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::GetChartWithData => "GetChartWithData",
            OperationType::GetTableWithHeadlineData => "GetTableWithHeadlineData",
        }
    }
}

macro_rules! actions {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        /// Menu actions that can be disabled, hidden or made visible in an
        /// embedded view.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Action {
            $(
                $(#[$meta])*
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl Action {
            /// The identifier of this action in the embedded app
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Action::$variant => $name,)*
                }
            }
        }
    };
}

actions! {
    /// Save
    Save => "save",
    /// Update
    Update => "update",
    /// Save an untitled answer
    SaveUntitled => "saveUntitled",
    /// Save as a view
    SaveAsView => "saveAsView",
    /// Make a copy
    MakeACopy => "makeACopy",
    /// Edit a copy
    EditACopy => "editACopy",
    /// Copy a link to the object
    CopyLink => "embedDocument",
    /// Take a liveboard snapshot
    PinboardSnapshot => "pinboardSnapshot",
    /// Reset the layout
    ResetLayout => "resetLayout",
    /// Schedule
    Schedule => "schedule",
    /// List schedules
    SchedulesList => "schedule-list",
    /// Share
    Share => "share",
    /// Add a filter
    AddFilter => "addFilter",
    /// Configure a filter
    ConfigureFilter => "configureFilter",
    /// Add a formula
    AddFormula => "addFormula",
    /// Search on top of an answer
    SearchOnTop => "searchOnTop",
    /// SpotIQ analyze
    SpotIqAnalyze => "spotIQAnalyze",
    /// Explain an insight
    ExplainInsight => "explainInsight",
    /// Follow SpotIQ results
    SpotIqFollow => "spotIQFollow",
    /// Share a visualization
    ShareViz => "shareViz",
    /// Replay a search
    ReplaySearch => "replaySearch",
    /// Show underlying data
    ShowUnderlyingData => "showUnderlyingData",
    /// Download
    Download => "download",
    /// Download as PDF
    DownloadAsPdf => "downloadAsPdf",
    /// Download as CSV
    DownloadAsCsv => "downloadAsCSV",
    /// Download as XLSX
    DownloadAsXlsx => "downloadAsXLSX",
    /// Download a trace
    DownloadTrace => "downloadTrace",
    /// Export TML
    ExportTml => "exportTSL",
    /// Import TML
    ImportTml => "importTSL",
    /// Update TML
    UpdateTml => "updateTSL",
    /// Edit TML
    EditTml => "editTSL",
    /// Present
    Present => "present",
    /// Toggle tile size
    ToggleSize => "toggleSize",
    /// Edit
    Edit => "edit",
    /// Edit the title
    EditTitle => "editTitle",
    /// Delete
    Remove => "delete",
    /// Ungroup
    Ungroup => "ungroup",
    /// Describe
    Describe => "describe",
    /// Relate
    Relate => "relate",
    /// Customize headlines
    CustomizeHeadlines => "customizeHeadlines",
    /// Liveboard info
    PinboardInfo => "pinboardInfo",
    /// Send answer feedback
    SendAnswerFeedback => "sendFeedback",
    /// Custom action
    CustomAction => "customAction",
    /// Download Embrace queries
    DownloadEmbraceQueries => "downloadEmbraceQueries",
    /// Pin to a liveboard
    Pin => "pin",
    /// Analysis info
    AnalysisInfo => "analysisInfo",
    /// Subscription
    Subscription => "subscription",
    /// Explore
    Explore => "explore",
    /// Include a value when drilling
    DrillInclude => "context-menu-item-include",
    /// Exclude a value when drilling
    DrillExclude => "context-menu-item-exclude",
    /// Copy to clipboard
    CopyToClipboard => "context-menu-item-copy-to-clipboard",
    /// Edit from the context menu
    DrillEdit => "context-menu-item-edit",
    /// Edit a measure
    EditMeasure => "context-menu-item-edit-measure",
    /// Context menu separator
    Separator => "context-menu-item-separator",
    /// Drill down
    DrillDown => "DRILL",
    /// Request access
    RequestAccess => "requestAccess",
    /// Query details buttons
    QueryDetailsButtons => "queryDetailsButtons",
}
