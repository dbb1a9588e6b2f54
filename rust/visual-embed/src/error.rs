use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// The configured host could not be parsed as a URL-shaped string
    #[error("Error parsing the ThoughtSpot host, please provide a valid URL: {0}")]
    InvalidHost(String),

    /// The selected auth strategy is missing a required field
    #[error("Missing auth configuration: {0}")]
    MissingAuthConfig(String),

    /// An embed was rendered before the SDK was initialised
    #[error("You need to init the ThoughtSpot SDK module first")]
    NotInitialized,

    /// Both a visible and a hidden action list were configured
    #[error("You cannot have both hidden actions and visible actions")]
    ConflictingActions,

    /// A liveboard or visualization embed was rendered without an id
    #[error("Please provide either liveboardId or pinboardId")]
    MissingLiveboardId,

    /// An event handler was registered after `render` was called
    #[error("Please register event handlers before calling render")]
    HandlerAfterRender,

    /// An operation that needs the frame was invoked before `render`
    #[error("Please call render before invoking this method")]
    NotRendered,

    /// Authentication failed in a way that could not resolve to a logged-out state
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A request to the embedded application's server failed
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The host page rejected an operation
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Errors surfaced by an authentication flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The strategy cannot run with the given configuration
    #[error("Missing auth configuration: {0}")]
    MissingConfig(String),
}

/// Errors produced by an [`HttpClient`](crate::http::HttpClient)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The request could not be sent or no response arrived
    #[error("HTTP request to {url} failed: {reason}")]
    Request {
        /// The requested URL
        url: String,
        /// What went wrong
        reason: String,
    },

    /// The response body could not be read or decoded
    #[error("Unable to read response from {url}: {reason}")]
    Body {
        /// The requested URL
        url: String,
        /// What went wrong
        reason: String,
    },
}

/// Errors raised by a [`Browser`](crate::browser::Browser) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// The frame has no content window to post to
    #[error("The frame has no content window")]
    NoContentWindow,

    /// A message could not be delivered
    #[error("Unable to post message: {0}")]
    PostMessage(String),

    /// A DOM operation failed
    #[error("DOM operation failed: {0}")]
    Dom(String),
}
