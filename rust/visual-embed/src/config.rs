//! Process-wide embed configuration and the host resolver.

use futures::future::LocalBoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, rc::Rc, sync::LazyLock};

use crate::EmbedError;

/// Keep embed URLs under this length; view configuration travels in query
/// parameters so very large configs can exceed what browsers accept.
pub const URL_MAX_LENGTH: usize = 2000;

/// Default CSS width of the embedded frame
pub const DEFAULT_EMBED_WIDTH: &str = "100%";

/// Default CSS height of the embedded frame
pub const DEFAULT_EMBED_HEIGHT: &str = "100%";

/// Path segment that serves the v2 application
pub const DEFAULT_V2_BASE_PATH: &str = "v2";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"(^(https?:)//)?",           // protocol
        r"(([^:/?#]*)(?::([0-9]+))?)", // host and port
        r"(/?[^?#]*)",                // path
        r"(\?[^#]*|)",                // query
        r"(#.*|)$",                   // hash
    ]
    .concat();
    // The pattern is a constant; a failure here is a programming error.
    Regex::new(&pattern).expect("host pattern is valid")
});

/// The authentication strategies the SDK can run against the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthType {
    /// The host handles authentication itself
    #[default]
    None,
    /// SAML single sign-on
    #[serde(rename = "SSO_SAML")]
    Sso,
    /// OpenID Connect single sign-on
    #[serde(rename = "SSO_OIDC")]
    Oidc,
    /// Trusted authentication through a token server
    AuthServer,
    /// Username and password; intended for development only
    Basic,
}

/// Caller-supplied source of login tokens for [`AuthType::AuthServer`].
#[derive(Clone)]
pub struct TokenProvider(Rc<dyn Fn() -> LocalBoxFuture<'static, Result<String, String>>>);

impl TokenProvider {
    /// Wrap an async token source
    pub fn new<F, Fut>(provider: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<String, String>> + 'static,
    {
        Self(Rc::new(move || Box::pin(provider())))
    }

    /// Fetch a fresh token
    pub fn fetch(&self) -> LocalBoxFuture<'static, Result<String, String>> {
        (self.0)()
    }
}

impl Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenProvider")
    }
}

fn default_auto_login() -> bool {
    true
}

/// The configuration handed to [`Sdk::init`](crate::Sdk::init).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedConfig {
    /// Hostname, IP or URL of the analytics cluster
    pub thought_spot_host: String,

    /// Which authentication strategy to run
    #[serde(default)]
    pub auth_type: AuthType,

    /// Endpoint that returns a login token as plain text
    #[serde(default)]
    pub auth_endpoint: Option<String>,

    /// Alternative to `auth_endpoint`: a callback returning a login token
    #[serde(skip)]
    pub get_auth_token: Option<TokenProvider>,

    /// The user to authenticate as
    #[serde(default)]
    pub username: Option<String>,

    /// Password for [`AuthType::Basic`]
    #[serde(default)]
    pub password: Option<String>,

    /// Run SSO in a popup instead of redirecting the page
    #[serde(default)]
    pub no_redirect: bool,

    /// Overrides the v2 base path segment
    #[serde(default)]
    pub basepath: Option<String>,

    /// Send all query parameters as one base64 encoded flag
    #[serde(default)]
    pub should_encode_url_query_params: bool,

    /// Do not alert when third party cookies are blocked
    #[serde(default)]
    pub suppress_no_cookie_access_alert: bool,

    /// Re-authenticate when the embedded session expires
    #[serde(default = "default_auto_login")]
    pub auto_login: bool,

    /// Prefetch the host's static resources on init
    #[serde(default)]
    pub call_prefetch: bool,

    /// Load frames one at a time
    #[serde(default)]
    pub queue_multi_renders: bool,

    /// Stylesheet the embedded app should load
    #[serde(default)]
    pub custom_css_url: Option<String>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            thought_spot_host: String::new(),
            auth_type: AuthType::None,
            auth_endpoint: None,
            get_auth_token: None,
            username: None,
            password: None,
            no_redirect: false,
            basepath: None,
            should_encode_url_query_params: false,
            suppress_no_cookie_access_alert: false,
            auto_login: true,
            call_prefetch: false,
            queue_multi_renders: false,
            custom_css_url: None,
        }
    }
}

impl EmbedConfig {
    /// Create a configuration for the given host
    pub fn new(thought_spot_host: impl Into<String>) -> Self {
        Self {
            thought_spot_host: thought_spot_host.into(),
            ..Default::default()
        }
    }

    /// Read a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the authentication strategy
    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    /// Set the token endpoint
    pub fn with_auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = Some(endpoint.into());
        self
    }

    /// Set the token callback
    pub fn with_token_provider(mut self, provider: TokenProvider) -> Self {
        self.get_auth_token = Some(provider);
        self
    }

    /// Set the login credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    /// Use the popup SSO flow
    pub fn with_no_redirect(mut self, no_redirect: bool) -> Self {
        self.no_redirect = no_redirect;
        self
    }

    /// Override the v2 base path
    pub fn with_basepath(mut self, basepath: impl Into<String>) -> Self {
        self.basepath = Some(basepath.into());
        self
    }

    /// Encode query parameters into a single base64 flag
    pub fn with_encoded_query_params(mut self, encode: bool) -> Self {
        self.should_encode_url_query_params = encode;
        self
    }

    /// Suppress the blocked cookie alert
    pub fn with_suppressed_cookie_alert(mut self, suppress: bool) -> Self {
        self.suppress_no_cookie_access_alert = suppress;
        self
    }

    /// Enable or disable re-authentication on expiry
    pub fn with_auto_login(mut self, auto_login: bool) -> Self {
        self.auto_login = auto_login;
        self
    }

    /// Prefetch resources on init
    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.call_prefetch = prefetch;
        self
    }

    /// Load frames one at a time
    pub fn with_queued_renders(mut self, queue: bool) -> Self {
        self.queue_multi_renders = queue;
        self
    }

    /// Set a custom stylesheet
    pub fn with_custom_css_url(mut self, url: impl Into<String>) -> Self {
        self.custom_css_url = Some(url.into());
        self
    }
}

/// Parse a raw host string into `scheme://host[:port][/path]`, dropping the
/// query, the hash and any trailing slash. `default_protocol` (for example
/// `"https:"`) is used when the input has no scheme.
pub fn resolve_host(raw: &str, default_protocol: &str) -> Result<String, EmbedError> {
    let captures = URL_PATTERN
        .captures(raw.trim())
        .ok_or_else(|| EmbedError::InvalidHost(raw.to_string()))?;

    let host = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
    if captures.get(4).is_none_or(|m| m.as_str().is_empty()) {
        return Err(EmbedError::InvalidHost(raw.to_string()));
    }

    let protocol = captures
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or(default_protocol);
    let path = captures.get(6).map(|m| m.as_str()).unwrap_or_default();
    let path = path.strip_suffix('/').unwrap_or(path);

    Ok(format!("{protocol}//{host}{path}"))
}

/// The path segment under which the v2 application is served on `host`.
///
/// An explicit `basepath` wins. A local development host (anything on
/// `localhost` except the TLS port 8443) serves from the root.
pub fn v2_base_path(host: &str, basepath: Option<&str>) -> String {
    if let Some(basepath) = basepath.filter(|path| !path.is_empty()) {
        return basepath.to_string();
    }

    if host.contains("://localhost") && !host.contains(":8443") {
        return String::new();
    }

    DEFAULT_V2_BASE_PATH.to_string()
}
