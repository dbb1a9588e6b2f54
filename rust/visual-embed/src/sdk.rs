//! The SDK context: the initialised configuration, the auth state and the
//! render queue shared by every embed created from it.

use std::{cell::RefCell, rc::Rc};

use crate::{
    AuthError, EmbedConfig, EmbedError,
    auth::{AuthFuture, AuthManager},
    browser::Browser,
    config::{resolve_host, v2_base_path},
    embed::{AppViewConfig, Embed, LiveboardViewConfig, SearchViewConfig, Variant},
    http::HttpClient,
    queue::RenderQueue,
    telemetry,
};

/// What `init` resolved. Replaced wholesale by the next `init`.
pub(crate) struct Settings<B: Browser> {
    pub config: EmbedConfig,
    pub host: String,
    pub v2_base: String,
    pub auth: AuthManager<B>,
}

pub(crate) struct SdkInner<B: Browser> {
    pub browser: Rc<B>,
    pub http: Rc<dyn HttpClient>,
    pub queue: RenderQueue<B>,
    settings: RefCell<Option<Rc<Settings<B>>>>,
}

impl<B: Browser> SdkInner<B> {
    pub fn settings(&self) -> Option<Rc<Settings<B>>> {
        self.settings.borrow().clone()
    }
}

/// Entry point of the SDK.
///
/// ```no_run
/// # use std::rc::Rc;
/// # use visual_embed::{Sdk, EmbedConfig, LiveboardViewConfig};
/// # use visual_embed::browser::memory::MemoryBrowser;
/// # use visual_embed::http::ReqwestClient;
/// let browser = MemoryBrowser::new("https://app.example.com/");
/// let sdk = Sdk::new(browser.clone(), Rc::new(ReqwestClient::new()));
/// sdk.init(EmbedConfig::new("analytics.example.com"))?;
///
/// let embed = sdk.liveboard_embed(
///     "container".to_string(),
///     LiveboardViewConfig::new("liveboard-id"),
/// );
/// embed.render();
/// # Ok::<(), visual_embed::EmbedError>(())
/// ```
pub struct Sdk<B: Browser> {
    inner: Rc<SdkInner<B>>,
}

impl<B: Browser> Clone for Sdk<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Browser> Sdk<B> {
    /// Create an uninitialised SDK for the page `browser`
    pub fn new(browser: Rc<B>, http: Rc<dyn HttpClient>) -> Self {
        Self {
            inner: Rc::new(SdkInner {
                queue: RenderQueue::new(browser.clone()),
                browser,
                http,
                settings: RefCell::new(None),
            }),
        }
    }

    /// Resolve the host, start authenticating and, when configured,
    /// prefetch the host's resources.
    ///
    /// The returned future is the shared auth future every embed awaits.
    pub fn init(&self, config: EmbedConfig) -> Result<AuthFuture, EmbedError> {
        let location = self.inner.browser.location();
        let protocol = if location.protocol.is_empty() {
            "https:"
        } else {
            location.protocol.as_str()
        };
        let host = resolve_host(&config.thought_spot_host, protocol)?;
        let v2_base = v2_base_path(&host, config.basepath.as_deref());

        let auth = AuthManager::new(
            self.inner.browser.clone(),
            self.inner.http.clone(),
            config.clone(),
            host.clone(),
        );
        let future = auth.authenticate().map_err(|error| match error {
            AuthError::MissingConfig(reason) => EmbedError::MissingAuthConfig(reason),
            other => other.into(),
        })?;

        telemetry::init_called(&host, config.auth_type);
        let call_prefetch = config.call_prefetch;
        *self.inner.settings.borrow_mut() = Some(Rc::new(Settings {
            config,
            host,
            v2_base,
            auth,
        }));

        if call_prefetch {
            self.prefetch(None);
        }

        Ok(future)
    }

    /// Warm the browser cache by loading `url` (the configured host when
    /// `None`) in an invisible frame. The frame is removed once an embed
    /// renders.
    pub fn prefetch(&self, url: Option<&str>) {
        let url = match url {
            Some("") => None,
            Some(url) => Some(url.to_string()),
            None => self.inner.settings().map(|settings| settings.host.clone()),
        };
        let Some(url) = url else {
            tracing::warn!("The prefetch method does not have a valid URL");
            return;
        };
        if let Err(error) = self.inner.browser.prefetch(&url) {
            tracing::warn!("Unable to prefetch {url}: {error}");
        }
    }

    /// The auth state of the current configuration
    pub fn auth(&self) -> Option<AuthManager<B>> {
        self.inner.settings().map(|settings| settings.auth.clone())
    }

    /// The resolved host of the current configuration
    pub fn host(&self) -> Option<String> {
        self.inner.settings().map(|settings| settings.host.clone())
    }

    /// The current configuration
    pub fn config(&self) -> Option<EmbedConfig> {
        self.inner.settings().map(|settings| settings.config.clone())
    }

    /// Embed the full application into `target`
    pub fn app_embed(&self, target: B::Target, config: AppViewConfig) -> Embed<B> {
        Embed::new(self.inner.clone(), target, Variant::App(config))
    }

    /// Embed a liveboard or one of its visualizations into `target`
    pub fn liveboard_embed(&self, target: B::Target, config: LiveboardViewConfig) -> Embed<B> {
        Embed::new(self.inner.clone(), target, Variant::Liveboard(config))
    }

    /// Embed search into `target`
    pub fn search_embed(&self, target: B::Target, config: SearchViewConfig) -> Embed<B> {
        Embed::new(self.inner.clone(), target, Variant::Search(config))
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
impl Sdk<crate::browser::web::WebBrowser> {
    /// An SDK for the page this module runs in, talking to the host with
    /// `fetch`. `None` outside a window context.
    pub fn web() -> Option<Self> {
        let browser = crate::browser::web::WebBrowser::new()?;
        Some(Self::new(
            browser,
            Rc::new(crate::http::ReqwestClient::new()),
        ))
    }
}
