//! Resolves the configured authentication strategy into a logged-in state.
//!
//! An [`AuthManager`] owns the auth state and the session descriptor. Each
//! call to [`AuthManager::authenticate`] starts one pass of the configured
//! strategy and publishes its result as a shared [`AuthFuture`] that every
//! embed awaits before creating its frame. Starting a new pass (for example
//! when the embedded session expires) replaces the shared future.

use futures::{
    FutureExt,
    future::{LocalBoxFuture, Shared},
};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    AuthError, EmbedConfig,
    browser::{Browser, Window},
    config::AuthType,
    http::{HttpClient, HttpRequest},
    telemetry,
};

mod session;
pub mod sso;

pub use session::*;
use sso::{Completion, PopupSlot, SsoProtocol};

/// Resolves to whether the user ended up logged in.
pub type AuthFuture = Shared<LocalBoxFuture<'static, Result<bool, AuthError>>>;

/// Where the auth state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// No valid session
    #[default]
    LoggedOut,
    /// A strategy is running, or the page is redirecting to an identity provider
    Authenticating,
    /// A valid session exists
    LoggedIn,
}

enum Outcome {
    LoggedIn,
    LoggedOut,
    Redirected,
}

struct Inner<B: Browser> {
    browser: Rc<B>,
    http: Rc<dyn HttpClient>,
    config: EmbedConfig,
    host: String,
    status: Cell<AuthStatus>,
    session: RefCell<Option<SessionInfo>>,
    pending: RefCell<Option<AuthFuture>>,
    sso_completion: RefCell<Option<Completion>>,
    sso_popup: PopupSlot<B::Window>,
}

/// Owns the auth state of one initialised SDK.
pub struct AuthManager<B: Browser> {
    inner: Rc<Inner<B>>,
}

impl<B: Browser> Clone for AuthManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Browser> AuthManager<B> {
    /// Create a manager for the resolved `host`
    pub fn new(
        browser: Rc<B>,
        http: Rc<dyn HttpClient>,
        config: EmbedConfig,
        host: impl Into<String>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                browser,
                http,
                config,
                host: host.into(),
                status: Cell::new(AuthStatus::LoggedOut),
                session: RefCell::new(None),
                pending: RefCell::new(None),
                sso_completion: RefCell::new(None),
                sso_popup: Rc::default(),
            }),
        }
    }

    /// Start a pass of the configured strategy and publish it as the shared
    /// auth future. The pass starts running immediately.
    ///
    /// Fails without starting when the strategy's configuration is incomplete.
    pub fn authenticate(&self) -> Result<AuthFuture, AuthError> {
        self.validate()?;

        let manager = self.clone();
        let future = async move { manager.run().await }
            .boxed_local()
            .shared();

        *self.inner.pending.borrow_mut() = Some(future.clone());
        self.inner
            .browser
            .spawn(future.clone().map(|_| ()).boxed_local());

        Ok(future)
    }

    /// The current shared auth future. Before any pass has started this
    /// resolves to the current logged-in state.
    pub fn auth_future(&self) -> AuthFuture {
        if let Some(pending) = self.inner.pending.borrow().as_ref() {
            return pending.clone();
        }
        let logged_in = self.is_authenticated();
        async move { Ok(logged_in) }.boxed_local().shared()
    }

    /// The current state
    pub fn status(&self) -> AuthStatus {
        self.inner.status.get()
    }

    /// Whether a valid session exists
    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::LoggedIn
    }

    /// The last session descriptor received
    pub fn session_info(&self) -> Option<SessionInfo> {
        self.inner.session.borrow().clone()
    }

    /// Store a session descriptor pushed by the embedded app
    pub fn set_session_info(&self, info: SessionInfo) {
        telemetry::session_received(info.user_guid.as_deref());
        *self.inner.session.borrow_mut() = Some(info);
    }

    /// End the server session
    pub async fn logout(&self) -> Result<(), crate::HttpError> {
        let request = HttpRequest::post(format!("{}{}", self.inner.host, Endpoint::LOGOUT), "")
            .with_header("x-requested-by", "ThoughtSpot");
        let result = self.inner.http.send(request).await;

        self.inner.status.set(AuthStatus::LoggedOut);
        self.inner.session.borrow_mut().take();
        self.inner.pending.borrow_mut().take();

        result.map(|_| ())
    }

    fn validate(&self) -> Result<(), AuthError> {
        let config = &self.inner.config;
        if config.auth_type == AuthType::AuthServer
            && config.auth_endpoint.is_none()
            && config.get_auth_token.is_none()
        {
            return Err(AuthError::MissingConfig(
                "either authEndpoint or getAuthToken must be provided".into(),
            ));
        }
        Ok(())
    }

    async fn run(&self) -> Result<bool, AuthError> {
        self.validate()?;
        self.inner.status.set(AuthStatus::Authenticating);

        let outcome = match self.inner.config.auth_type {
            AuthType::None => Outcome::LoggedIn,
            AuthType::Basic => self.basic().await,
            AuthType::AuthServer => self.trusted().await,
            AuthType::Sso => self.sso(SsoProtocol::Saml).await,
            AuthType::Oidc => self.sso(SsoProtocol::Oidc).await,
        };

        let logged_in = match outcome {
            Outcome::LoggedIn => {
                self.inner.status.set(AuthStatus::LoggedIn);
                true
            }
            Outcome::LoggedOut => {
                self.inner.status.set(AuthStatus::LoggedOut);
                false
            }
            Outcome::Redirected => false,
        };

        telemetry::authenticated(self.inner.config.auth_type, logged_in);
        Ok(logged_in)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.host)
    }

    /// Probe the session endpoint. Network failures count as no session.
    async fn has_session(&self) -> bool {
        let request = HttpRequest::get(self.url(Endpoint::SESSION_INFO));
        match self.inner.http.send(request).await {
            Ok(response) if response.is_success() => {
                if let Ok(info) = serde_json::from_str::<SessionInfo>(&response.body) {
                    *self.inner.session.borrow_mut() = Some(info);
                }
                true
            }
            Ok(_) => false,
            Err(error) => {
                tracing::warn!("Session probe failed: {error}");
                false
            }
        }
    }

    async fn login(&self, request: HttpRequest) -> Outcome {
        match self.inner.http.send(request).await {
            Ok(response) if response.is_success() => Outcome::LoggedIn,
            Ok(response) => {
                tracing::warn!("Login was rejected with status {}", response.status);
                Outcome::LoggedOut
            }
            Err(error) => {
                tracing::warn!("Login failed: {error}");
                Outcome::LoggedOut
            }
        }
    }

    async fn basic(&self) -> Outcome {
        if self.has_session().await {
            return Outcome::LoggedIn;
        }

        let config = &self.inner.config;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", config.username.as_deref().unwrap_or_default())
            .append_pair("password", config.password.as_deref().unwrap_or_default())
            .finish();
        let request = HttpRequest::post(self.url(Endpoint::BASIC_LOGIN), body)
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_header("x-requested-by", "ThoughtSpot");

        self.login(request).await
    }

    async fn fetch_token(&self) -> Result<String, String> {
        let config = &self.inner.config;
        if let Some(provider) = &config.get_auth_token {
            return provider.fetch().await;
        }
        let Some(endpoint) = &config.auth_endpoint else {
            return Err("no token source configured".into());
        };
        let request = HttpRequest::get(endpoint.as_str()).with_credentials(false);
        match self.inner.http.send(request).await {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => Err(format!("token endpoint answered {}", response.status)),
            Err(error) => Err(error.to_string()),
        }
    }

    async fn trusted(&self) -> Outcome {
        if self.has_session().await {
            return Outcome::LoggedIn;
        }

        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(reason) => {
                tracing::warn!("Unable to fetch an auth token: {reason}");
                return Outcome::LoggedOut;
            }
        };

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(
                "username",
                self.inner.config.username.as_deref().unwrap_or_default(),
            )
            .append_pair("auth_token", token.trim())
            .finish();
        let request = HttpRequest::get(format!("{}?{query}", self.url(Endpoint::TOKEN_LOGIN)));

        self.login(request).await
    }

    async fn sso(&self, protocol: SsoProtocol) -> Outcome {
        let browser = &self.inner.browser;
        let at_marker = sso::is_at_marker(&browser.location().href);

        if self.has_session().await {
            if at_marker {
                sso::strip_marker(browser.as_ref());
            }
            return Outcome::LoggedIn;
        }

        if at_marker {
            sso::strip_marker(browser.as_ref());
            return Outcome::LoggedOut;
        }

        let config = &self.inner.config;
        let return_url = sso::return_url(
            &self.inner.host,
            &browser.location().href,
            config.no_redirect,
        );
        let login_url = sso::login_url(&self.inner.host, protocol, &return_url);

        if config.no_redirect {
            return self.sso_popup(&login_url).await;
        }

        tracing::info!("Redirecting to the identity provider");
        browser.redirect(&login_url);
        Outcome::Redirected
    }

    /// Open the login popup, or focus it if one is already open, and wait
    /// for the shared completion signal.
    async fn sso_popup(&self, login_url: &str) -> Outcome {
        let browser = &self.inner.browser;

        let open = self
            .inner
            .sso_popup
            .borrow()
            .clone()
            .filter(|popup| !popup.is_closed());
        match open {
            Some(popup) => popup.focus(),
            None => match browser.open_popup(login_url) {
                Some(popup) => *self.inner.sso_popup.borrow_mut() = Some(popup),
                None => {
                    tracing::warn!("The login popup was blocked");
                    self.clear_sso();
                    return Outcome::LoggedOut;
                }
            },
        }

        let completion = self
            .inner
            .sso_completion
            .borrow_mut()
            .get_or_insert_with(|| {
                sso::completion(browser, self.inner.sso_popup.clone(), &self.inner.host)
            })
            .clone();

        let completed = completion.await;
        self.clear_sso();

        if completed {
            Outcome::LoggedIn
        } else {
            Outcome::LoggedOut
        }
    }

    fn clear_sso(&self) {
        self.inner.sso_completion.borrow_mut().take();
        self.inner.sso_popup.borrow_mut().take();
    }
}
