//! Embedded views: frame lifecycle, URL construction and the message
//! protocol between the host page and the embedded application.
//!
//! An [`Embed`] owns one frame mounted into a target container. Handlers
//! registered with [`Embed::on`] receive events posted by that frame (and
//! a few raised by the SDK itself); [`Embed::trigger`] sends commands into
//! it. What URL the frame loads depends on the [`Variant`].

use futures::FutureExt;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    sync::LazyLock,
};

use crate::{
    Action, EmbedError, EmbedEvent, HostEvent, Param, RuntimeFilter,
    auth::SessionInfo,
    browser::{Browser, Frame, InboundMessage, ListenerId},
    config::{DEFAULT_EMBED_HEIGHT, DEFAULT_EMBED_WIDTH, URL_MAX_LENGTH},
    query::{Dimension, QueryParams, encode_query_flags, filter_query},
    queue::Next,
    sdk::{SdkInner, Settings},
    telemetry,
};

mod answer;
mod app;
mod liveboard;
mod message;
mod search;

pub use answer::AnswerService;
pub use app::{AppViewConfig, Page};
pub use liveboard::LiveboardViewConfig;
pub use message::{EmbedMessage, Responder};
pub use search::{SearchOptions, SearchViewConfig};

/// The name given to every embedded frame
pub const FRAME_NAME: &str = "ThoughtSpot Embedded Analytics";

const NO_COOKIE_ACCESS_ALERT: &str = "Third party cookie access is blocked on this browser, please allow third party cookies for ThoughtSpot to work properly";

static PAGE_PATH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/?#?/").expect("page path pattern is valid"));

/// Size of the embedded frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameParams {
    /// Width in pixels or any CSS length; defaults to `100%`
    #[serde(default)]
    pub width: Option<Dimension>,
    /// Height in pixels or any CSS length; defaults to `100%`
    #[serde(default)]
    pub height: Option<Dimension>,
}

/// Configuration shared by every kind of embedded view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    /// Size of the frame
    #[serde(default)]
    pub frame_params: FrameParams,
    /// Actions shown but disabled
    #[serde(default)]
    pub disabled_actions: Vec<Action>,
    /// Tooltip shown on disabled actions
    #[serde(default)]
    pub disabled_action_reason: Option<String>,
    /// Actions removed from menus
    #[serde(default)]
    pub hidden_actions: Vec<Action>,
    /// When set, the only actions left in menus
    #[serde(default)]
    pub visible_actions: Option<Vec<Action>>,
    /// Filters applied when the content loads
    #[serde(default)]
    pub runtime_filters: Vec<RuntimeFilter>,
}

/// The kind of view an [`Embed`] shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// The full application
    App(AppViewConfig),
    /// A liveboard or one of its visualizations
    Liveboard(LiveboardViewConfig),
    /// Search
    Search(SearchViewConfig),
}

impl Variant {
    fn view(&self) -> &ViewConfig {
        match self {
            Variant::App(config) => &config.view,
            Variant::Liveboard(config) => &config.view,
            Variant::Search(config) => &config.view,
        }
    }

    /// Views served by the v1 application name some events differently
    fn uses_v1_events(&self) -> bool {
        matches!(self, Variant::App(_) | Variant::Liveboard(_))
    }
}

type Handler = Rc<dyn Fn(&EmbedMessage, &Responder)>;

/// Keeps a message listener registered for as long as it lives.
struct Subscription<B: Browser> {
    browser: Rc<B>,
    id: ListenerId,
}

impl<B: Browser> Drop for Subscription<B> {
    fn drop(&mut self) {
        self.browser.remove_message_listener(self.id);
    }
}

pub(crate) struct EmbedCore<B: Browser> {
    sdk: Rc<SdkInner<B>>,
    target: B::Target,
    view: ViewConfig,
    v1_events: bool,
    handlers: RefCell<IndexMap<String, Vec<Handler>>>,
    frame: RefCell<Option<B::Frame>>,
    rendered: Cell<bool>,
    failed: Cell<bool>,
    subscription: RefCell<Option<Subscription<B>>>,
}

impl<B: Browser> EmbedCore<B> {
    fn browser(&self) -> &Rc<B> {
        &self.sdk.browser
    }

    fn register(&self, event_type: &str, handler: Handler) {
        self.handlers
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn execute_callbacks(&self, message: &EmbedMessage, responder: &Responder) {
        let handlers = self
            .handlers
            .borrow()
            .get(&message.event_type)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(message, responder);
        }
    }

    fn emit(&self, event: EmbedEvent, data: Value) {
        self.execute_callbacks(&EmbedMessage::local(event, data), &Responder::default());
    }

    /// Report an error to `Error` handlers without affecting rendering.
    fn report_error(&self, error: &EmbedError) {
        tracing::error!("{error}");
        self.emit(EmbedEvent::Error, json!({ "error": error.to_string() }));
    }

    /// Report an error and stop this embed from rendering.
    fn handle_error(&self, error: EmbedError) {
        self.failed.set(true);
        self.report_error(&error);
    }

    fn set_height(&self, pixels: f64) {
        if let Some(frame) = self.frame.borrow().as_ref() {
            frame.set_height(&format!("{pixels}px"));
        }
    }

    /// Where the frame sits in the visible part of the page.
    fn iframe_center(&self) -> Value {
        let (offset_top, iframe_height) = self
            .frame
            .borrow()
            .as_ref()
            .map(|frame| (frame.offset_top(), frame.offset_height()))
            .unwrap_or_default();
        let viewport = self.browser().viewport();
        let view_port_height = f64::from(viewport.height);
        let iframe_scrolled = viewport.scroll_y - offset_top;

        let (iframe_visible_view_port, iframe_offset) = if iframe_scrolled < 0.0 {
            let visible = view_port_height - (offset_top - viewport.scroll_y);
            (iframe_height.min(visible), 0.0)
        } else {
            (
                (iframe_height - iframe_scrolled).min(view_port_height),
                iframe_scrolled,
            )
        };

        json!({
            "iframeCenter": iframe_offset + iframe_visible_view_port / 2.0,
            "iframeScrolled": iframe_scrolled,
            "iframeHeight": iframe_height,
            "viewPortHeight": view_port_height,
            "iframeVisibleViewPort": iframe_visible_view_port,
        })
    }

    /// Parameters every view sends. Fails when both a visible and a hidden
    /// action list are configured.
    fn base_params(&self, settings: &Settings<B>) -> Result<QueryParams, EmbedError> {
        let browser = self.browser();
        let mut params = QueryParams::new();

        let mut host_app_url = browser.location().host;
        if host_app_url.contains("localhost") || host_app_url.contains("127.0.0.1") {
            host_app_url = "local-host".into();
        }
        let viewport = browser.viewport();
        params
            .insert(Param::HOST_APP_URL, urlencoding::encode(&host_app_url).into_owned())
            .insert(Param::VIEW_PORT_HEIGHT, viewport.height)
            .insert(Param::VIEW_PORT_WIDTH, viewport.width)
            .insert(Param::VERSION, env!("CARGO_PKG_VERSION"));

        if let Some(css) = settings.config.custom_css_url.as_deref() {
            params.insert(Param::CUSTOM_CSS_URL, css);
        }

        let view = &self.view;
        let has_visible = view
            .visible_actions
            .as_ref()
            .is_some_and(|actions| !actions.is_empty());
        if has_visible && !view.hidden_actions.is_empty() {
            return Err(EmbedError::ConflictingActions);
        }

        if !view.disabled_actions.is_empty() {
            params.insert(Param::DISABLE_ACTIONS, json!(view.disabled_actions));
        }
        if let Some(reason) = view.disabled_action_reason.as_deref() {
            params.insert(Param::DISABLE_ACTION_REASON, reason);
        }
        if !view.hidden_actions.is_empty() {
            params.insert(Param::HIDE_ACTIONS, json!(view.hidden_actions));
        }
        if let Some(visible) = &view.visible_actions {
            params.insert(Param::VISIBLE_ACTIONS, json!(visible));
        }
        Ok(params)
    }

    /// Filters first, then parameters, joined with `&`.
    fn query_string(&self, params: &QueryParams) -> String {
        [filter_query(&self.view.runtime_filters), params.to_query_string()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `{host}/?embedApp=true[&navbar flags][&query]#`, with `/embed`
    /// appended unless the whole application is embedded.
    fn v1_base_path(
        &self,
        settings: &Settings<B>,
        query: &str,
        app_navbar: Option<(bool, bool)>,
    ) -> String {
        let mut flags = format!("{}=true", Param::EMBED_APP);
        if let Some((show_primary_navbar, disable_profile_and_help)) = app_navbar {
            flags.push_str(&format!(
                "&{}={}&{}={}",
                Param::PRIMARY_NAV_HIDDEN,
                !show_primary_navbar,
                Param::PROFILE_AND_HELP_HIDDEN,
                disable_profile_and_help
            ));
        }
        if !query.is_empty() {
            flags.push('&');
            flags.push_str(query);
        }
        if settings.config.should_encode_url_query_params {
            flags = format!("{}={}", Param::BASE64_ENCODED_FLAGS, encode_query_flags(&flags));
        }

        let path = format!("{}/?{flags}#", settings.host);
        match app_navbar {
            Some(_) => path,
            None => format!("{path}/embed"),
        }
    }

    /// `{host}/{v2 base}/?{query}#/embed`, skipping empty segments.
    fn v2_base_path(&self, settings: &Settings<B>, query: Option<String>) -> String {
        let query = query
            .map(|query| {
                if settings.config.should_encode_url_query_params {
                    format!("?{}={}", Param::BASE64_ENCODED_FLAGS, encode_query_flags(&query))
                } else {
                    format!("?{query}")
                }
            })
            .unwrap_or_default();

        let base = [settings.host.as_str(), settings.v2_base.as_str(), query.as_str()]
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        format!("{base}#/embed")
    }

    fn render_frame(self: &Rc<Self>, url: String) {
        if self.failed.get() {
            return;
        }
        let Some(settings) = self.sdk.settings() else {
            self.handle_error(EmbedError::NotInitialized);
            return;
        };
        if url.len() > URL_MAX_LENGTH {
            tracing::warn!(
                "The URL is too long. Please reduce the size of the view configuration ({} characters)",
                url.len()
            );
        }

        let core = self.clone();
        let queued = settings.config.queue_multi_renders;
        self.sdk.queue.add(queued, move |next| {
            core.load_frame(settings, url, next).boxed_local()
        });
    }

    async fn load_frame(self: Rc<Self>, settings: Rc<Settings<B>>, url: String, next: Next) {
        let browser = self.browser().clone();
        let started = browser.now();
        self.emit(EmbedEvent::Init, json!({ "timestamp": started }));
        telemetry::render_started(&url);

        if let Err(error) = settings.auth.auth_future().await {
            next.call();
            telemetry::render_failed(&url, &error.to_string());
            self.handle_error(error.into());
            return;
        }

        let existing = self.frame.borrow().clone();
        let frame = match existing.map(Ok).unwrap_or_else(|| browser.create_frame()) {
            Ok(frame) => frame,
            Err(error) => {
                next.call();
                self.handle_error(error.into());
                return;
            }
        };

        let frame_params = &self.view.frame_params;
        let width = frame_params
            .width
            .as_ref()
            .map(Dimension::to_css)
            .unwrap_or_else(|| DEFAULT_EMBED_WIDTH.to_string());
        let height = frame_params
            .height
            .as_ref()
            .map(Dimension::to_css)
            .unwrap_or_else(|| DEFAULT_EMBED_HEIGHT.to_string());

        frame.set_src(&url);
        frame.allow_fullscreen();
        frame.set_size(&width, &height);
        frame.set_name(FRAME_NAME);

        {
            let core = Rc::downgrade(&self);
            let next = next.clone();
            let url = url.clone();
            frame.on_load(Box::new(move || {
                next.call();
                if let Some(core) = core.upgrade() {
                    let loaded = core.browser().now();
                    core.emit(EmbedEvent::Load, json!({ "timestamp": loaded }));
                    telemetry::render_completed(&url, loaded - started);
                }
            }));
        }
        {
            let next = next.clone();
            let url = url.clone();
            frame.on_error(Box::new(move || {
                next.call();
                telemetry::iframe_load_failed(&url);
            }));
        }

        if let Err(error) = browser.mount(&self.target, &frame) {
            next.call();
            self.handle_error(error.into());
            return;
        }
        *self.frame.borrow_mut() = Some(frame);
        browser.remove_prefetch_frames();
        self.subscribe();
    }

    fn subscribe(self: &Rc<Self>) {
        if self.subscription.borrow().is_some() {
            return;
        }
        let core = Rc::downgrade(self);
        let id = self
            .browser()
            .add_message_listener(Rc::new(move |message: InboundMessage<B::Window>| {
                if let Some(core) = core.upgrade() {
                    core.receive(message);
                }
            }));
        *self.subscription.borrow_mut() = Some(Subscription {
            browser: self.browser().clone(),
            id,
        });
    }

    /// Dispatch a message if it came from this embed's frame.
    fn receive(&self, message: InboundMessage<B::Window>) {
        let frame_window = self
            .frame
            .borrow()
            .as_ref()
            .and_then(|frame| frame.content_window());
        if message.source.is_none() || message.source != frame_window {
            return;
        }
        let Some(embed_message) = EmbedMessage::from_envelope(&message.data) else {
            return;
        };

        let embed_message = self.preprocess(embed_message);
        self.execute_callbacks(&embed_message, &Responder::new(message.port));
    }

    fn preprocess(&self, mut message: EmbedMessage) -> EmbedMessage {
        let Some(settings) = self.sdk.settings() else {
            return message;
        };

        if message.is(EmbedEvent::CustomAction) {
            message.answer_service = AnswerService::for_custom_action(
                self.sdk.http.clone(),
                &settings.host,
                &message.data,
            );
        } else if message.is(EmbedEvent::AuthInit) {
            match serde_json::from_value::<SessionInfo>(message.data.clone()) {
                Ok(info) => {
                    message.data = info.public_view();
                    settings.auth.set_session_info(info);
                }
                Err(error) => {
                    tracing::warn!("Ignoring a malformed session descriptor: {error}");
                    message.data = SessionInfo::default().public_view();
                }
            }
        } else if message.is(EmbedEvent::AuthExpire) && settings.config.auto_login {
            if let Err(error) = settings.auth.authenticate() {
                tracing::error!("Unable to re-authenticate: {error}");
            }
        }
        message
    }
}

/// Height a full-height frame never shrinks below, in pixels.
pub const DEFAULT_FULL_HEIGHT: u32 = 500;

/// Keep the frame as tall as the content it shows.
fn register_full_height_handlers<B: Browser>(core: &Rc<EmbedCore<B>>, min_height: u32) {
    let min_height = f64::from(min_height);

    let weak = Rc::downgrade(core);
    core.register(
        EmbedEvent::RouteChange.as_str(),
        Rc::new(move |message: &EmbedMessage, _: &Responder| {
            let current_path = message
                .data
                .get("currentPath")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !current_path.starts_with("/embed/viz/") {
                with_core(&weak, |core| core.set_height(min_height));
            }
        }),
    );

    let weak = Rc::downgrade(core);
    core.register(
        EmbedEvent::EmbedHeight.as_str(),
        Rc::new(move |message: &EmbedMessage, _: &Responder| {
            let height = message.data.as_f64().unwrap_or_default();
            with_core(&weak, |core| core.set_height(height.max(min_height)));
        }),
    );

    let weak = Rc::downgrade(core);
    core.register(
        EmbedEvent::EmbedIframeCenter.as_str(),
        Rc::new(move |_: &EmbedMessage, responder: &Responder| {
            with_core(&weak, |core| {
                responder.respond(EmbedEvent::EmbedIframeCenter.as_str(), core.iframe_center())
            });
        }),
    );
}

fn with_core<B: Browser>(core: &Weak<EmbedCore<B>>, f: impl FnOnce(&EmbedCore<B>)) {
    if let Some(core) = core.upgrade() {
        f(&core);
    }
}

/// One embedded view mounted into a container on the host page.
pub struct Embed<B: Browser> {
    core: Rc<EmbedCore<B>>,
    variant: Variant,
}

impl<B: Browser> Embed<B> {
    pub(crate) fn new(sdk: Rc<SdkInner<B>>, target: B::Target, variant: Variant) -> Self {
        let suppress_alert = sdk
            .settings()
            .is_some_and(|settings| settings.config.suppress_no_cookie_access_alert);

        let core = Rc::new(EmbedCore {
            sdk,
            target,
            view: variant.view().clone(),
            v1_events: variant.uses_v1_events(),
            handlers: RefCell::new(IndexMap::new()),
            frame: RefCell::new(None),
            rendered: Cell::new(false),
            failed: Cell::new(false),
            subscription: RefCell::new(None),
        });

        if !suppress_alert {
            let browser = Rc::downgrade(core.browser());
            core.register(
                EmbedEvent::NoCookieAccess.as_str(),
                Rc::new(move |_: &EmbedMessage, _: &Responder| {
                    if let Some(browser) = browser.upgrade() {
                        browser.alert(NO_COOKIE_ACCESS_ALERT);
                    }
                }),
            );
        }

        Self { core, variant }
    }

    /// The kind of view this embed shows
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Register `handler` for `event`. Handlers for one event run in the
    /// order they were registered.
    ///
    /// Registering after [`Embed::render`] is rejected: an `Error` event is
    /// raised and the handler is dropped.
    pub fn on<F>(&self, event: EmbedEvent, handler: F) -> &Self
    where
        F: Fn(&EmbedMessage, &Responder) + 'static,
    {
        if self.core.rendered.get() {
            self.core.report_error(&EmbedError::HandlerAfterRender);
            return self;
        }
        let event = if self.core.v1_events {
            event.v1_compatible()
        } else {
            event
        };
        self.core.register(event.as_str(), Rc::new(handler));
        self
    }

    /// Build the frame URL and queue the frame for loading. Only the first
    /// call has an effect.
    pub fn render(&self) -> &Self {
        if self.core.rendered.get() {
            tracing::debug!("Embed is already rendered");
            return self;
        }

        let full_height = match &self.variant {
            Variant::App(config) => config.full_height.then(|| config.min_height()),
            Variant::Liveboard(config) => config.full_height.then(|| config.min_height()),
            Variant::Search(_) => None,
        };
        if let Some(min_height) = full_height {
            register_full_height_handlers(&self.core, min_height);
        }
        self.core.rendered.set(true);

        match self.frame_url() {
            Ok(url) => self.core.render_frame(url),
            Err(error) => self.core.handle_error(error),
        }
        self
    }

    /// The URL the frame loads for the current configuration. Errors are
    /// returned without being reported to `Error` handlers.
    pub fn frame_url(&self) -> Result<String, EmbedError> {
        let settings = self.core.sdk.settings().ok_or(EmbedError::NotInitialized)?;
        match &self.variant {
            Variant::App(config) => app::frame_url(&self.core, &settings, config),
            Variant::Liveboard(config) => liveboard::frame_url(&self.core, &settings, config),
            Variant::Search(config) => search::frame_url(&self.core, &settings, config),
        }
    }

    /// Send a command into the embedded application. [`HostEvent::Reload`]
    /// replaces the frame with a fresh copy.
    pub fn trigger(&self, event: HostEvent, data: Value) -> &Self {
        let frame = self.core.frame.borrow().clone();
        let Some(frame) = frame else {
            tracing::warn!("{}", EmbedError::NotRendered);
            return self;
        };
        telemetry::trigger_sent(event.as_str());

        if event == HostEvent::Reload {
            match self.core.browser().replace_frame(&frame) {
                Ok(replacement) => *self.core.frame.borrow_mut() = Some(replacement),
                Err(error) => self.core.report_error(&error.into()),
            }
            return self;
        }

        let origin = self.core.sdk.settings().map(|settings| settings.host.clone());
        let message = json!({ "type": event.as_str(), "data": data });
        if let Err(error) = frame.post_message(&message, origin.as_deref().unwrap_or("*")) {
            self.core.report_error(&error.into());
        }
        self
    }

    /// Point the rendered frame at another page of the embedded app,
    /// keeping everything before the `#/embed` (or `#`) marker.
    pub fn navigate_to_page(&self, path: &str) {
        let frame = self.core.frame.borrow().clone();
        let Some(frame) = frame.filter(|frame| !frame.src().is_empty()) else {
            tracing::warn!("{}", EmbedError::NotRendered);
            return;
        };

        let src = frame.src();
        let marker = if src.contains("#/embed") { "#/embed" } else { "#" };
        let base = src.split(marker).next().unwrap_or_default();
        let path = PAGE_PATH_PREFIX.replace(path, "");
        frame.set_src(&format!("{base}{marker}/{path}"));
    }

    /// The mounted frame, once rendering has completed
    pub fn frame(&self) -> Option<B::Frame> {
        self.core.frame.borrow().clone()
    }

    /// Whether [`Embed::render`] has been called
    pub fn is_rendered(&self) -> bool {
        self.core.rendered.get()
    }

    /// Whether a configuration error stopped this embed from rendering
    pub fn is_error(&self) -> bool {
        self.core.failed.get()
    }

    /// Stop receiving messages from the frame
    pub fn destroy(&self) {
        self.core.subscription.borrow_mut().take();
    }
}
