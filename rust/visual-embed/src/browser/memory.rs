//! An in-memory page that records everything the SDK does to it.
//!
//! Tasks handed to [`Browser::spawn`] run on a single-threaded
//! [`LocalPool`]; call [`MemoryBrowser::run`] to drive them until they
//! stall on something only the test can provide (a frame load, a message,
//! an HTTP response).

use futures::{
    executor::{LocalPool, LocalSpawner},
    future::LocalBoxFuture,
    task::LocalSpawnExt,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use super::{
    Browser, Frame, InboundMessage, ListenerId, Location, MessageListener, Port, Viewport, Window,
};
use crate::BrowserError;

#[derive(Debug, Default)]
struct WindowState {
    closed: Cell<bool>,
    focused: Cell<usize>,
    url: RefCell<String>,
}

/// An emulated browsing context.
#[derive(Debug, Clone, Default)]
pub struct MemoryWindow(Rc<WindowState>);

impl MemoryWindow {
    /// Create an open window
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the window was focused
    pub fn focus_count(&self) -> usize {
        self.0.focused.get()
    }

    /// The URL the window was opened with
    pub fn url(&self) -> String {
        self.0.url.borrow().clone()
    }
}

impl PartialEq for MemoryWindow {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Window for MemoryWindow {
    fn close(&self) {
        self.0.closed.set(true);
    }

    fn focus(&self) {
        self.0.focused.set(self.0.focused.get() + 1);
    }

    fn is_closed(&self) -> bool {
        self.0.closed.get()
    }
}

#[derive(Default)]
struct FrameState {
    src: RefCell<String>,
    name: RefCell<String>,
    width: RefCell<String>,
    height: RefCell<String>,
    fullscreen: Cell<bool>,
    window: MemoryWindow,
    posted: RefCell<Vec<(Value, String)>>,
    on_load: RefCell<Option<Box<dyn FnOnce()>>>,
    on_error: RefCell<Option<Box<dyn FnOnce()>>>,
    offset_top: Cell<f64>,
    offset_height: Cell<f64>,
}

/// An emulated iframe.
#[derive(Clone, Default)]
pub struct MemoryFrame(Rc<FrameState>);

impl MemoryFrame {
    /// The frame's name attribute
    pub fn name(&self) -> String {
        self.0.name.borrow().clone()
    }

    /// The frame's CSS width
    pub fn width(&self) -> String {
        self.0.width.borrow().clone()
    }

    /// The frame's CSS height
    pub fn height(&self) -> String {
        self.0.height.borrow().clone()
    }

    /// Whether fullscreen was allowed
    pub fn is_fullscreen_allowed(&self) -> bool {
        self.0.fullscreen.get()
    }

    /// The frame's content window
    pub fn window(&self) -> MemoryWindow {
        self.0.window.clone()
    }

    /// Messages posted into the frame with their target origins
    pub fn posted(&self) -> Vec<(Value, String)> {
        self.0.posted.borrow().clone()
    }

    /// Position the frame on the page
    pub fn set_geometry(&self, offset_top: f64, offset_height: f64) {
        self.0.offset_top.set(offset_top);
        self.0.offset_height.set(offset_height);
    }

    /// Finish loading the frame
    pub fn fire_load(&self) {
        let callback = self.0.on_load.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Fail loading the frame
    pub fn fire_error(&self) {
        let callback = self.0.on_error.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn copy(&self) -> Self {
        let copy = MemoryFrame::default();
        copy.set_src(&self.src());
        copy.set_name(&self.name());
        copy.set_size(&self.width(), &self.height());
        copy.0.fullscreen.set(self.0.fullscreen.get());
        copy
    }
}

impl std::fmt::Debug for MemoryFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFrame")
            .field("src", &self.src())
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for MemoryFrame {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Frame for MemoryFrame {
    type Window = MemoryWindow;

    fn src(&self) -> String {
        self.0.src.borrow().clone()
    }

    fn set_src(&self, src: &str) {
        *self.0.src.borrow_mut() = src.to_string();
        *self.0.window.0.url.borrow_mut() = src.to_string();
    }

    fn allow_fullscreen(&self) {
        self.0.fullscreen.set(true);
    }

    fn set_size(&self, width: &str, height: &str) {
        *self.0.width.borrow_mut() = width.to_string();
        *self.0.height.borrow_mut() = height.to_string();
    }

    fn set_height(&self, height: &str) {
        *self.0.height.borrow_mut() = height.to_string();
    }

    fn set_name(&self, name: &str) {
        *self.0.name.borrow_mut() = name.to_string();
    }

    fn content_window(&self) -> Option<MemoryWindow> {
        Some(self.0.window.clone())
    }

    fn post_message(&self, message: &Value, target_origin: &str) -> Result<(), BrowserError> {
        self.0
            .posted
            .borrow_mut()
            .push((message.clone(), target_origin.to_string()));
        Ok(())
    }

    fn on_load(&self, callback: Box<dyn FnOnce()>) {
        *self.0.on_load.borrow_mut() = Some(callback);
    }

    fn on_error(&self, callback: Box<dyn FnOnce()>) {
        *self.0.on_error.borrow_mut() = Some(callback);
    }

    fn offset_top(&self) -> f64 {
        self.0.offset_top.get()
    }

    fn offset_height(&self) -> f64 {
        self.0.offset_height.get()
    }
}

/// A reply port that records what is posted to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryPort(Rc<RefCell<Vec<Value>>>);

impl MemoryPort {
    /// Create an empty port
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages posted to the port
    pub fn received(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }
}

impl Port for MemoryPort {
    fn post(&self, message: &Value) -> Result<(), BrowserError> {
        self.0.borrow_mut().push(message.clone());
        Ok(())
    }
}

/// An emulated host page.
pub struct MemoryBrowser {
    location: RefCell<Location>,
    viewport: Cell<Viewport>,
    clock: Cell<f64>,
    alerts: RefCell<Vec<String>>,
    redirects: RefCell<Vec<String>>,
    popups: RefCell<Vec<MemoryWindow>>,
    block_popups: Cell<bool>,
    reject_mounts: Cell<bool>,
    rejected: RefCell<Vec<MemoryFrame>>,
    mounts: RefCell<IndexMap<String, MemoryFrame>>,
    prefetched: RefCell<Vec<String>>,
    listeners: RefCell<IndexMap<ListenerId, MessageListener<MemoryWindow>>>,
    next_listener: Cell<ListenerId>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl MemoryBrowser {
    /// Create a page at `href`
    pub fn new(href: &str) -> Rc<Self> {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Rc::new(Self {
            location: RefCell::new(Location::parse(href)),
            viewport: Cell::new(Viewport {
                width: 1280,
                height: 720,
                scroll_y: 0.0,
            }),
            clock: Cell::new(0.0),
            alerts: RefCell::default(),
            redirects: RefCell::default(),
            popups: RefCell::default(),
            block_popups: Cell::new(false),
            reject_mounts: Cell::new(false),
            rejected: RefCell::default(),
            mounts: RefCell::default(),
            prefetched: RefCell::default(),
            listeners: RefCell::default(),
            next_listener: Cell::new(0),
            pool: RefCell::new(pool),
            spawner,
        })
    }

    /// Run spawned tasks until none can make progress
    pub fn run(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Deliver a message from an opaque origin to every listener, then run
    /// spawned tasks
    pub fn deliver(&self, source: Option<MemoryWindow>, data: Value, port: Option<Rc<dyn Port>>) {
        self.deliver_from(source, "null", data, port);
    }

    /// Deliver a message sent from `origin` to every listener, then run
    /// spawned tasks
    pub fn deliver_from(
        &self,
        source: Option<MemoryWindow>,
        origin: &str,
        data: Value,
        port: Option<Rc<dyn Port>>,
    ) {
        let listeners: Vec<_> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(InboundMessage {
                source: source.clone(),
                origin: origin.to_string(),
                data: data.clone(),
                port: port.clone(),
            });
        }
        self.run();
    }

    /// Move the page to another URL without recording a redirect
    pub fn set_location(&self, href: &str) {
        *self.location.borrow_mut() = Location::parse(href);
    }

    /// Resize or scroll the page
    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
    }

    /// Move the clock forward
    pub fn advance(&self, millis: f64) {
        self.clock.set(self.clock.get() + millis);
    }

    /// Make [`Browser::open_popup`] fail
    pub fn block_popups(&self, block: bool) {
        self.block_popups.set(block);
    }

    /// Make [`Browser::mount`] fail. Rejected frames are kept alive, along
    /// with the callbacks registered on them.
    pub fn reject_mounts(&self, reject: bool) {
        self.reject_mounts.set(reject);
    }

    /// Alerts shown so far
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    /// URLs the page was redirected to
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.borrow().clone()
    }

    /// Popups opened so far
    pub fn popups(&self) -> Vec<MemoryWindow> {
        self.popups.borrow().clone()
    }

    /// The frame currently mounted in `target`
    pub fn mounted(&self, target: &str) -> Option<MemoryFrame> {
        self.mounts.borrow().get(target).cloned()
    }

    /// URLs of the live prefetch frames
    pub fn prefetched(&self) -> Vec<String> {
        self.prefetched.borrow().clone()
    }

    /// Number of registered message listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Browser for MemoryBrowser {
    type Window = MemoryWindow;
    type Frame = MemoryFrame;
    type Target = String;

    fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    fn set_hash(&self, hash: &str) {
        let mut location = self.location.borrow_mut();
        let base = location
            .href
            .split_once('#')
            .map(|(base, _)| base.to_string())
            .unwrap_or_else(|| location.href.clone());
        let hash = hash.trim_start_matches('#');
        let href = if hash.is_empty() {
            base
        } else {
            format!("{base}#{hash}")
        };
        *location = Location::parse(&href);
    }

    fn redirect(&self, url: &str) {
        self.redirects.borrow_mut().push(url.to_string());
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }

    fn create_frame(&self) -> Result<MemoryFrame, BrowserError> {
        Ok(MemoryFrame::default())
    }

    fn mount(&self, target: &String, frame: &MemoryFrame) -> Result<(), BrowserError> {
        if self.reject_mounts.get() {
            self.rejected.borrow_mut().push(frame.clone());
            return Err(BrowserError::Dom(format!("no element {target}")));
        }
        self.mounts
            .borrow_mut()
            .insert(target.clone(), frame.clone());
        Ok(())
    }

    fn replace_frame(&self, frame: &MemoryFrame) -> Result<MemoryFrame, BrowserError> {
        let copy = frame.copy();
        let mut mounts = self.mounts.borrow_mut();
        let slot = mounts
            .values_mut()
            .find(|mounted| &**mounted == frame)
            .ok_or_else(|| BrowserError::Dom("frame is not attached".into()))?;
        *slot = copy.clone();
        Ok(copy)
    }

    fn prefetch(&self, url: &str) -> Result<(), BrowserError> {
        self.prefetched.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn remove_prefetch_frames(&self) {
        self.prefetched.borrow_mut().clear();
    }

    fn add_message_listener(&self, listener: MessageListener<MemoryWindow>) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().shift_remove(&id);
    }

    fn open_popup(&self, url: &str) -> Option<MemoryWindow> {
        if self.block_popups.get() {
            return None;
        }
        let window = MemoryWindow::new();
        *window.0.url.borrow_mut() = url.to_string();
        self.popups.borrow_mut().push(window.clone());
        Some(window)
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(error) = self.spawner.spawn_local(task) {
            tracing::error!("Unable to spawn task: {error}");
        }
    }

    fn now(&self) -> f64 {
        self.clock.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_replaces_a_mounted_frame_in_place() {
        let browser = MemoryBrowser::new("http://localhost/");
        let frame = browser.create_frame().unwrap();
        frame.set_src("http://tshost/#/embed");
        browser.mount(&"root".to_string(), &frame).unwrap();

        let copy = browser.replace_frame(&frame).unwrap();

        assert_ne!(copy, frame);
        assert_eq!(copy.src(), frame.src());
        assert_eq!(browser.mounted("root"), Some(copy));
    }

    #[test]
    fn it_delivers_messages_to_listeners_in_order() {
        let browser = MemoryBrowser::new("http://localhost/");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = {
            let seen = seen.clone();
            browser.add_message_listener(Rc::new(move |message: InboundMessage<MemoryWindow>| {
                seen.borrow_mut().push(("first", message.data))
            }))
        };
        {
            let seen = seen.clone();
            browser.add_message_listener(Rc::new(move |message: InboundMessage<MemoryWindow>| {
                seen.borrow_mut().push(("second", message.data))
            }));
        }

        browser.deliver(None, json!(1), None);
        browser.remove_message_listener(first);
        browser.deliver(None, json!(2), None);

        assert_eq!(
            *seen.borrow(),
            vec![("first", json!(1)), ("second", json!(1)), ("second", json!(2))]
        );
    }

    #[test]
    fn it_runs_spawned_tasks_when_driven() {
        let browser = MemoryBrowser::new("http://localhost/");
        let done = Rc::new(Cell::new(false));

        {
            let done = done.clone();
            browser.spawn(Box::pin(async move { done.set(true) }));
        }
        assert!(!done.get());

        browser.run();
        assert!(done.get());
    }

    #[test]
    fn it_replaces_the_hash() {
        let browser = MemoryBrowser::new("http://localhost/page#old");
        browser.set_hash("new");
        assert_eq!(browser.location().href, "http://localhost/page#new");
        browser.set_hash("");
        assert_eq!(browser.location().href, "http://localhost/page");
    }
}
