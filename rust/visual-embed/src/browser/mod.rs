//! The host page as seen by the SDK.
//!
//! Everything the SDK does to the page it lives in (reading the location,
//! creating and mounting frames, listening for cross-frame messages,
//! opening popups, scheduling work) goes through the [`Browser`] trait.
//! [`memory::MemoryBrowser`] emulates a page in memory and drives the
//! SDK in tests; on `wasm32-unknown-unknown` the `web` module implements
//! the trait on top of `web-sys`.

use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::rc::Rc;

use crate::BrowserError;

pub mod memory;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod web;

/// The parts of the page location the SDK reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// The full URL
    pub href: String,
    /// The scheme including the colon, e.g. `"https:"`
    pub protocol: String,
    /// Hostname and port
    pub host: String,
    /// The fragment including the `#`, or empty
    pub hash: String,
}

impl Location {
    /// Split a URL into the parts the SDK reads.
    pub fn parse(href: &str) -> Self {
        match url::Url::parse(href) {
            Ok(url) => {
                let host = match (url.host_str(), url.port()) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    (Some(host), None) => host.to_string(),
                    _ => String::new(),
                };
                let hash = url
                    .fragment()
                    .map(|fragment| format!("#{fragment}"))
                    .unwrap_or_default();
                Self {
                    href: href.to_string(),
                    protocol: format!("{}:", url.scheme()),
                    host,
                    hash,
                }
            }
            Err(_) => Self {
                href: href.to_string(),
                ..Default::default()
            },
        }
    }
}

/// The visible area of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    /// Inner width in pixels
    pub width: u32,
    /// Inner height in pixels
    pub height: u32,
    /// Vertical scroll offset in pixels
    pub scroll_y: f64,
}

/// A browsing context the SDK holds a handle to: a frame's content window
/// or a popup.
pub trait Window: Clone + PartialEq + 'static {
    /// Close the window
    fn close(&self);
    /// Bring the window to the front
    fn focus(&self);
    /// Whether the window has been closed
    fn is_closed(&self) -> bool;
}

/// An iframe element owned by an embed.
pub trait Frame: Clone + PartialEq + 'static {
    /// The type of the frame's content window
    type Window: Window;

    /// The current source URL
    fn src(&self) -> String;
    /// Navigate the frame
    fn set_src(&self, src: &str);
    /// Allow the embedded content to go fullscreen
    fn allow_fullscreen(&self);
    /// Set the frame's CSS width and height
    fn set_size(&self, width: &str, height: &str);
    /// Set the frame's CSS height
    fn set_height(&self, height: &str);
    /// Set the frame's name attribute
    fn set_name(&self, name: &str);
    /// The frame's content window, once it has one
    fn content_window(&self) -> Option<Self::Window>;
    /// Post `message` to the content window, restricted to `target_origin`
    fn post_message(&self, message: &Value, target_origin: &str) -> Result<(), BrowserError>;
    /// Run `callback` once the frame finishes loading
    fn on_load(&self, callback: Box<dyn FnOnce()>);
    /// Run `callback` if the frame fails to load
    fn on_error(&self, callback: Box<dyn FnOnce()>);
    /// Distance from the top of the page in pixels
    fn offset_top(&self) -> f64;
    /// Rendered height in pixels
    fn offset_height(&self) -> f64;
}

/// A reply channel transferred along with an inbound message.
pub trait Port {
    /// Post a message back to the sender
    fn post(&self, message: &Value) -> Result<(), BrowserError>;
}

/// A message received from another browsing context.
pub struct InboundMessage<W> {
    /// The window that sent the message, when known
    pub source: Option<W>,
    /// Serialized origin of the sender, e.g. `"https://host:8443"`
    pub origin: String,
    /// The structured message payload
    pub data: Value,
    /// The first transferred port, if any
    pub port: Option<Rc<dyn Port>>,
}

/// Identifies a registered message listener.
pub type ListenerId = u64;

/// A callback receiving every message posted to the page.
pub type MessageListener<W> = Rc<dyn Fn(InboundMessage<W>)>;

/// The host page: its location, DOM, message bus and task scheduler.
pub trait Browser: 'static {
    /// Handles to other browsing contexts
    type Window: Window;
    /// Iframe elements
    type Frame: Frame<Window = Self::Window>;
    /// Containers an embed can be mounted into
    type Target: Clone + 'static;

    /// The current page location
    fn location(&self) -> Location;
    /// Replace the fragment of the page URL without navigating
    fn set_hash(&self, hash: &str);
    /// Navigate the page away
    fn redirect(&self, url: &str);
    /// The visible area of the page
    fn viewport(&self) -> Viewport;
    /// Show a blocking alert to the user
    fn alert(&self, message: &str);

    /// Create a detached iframe
    fn create_frame(&self) -> Result<Self::Frame, BrowserError>;
    /// Empty `target` and insert `frame` as its only child
    fn mount(&self, target: &Self::Target, frame: &Self::Frame) -> Result<(), BrowserError>;
    /// Swap `frame` for a fresh copy in the same position, returning the copy
    fn replace_frame(&self, frame: &Self::Frame) -> Result<Self::Frame, BrowserError>;
    /// Load `url` in an invisible frame to warm the cache
    fn prefetch(&self, url: &str) -> Result<(), BrowserError>;
    /// Remove every frame created by [`Browser::prefetch`]
    fn remove_prefetch_frames(&self);

    /// Receive every message posted to the page
    fn add_message_listener(&self, listener: MessageListener<Self::Window>) -> ListenerId;
    /// Stop delivering messages to a listener
    fn remove_message_listener(&self, id: ListenerId);

    /// Open `url` in a new window; `None` when the popup was blocked
    fn open_popup(&self, url: &str) -> Option<Self::Window>;

    /// Run a task on the page's event loop
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
    /// Milliseconds since the epoch
    fn now(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_splits_a_location() {
        let location = Location::parse("http://localhost:3000/app/#/home");
        assert_eq!(location.protocol, "http:");
        assert_eq!(location.host, "localhost:3000");
        assert_eq!(location.hash, "#/home");

        let location = Location::parse("https://analytics.example.com/page");
        assert_eq!(location.host, "analytics.example.com");
        assert_eq!(location.hash, "");
    }
}
