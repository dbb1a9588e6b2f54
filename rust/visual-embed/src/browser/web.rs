//! [`Browser`] backed by the real DOM through `web-sys`.

use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};
use wasm_bindgen::{JsCast, JsValue, prelude::Closure};
use web_sys::{Element, HtmlIFrameElement, MessageEvent, MessagePort};

use super::{
    Browser, Frame, InboundMessage, ListenerId, Location, MessageListener, Port, Viewport, Window,
};
use crate::BrowserError;

const PREFETCH_CLASS: &str = "prefetchIframe";

fn dom_error(error: JsValue) -> BrowserError {
    BrowserError::Dom(format!("{error:?}"))
}

fn to_js(value: &Value) -> Result<JsValue, BrowserError> {
    let json =
        serde_json::to_string(value).map_err(|error| BrowserError::PostMessage(error.to_string()))?;
    js_sys::JSON::parse(&json).map_err(|error| BrowserError::PostMessage(format!("{error:?}")))
}

fn from_js(value: &JsValue) -> Value {
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|json| json.as_string())
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or(Value::Null)
}

fn set_style(frame: &HtmlIFrameElement, properties: &[(&str, &str)]) {
    let style = frame.style();
    for (property, value) in properties {
        if let Err(error) = style.set_property(property, value) {
            tracing::warn!("Unable to set the frame {property}: {error:?}");
        }
    }
}

impl Window for web_sys::Window {
    fn close(&self) {
        let _ = web_sys::Window::close(self);
    }

    fn focus(&self) {
        let _ = web_sys::Window::focus(self);
    }

    fn is_closed(&self) -> bool {
        self.closed().unwrap_or(true)
    }
}

impl Frame for HtmlIFrameElement {
    type Window = web_sys::Window;

    fn src(&self) -> String {
        HtmlIFrameElement::src(self)
    }

    fn set_src(&self, src: &str) {
        HtmlIFrameElement::set_src(self, src);
    }

    fn allow_fullscreen(&self) {
        self.set_allow_fullscreen(true);
        for attribute in ["webkitallowfullscreen", "mozallowfullscreen"] {
            if let Err(error) = self.set_attribute(attribute, "true") {
                tracing::warn!("Unable to set {attribute}: {error:?}");
            }
        }
    }

    fn set_size(&self, width: &str, height: &str) {
        set_style(self, &[("width", width), ("height", height), ("border", "0")]);
    }

    fn set_height(&self, height: &str) {
        set_style(self, &[("height", height)]);
    }

    fn set_name(&self, name: &str) {
        HtmlIFrameElement::set_name(self, name);
    }

    fn content_window(&self) -> Option<web_sys::Window> {
        HtmlIFrameElement::content_window(self)
    }

    fn post_message(&self, message: &Value, target_origin: &str) -> Result<(), BrowserError> {
        let window = HtmlIFrameElement::content_window(self).ok_or(BrowserError::NoContentWindow)?;
        window
            .post_message(&to_js(message)?, target_origin)
            .map_err(|error| BrowserError::PostMessage(format!("{error:?}")))
    }

    fn on_load(&self, callback: Box<dyn FnOnce()>) {
        let closure = Closure::once_into_js(move || callback());
        self.set_onload(Some(closure.unchecked_ref()));
    }

    fn on_error(&self, callback: Box<dyn FnOnce()>) {
        let closure = Closure::once_into_js(move || callback());
        self.set_onerror(Some(closure.unchecked_ref()));
    }

    fn offset_top(&self) -> f64 {
        f64::from(web_sys::HtmlElement::offset_top(self))
    }

    fn offset_height(&self) -> f64 {
        f64::from(web_sys::HtmlElement::offset_height(self))
    }
}

struct WebPort(MessagePort);

impl Port for WebPort {
    fn post(&self, message: &Value) -> Result<(), BrowserError> {
        self.0
            .post_message(&to_js(message)?)
            .map_err(|error| BrowserError::PostMessage(format!("{error:?}")))
    }
}

/// The page the module was loaded into.
pub struct WebBrowser {
    window: web_sys::Window,
    listeners: RefCell<HashMap<ListenerId, Closure<dyn FnMut(MessageEvent)>>>,
    next_listener: Cell<ListenerId>,
}

impl WebBrowser {
    /// Attach to the global window; `None` outside a window context
    pub fn new() -> Option<Rc<Self>> {
        console_error_panic_hook::set_once();
        let window = web_sys::window()?;
        Some(Rc::new(Self {
            window,
            listeners: RefCell::default(),
            next_listener: Cell::new(0),
        }))
    }

    fn document(&self) -> Result<web_sys::Document, BrowserError> {
        self.window
            .document()
            .ok_or_else(|| BrowserError::Dom("no document".into()))
    }
}

impl Browser for WebBrowser {
    type Window = web_sys::Window;
    type Frame = HtmlIFrameElement;
    type Target = Element;

    fn location(&self) -> Location {
        let location = self.window.location();
        Location {
            href: location.href().unwrap_or_default(),
            protocol: location.protocol().unwrap_or_default(),
            host: location.host().unwrap_or_default(),
            hash: location.hash().unwrap_or_default(),
        }
    }

    fn set_hash(&self, hash: &str) {
        if let Err(error) = self.window.location().set_hash(hash) {
            tracing::warn!("Unable to update the page hash: {error:?}");
        }
    }

    fn redirect(&self, url: &str) {
        if let Err(error) = self.window.location().set_href(url) {
            tracing::error!("Unable to redirect to {url}: {error:?}");
        }
    }

    fn viewport(&self) -> Viewport {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|value| value.as_f64()).unwrap_or_default() as u32
        };
        Viewport {
            width: dimension(self.window.inner_width()),
            height: dimension(self.window.inner_height()),
            scroll_y: self.window.scroll_y().unwrap_or_default(),
        }
    }

    fn alert(&self, message: &str) {
        let _ = self.window.alert_with_message(message);
    }

    fn create_frame(&self) -> Result<HtmlIFrameElement, BrowserError> {
        self.document()?
            .create_element("iframe")
            .map_err(dom_error)?
            .dyn_into::<HtmlIFrameElement>()
            .map_err(|element| dom_error(element.into()))
    }

    fn mount(&self, target: &Element, frame: &HtmlIFrameElement) -> Result<(), BrowserError> {
        target.set_inner_html("");
        target.append_child(frame).map_err(dom_error)?;
        Ok(())
    }

    fn replace_frame(&self, frame: &HtmlIFrameElement) -> Result<HtmlIFrameElement, BrowserError> {
        let copy = frame
            .clone_node()
            .map_err(dom_error)?
            .dyn_into::<HtmlIFrameElement>()
            .map_err(|node| dom_error(node.into()))?;
        let parent = frame
            .parent_node()
            .ok_or_else(|| BrowserError::Dom("frame is not attached".into()))?;
        parent.replace_child(&copy, frame).map_err(dom_error)?;
        Ok(copy)
    }

    fn prefetch(&self, url: &str) -> Result<(), BrowserError> {
        let frame = self.create_frame()?;
        frame.set_src(url);
        let style = frame.style();
        for property in ["width", "height", "border"] {
            style.set_property(property, "0").map_err(dom_error)?;
        }
        frame.class_list().add_1(PREFETCH_CLASS).map_err(dom_error)?;
        self.document()?
            .body()
            .ok_or_else(|| BrowserError::Dom("no body".into()))?
            .append_child(&frame)
            .map_err(dom_error)?;
        Ok(())
    }

    fn remove_prefetch_frames(&self) {
        let Ok(document) = self.document() else {
            return;
        };
        let Ok(frames) = document.query_selector_all(&format!(".{PREFETCH_CLASS}")) else {
            return;
        };
        for index in 0..frames.length() {
            if let Some(node) = frames.item(index)
                && let Some(parent) = node.parent_node()
            {
                let _ = parent.remove_child(&node);
            }
        }
    }

    fn add_message_listener(&self, listener: MessageListener<web_sys::Window>) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);

        let closure = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let port = event
                .ports()
                .get(0)
                .dyn_into::<MessagePort>()
                .ok()
                .map(|port| Rc::new(WebPort(port)) as Rc<dyn Port>);
            listener(InboundMessage {
                source: event.source().map(|source| source.unchecked_into()),
                origin: event.origin(),
                data: from_js(&event.data()),
                port,
            });
        });

        if let Err(error) = self
            .window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            tracing::error!("Unable to listen for messages: {error:?}");
        }
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        if let Some(closure) = self.listeners.borrow_mut().remove(&id) {
            let _ = self
                .window
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
            // A listener may remove itself while running; its closure must
            // outlive the current call.
            wasm_bindgen_futures::spawn_local(async move { drop(closure) });
        }
    }

    fn open_popup(&self, url: &str) -> Option<web_sys::Window> {
        self.window
            .open_with_url_and_target(url, "_blank")
            .ok()
            .flatten()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn now(&self) -> f64 {
        js_sys::Date::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    fn frame() -> HtmlIFrameElement {
        WebBrowser::new()
            .and_then(|browser| browser.create_frame().ok())
            .unwrap()
    }

    #[wasm_bindgen_test]
    fn it_sizes_frames_with_css_lengths() {
        let frame = frame();

        frame.set_size("100%", "80vw");
        let style = frame.style();
        assert_eq!(style.get_property_value("width").unwrap(), "100%");
        assert_eq!(style.get_property_value("height").unwrap(), "80vw");
        assert_eq!(style.get_property_value("border-top-width").unwrap(), "0px");
        assert!(frame.get_attribute("height").is_none());

        Frame::set_height(&frame, "calc(100vh - 40px)");
        assert_eq!(
            frame.style().get_property_value("height").unwrap(),
            "calc(100vh - 40px)"
        );
    }

    #[wasm_bindgen_test]
    fn it_allows_fullscreen_with_vendor_attributes() {
        let frame = frame();

        Frame::allow_fullscreen(&frame);

        assert!(frame.allow_fullscreen());
        assert_eq!(frame.get_attribute("webkitallowfullscreen").as_deref(), Some("true"));
        assert_eq!(frame.get_attribute("mozallowfullscreen").as_deref(), Some("true"));
    }
}
