//! Single sign-on: redirect targets, the return-trip marker and the popup
//! completion signal.

use futures::{
    FutureExt,
    channel::oneshot,
    future::{LocalBoxFuture, Shared},
};
use serde_json::Value;
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::{
    EmbedEvent,
    browser::{Browser, InboundMessage, ListenerId, MessageListener, Window},
    query::append_to_url_hash,
};

use super::session::Endpoint;

/// Appended to the page hash before redirecting to the identity provider,
/// so the return trip can be recognised.
pub const SSO_REDIRECTION_MARKER: &str = "5e16222e-ef02-43e9-9fbd-24226bf3ce5b";

/// Resolves `true` once the popup reports success.
pub(crate) type Completion = Shared<LocalBoxFuture<'static, bool>>;

/// The identity protocols the SDK can redirect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsoProtocol {
    /// SAML
    Saml,
    /// OpenID Connect
    Oidc,
}

impl SsoProtocol {
    fn endpoint(&self) -> &'static str {
        match self {
            SsoProtocol::Saml => Endpoint::SAML_LOGIN,
            SsoProtocol::Oidc => Endpoint::OIDC_LOGIN,
        }
    }
}

/// Where the identity provider sends the user back to.
pub fn return_url(host: &str, page_href: &str, no_redirect: bool) -> String {
    if no_redirect {
        format!("{host}/v2/#/embed/saml-complete")
    } else {
        append_to_url_hash(page_href, SSO_REDIRECTION_MARKER)
    }
}

/// The login URL of `protocol` on `host`, returning to `return_url`.
pub fn login_url(host: &str, protocol: SsoProtocol, return_url: &str) -> String {
    format!(
        "{host}{}{}",
        protocol.endpoint(),
        urlencoding::encode(return_url)
    )
}

/// Whether the page is on the return trip of a redirect.
pub fn is_at_marker(href: &str) -> bool {
    href.contains(SSO_REDIRECTION_MARKER)
}

/// Remove the marker from the page hash.
pub fn strip_marker<B: Browser>(browser: &B) {
    let hash = browser.location().hash;
    browser.set_hash(&hash.replace(SSO_REDIRECTION_MARKER, ""));
}

/// The serialized origin of `url`, if it has one.
pub fn origin_of(url: &str) -> Option<String> {
    let origin = url::Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// The popup currently open for login, shared with its completion listener.
pub(crate) type PopupSlot<W> = Rc<RefCell<Option<W>>>;

/// Listen for the completion message of the popup in `popup`. Only a
/// message sent by that popup or from the origin of `host` counts. On
/// completion the popup is closed and the listener removed.
pub(crate) fn completion<B: Browser>(
    browser: &Rc<B>,
    popup: PopupSlot<B::Window>,
    host: &str,
) -> Completion {
    let (sender, receiver) = oneshot::channel::<()>();
    let sender = Rc::new(RefCell::new(Some(sender)));
    let listener_id = Rc::new(RefCell::new(None));

    let listener = completion_listener(
        Rc::downgrade(browser),
        listener_id.clone(),
        sender,
        popup,
        origin_of(host),
    );
    *listener_id.borrow_mut() = Some(browser.add_message_listener(listener));

    receiver.map(|result| result.is_ok()).boxed_local().shared()
}

fn completion_listener<B: Browser>(
    browser: Weak<B>,
    listener_id: Rc<RefCell<Option<ListenerId>>>,
    sender: Rc<RefCell<Option<oneshot::Sender<()>>>>,
    popup: PopupSlot<B::Window>,
    host_origin: Option<String>,
) -> MessageListener<B::Window> {
    Rc::new(move |message: InboundMessage<B::Window>| {
        let is_complete = message.data.get("type").and_then(Value::as_str)
            == Some(EmbedEvent::SamlComplete.as_str());
        if !is_complete {
            return;
        }
        let from_popup = message.source.is_some() && message.source == *popup.borrow();
        let from_host = host_origin.as_deref() == Some(message.origin.as_str());
        if !from_popup && !from_host {
            tracing::warn!(
                "Ignoring a login completion from an unexpected origin: {}",
                message.origin
            );
            return;
        }
        if let Some(popup) = popup.borrow().as_ref() {
            popup.close();
        }
        if let Some(sender) = sender.borrow_mut().take() {
            let _ = sender.send(());
        }
        if let (Some(browser), Some(id)) = (browser.upgrade(), listener_id.borrow_mut().take()) {
            browser.remove_message_listener(id);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_targets_the_completion_page_for_popups() {
        assert_eq!(
            return_url("https://tshost", "http://app/page", true),
            "https://tshost/v2/#/embed/saml-complete"
        );
    }

    #[test]
    fn it_marks_the_page_for_redirects() {
        let target = return_url("https://tshost", "http://app/page#/home", false);
        assert_eq!(target, format!("http://app/page#/home{SSO_REDIRECTION_MARKER}"));
        assert!(is_at_marker(&target));
    }

    #[test]
    fn it_serializes_origins() {
        assert_eq!(origin_of("https://tshost/ts/"), Some("https://tshost".into()));
        assert_eq!(
            origin_of("http://tshost:8088"),
            Some("http://tshost:8088".into())
        );
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn it_builds_login_urls() {
        assert_eq!(
            login_url("https://tshost", SsoProtocol::Saml, "http://app/#x"),
            "https://tshost/callosum/v1/saml/login?targetURLPath=http%3A%2F%2Fapp%2F%23x"
        );
        assert!(
            login_url("https://tshost", SsoProtocol::Oidc, "http://app/")
                .starts_with("https://tshost/callosum/v1/oidc/login?targetURLPath=")
        );
    }
}
