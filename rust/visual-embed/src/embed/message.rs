use serde_json::{Value, json};
use std::rc::Rc;

use crate::{EmbedEvent, browser::Port};

use super::answer::AnswerService;

/// An event delivered to handlers registered with [`Embed::on`](super::Embed::on).
#[derive(Debug, Clone)]
pub struct EmbedMessage {
    /// The event name as it appeared on the wire
    pub event_type: String,
    /// The event payload
    pub data: Value,
    /// Paginated data access for custom actions on charts and tables
    pub answer_service: Option<AnswerService>,
}

impl EmbedMessage {
    /// A message raised by the SDK itself
    pub fn local(event: EmbedEvent, data: Value) -> Self {
        Self {
            event_type: event.as_str().to_string(),
            data,
            answer_service: None,
        }
    }

    /// Read an inbound envelope. The type may travel as `type` or `__type`
    /// and the payload as `data` or `payload`.
    pub fn from_envelope(envelope: &Value) -> Option<Self> {
        let event_type = envelope
            .get("type")
            .or_else(|| envelope.get("__type"))
            .and_then(Value::as_str)?
            .to_string();
        let data = envelope
            .get("data")
            .filter(|data| !data.is_null())
            .or_else(|| envelope.get("payload"))
            .cloned()
            .unwrap_or(Value::Null);

        Some(Self {
            event_type,
            data,
            answer_service: None,
        })
    }

    /// Whether this message is the given event
    pub fn is(&self, event: EmbedEvent) -> bool {
        self.event_type == event.as_str()
    }
}

/// Replies to the sender of a message over the port it transferred.
#[derive(Clone, Default)]
pub struct Responder {
    port: Option<Rc<dyn Port>>,
}

impl Responder {
    pub(crate) fn new(port: Option<Rc<dyn Port>>) -> Self {
        Self { port }
    }

    /// Post `{type, data}` back to the sender
    pub fn respond(&self, event_type: &str, data: Value) {
        let Some(port) = &self.port else {
            tracing::warn!("Event Port is not defined");
            return;
        };
        if let Err(error) = port.post(&json!({ "type": event_type, "data": data })) {
            tracing::error!("{error}");
            let _ = port.post(&json!({ "error": error.to_string() }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::memory::MemoryPort;

    #[test]
    fn it_reads_legacy_envelopes() {
        let message =
            EmbedMessage::from_envelope(&json!({ "__type": "data", "payload": [1, 2] })).unwrap();

        assert!(message.is(EmbedEvent::Data));
        assert_eq!(message.data, json!([1, 2]));
        assert!(EmbedMessage::from_envelope(&json!({ "data": 1 })).is_none());
    }

    #[test]
    fn it_prefers_data_over_payload() {
        let message = EmbedMessage::from_envelope(
            &json!({ "type": "alert", "data": "a", "payload": "b" }),
        )
        .unwrap();
        assert_eq!(message.data, json!("a"));
    }

    #[test]
    fn it_replies_on_the_port() {
        let port = MemoryPort::new();
        let responder = Responder::new(Some(Rc::new(port.clone())));

        responder.respond("EmbedIframeCenter", json!({ "iframeCenter": 10 }));
        Responder::default().respond("ignored", Value::Null);

        assert_eq!(
            port.received(),
            vec![json!({ "type": "EmbedIframeCenter", "data": { "iframeCenter": 10 } })]
        );
    }
}
