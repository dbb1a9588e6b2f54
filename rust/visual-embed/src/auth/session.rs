use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Paths of the session endpoints, relative to the analytics host.
pub struct Endpoint;

#[allow(missing_docs)]
impl Endpoint {
    pub const SESSION_INFO: &'static str = "/callosum/v1/session/info";
    pub const SAML_LOGIN: &'static str = "/callosum/v1/saml/login?targetURLPath=";
    pub const OIDC_LOGIN: &'static str = "/callosum/v1/oidc/login?targetURLPath=";
    pub const TOKEN_LOGIN: &'static str = "/callosum/v1/session/login/token";
    pub const BASIC_LOGIN: &'static str = "/callosum/v1/session/login";
    pub const LOGOUT: &'static str = "/callosum/v1/session/logout";
}

/// A session id with its generation number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionId {
    /// Server issued id
    pub session_id: String,
    /// Generation of the id
    pub gen_no: i64,
}

/// The server session descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Server issued id
    pub session_id: String,
    /// Generation of the id
    pub gen_no: i64,
    /// The secondary session
    #[serde(default)]
    pub ac_session: SessionId,
}

/// What the embedded app or the session probe reports about the current
/// user. Fields the SDK does not interpret are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The signed in user
    #[serde(rename = "userGUID", default)]
    pub user_guid: Option<String>,
    /// The session descriptor
    #[serde(default)]
    pub session: Option<Session>,
    /// Everything else
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionInfo {
    /// The payload handlers see for an auth-init event: only the user id
    pub fn public_view(&self) -> Value {
        let mut view = Map::new();
        view.insert(
            "userGUID".into(),
            self.user_guid.clone().map(Value::String).unwrap_or(Value::Null),
        );
        Value::Object(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_reads_the_session_descriptor() {
        let info: SessionInfo = serde_json::from_value(json!({
            "userGUID": "u-1",
            "session": {
                "sessionId": "s-1",
                "genNo": 2,
                "acSession": { "sessionId": "ac-1", "genNo": 3 }
            },
            "userName": "tsadmin"
        }))
        .unwrap();

        let session = info.session.clone().unwrap();
        assert_eq!(session.session_id, "s-1");
        assert_eq!(session.ac_session.gen_no, 3);
        assert_eq!(info.extra.get("userName"), Some(&json!("tsadmin")));
        assert_eq!(info.public_view(), json!({ "userGUID": "u-1" }));
    }
}
