//! HTTP transport used by the auth flows and the answer service.

use async_trait::async_trait;
use reqwest::Client;

use crate::HttpError;

/// The HTTP methods the SDK issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// A request to the analytics host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<String>,
    /// Send the browser's cookies for the target origin
    pub include_credentials: bool,
}

impl HttpRequest {
    /// A credentialed GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            include_credentials: true,
        }
    }

    /// A credentialed POST request
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            body: Some(body.into()),
            ..Self::get(url)
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Control whether cookies are sent
    pub fn with_credentials(mut self, include: bool) -> Self {
        self.include_credentials = include;
        self
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

/// A response from the analytics host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the analytics host.
#[async_trait(?Send)]
pub trait HttpClient {
    /// Send `request` and read the full response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// [`HttpClient`] backed by `reqwest`; uses `fetch` on wasm.
#[derive(Clone, Default)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Create a client
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.url.clone();
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
        if request.include_credentials {
            builder = builder.fetch_credentials_include();
        }

        let response = builder.send().await.map_err(|e| HttpError::Request {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| HttpError::Body {
            url,
            reason: e.to_string(),
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::{cell::RefCell, collections::VecDeque, rc::Rc};

    /// Replies to requests from a script and records what was sent.
    #[derive(Clone, Default)]
    pub struct ScriptedClient {
        replies: Rc<RefCell<VecDeque<(String, Result<HttpResponse, HttpError>)>>>,
        requests: Rc<RefCell<Vec<HttpRequest>>>,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer the next request whose URL contains `url_part`
        pub fn reply(&self, url_part: &str, status: u16, body: &str) -> &Self {
            self.replies
                .borrow_mut()
                .push_back((url_part.to_string(), Ok(HttpResponse::new(status, body))));
            self
        }

        /// Fail the next request whose URL contains `url_part`
        pub fn fail(&self, url_part: &str) -> &Self {
            self.replies.borrow_mut().push_back((
                url_part.to_string(),
                Err(HttpError::Request {
                    url: url_part.to_string(),
                    reason: "connection refused".into(),
                }),
            ));
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests
                .borrow()
                .iter()
                .map(|request| request.url.clone())
                .collect()
        }
    }

    #[async_trait(?Send)]
    impl HttpClient for ScriptedClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests.borrow_mut().push(request.clone());
            let mut replies = self.replies.borrow_mut();
            let position = replies
                .iter()
                .position(|(part, _)| request.url.contains(part.as_str()));
            match position.and_then(|position| replies.remove(position)) {
                Some((_, reply)) => reply,
                None => Ok(HttpResponse::new(404, "")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_credentialed_requests() {
        let request = HttpRequest::post("http://tshost/login", "a=b")
            .with_header("Content-Type", "application/x-www-form-urlencoded");

        assert_eq!(request.method, Method::Post);
        assert!(request.include_credentials);
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body.as_deref(), Some("a=b"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod integration {
        use super::*;
        use axum::{
            Router,
            http::{HeaderMap, StatusCode},
            response::IntoResponse,
            routing::{get, post},
        };
        use tokio::net::TcpListener;

        async fn handle_info() -> impl IntoResponse {
            (StatusCode::OK, r#"{"userGUID":"u-1"}"#)
        }

        async fn handle_login(headers: HeaderMap, body: String) -> impl IntoResponse {
            let requested_by = headers
                .get("x-requested-by")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            if requested_by == "ThoughtSpot" && body == "username=tsadmin&password=secret" {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::UNAUTHORIZED
            }
        }

        async fn start_test_server() -> String {
            let app = Router::new()
                .route("/callosum/v1/session/info", get(handle_info))
                .route("/callosum/v1/session/login", post(handle_login));

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            format!("http://{}", addr)
        }

        #[tokio::test]
        async fn it_reads_status_and_body() -> anyhow::Result<()> {
            let host = start_test_server().await;
            let client = ReqwestClient::new();

            let response = client
                .send(HttpRequest::get(format!("{host}/callosum/v1/session/info")))
                .await?;

            assert!(response.is_success());
            assert_eq!(response.body, r#"{"userGUID":"u-1"}"#);
            Ok(())
        }

        #[tokio::test]
        async fn it_sends_headers_and_body() -> anyhow::Result<()> {
            let host = start_test_server().await;
            let client = ReqwestClient::new();

            let accepted = client
                .send(
                    HttpRequest::post(
                        format!("{host}/callosum/v1/session/login"),
                        "username=tsadmin&password=secret",
                    )
                    .with_header("x-requested-by", "ThoughtSpot"),
                )
                .await?;
            let rejected = client
                .send(HttpRequest::post(
                    format!("{host}/callosum/v1/session/login"),
                    "username=tsadmin&password=wrong",
                ))
                .await?;

            assert_eq!(accepted.status, 204);
            assert_eq!(rejected.status, 401);
            Ok(())
        }

        #[tokio::test]
        async fn it_reports_unreachable_hosts() {
            let client = ReqwestClient::new();
            let result = client
                .send(HttpRequest::get("http://127.0.0.1:1/callosum/v1/session/info"))
                .await;

            assert!(matches!(result, Err(HttpError::Request { .. })));
        }
    }
}
