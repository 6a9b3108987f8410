use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// Minimal HTTP method set needed by the portal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP request envelope used by session transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 30_000,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Builds a `application/x-www-form-urlencoded` POST, preserving field order.
    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let body = fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        Self::new(HttpMethod::Post, url)
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// 2xx or 3xx. The login POST answers with a redirect on success.
    pub const fn is_success_or_redirect(&self) -> bool {
        self.status >= 200 && self.status < 400
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract shared by the session and the fetch loop.
///
/// Implementations keep whatever cookie state the portal hands out, so one
/// client instance represents one logged-in session.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client backed by reqwest with an in-memory cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    /// Create a client with a fresh cookie store.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dmd/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()
            .map_err(|e| HttpError::non_retryable(format!("failed to build http client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Wrap a preconfigured reqwest client. It must have a cookie store
    /// enabled for the portal session to survive past login.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(std::time::Duration::from_millis(request.timeout_ms));

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else if e.is_builder() {
                    HttpError::non_retryable(format!("invalid request: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse { status, body })
        })
    }
}

type FixtureReply = Result<HttpResponse, HttpError>;

#[derive(Debug)]
struct FixtureRoute {
    method: HttpMethod,
    url_suffix: String,
    replies: VecDeque<FixtureReply>,
}

/// In-memory transport for deterministic offline tests.
///
/// Requests are matched against registered routes by method and URL suffix.
/// A route with several replies hands them out in order and keeps repeating
/// the last one. Unmatched requests get the fallback reply (404 by default).
#[derive(Debug, Default)]
pub struct FixtureHttpClient {
    routes: Mutex<Vec<FixtureRoute>>,
    fallback: Option<HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FixtureHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, response: HttpResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    pub fn route(self, method: HttpMethod, url_suffix: impl Into<String>, reply: FixtureReply) -> Self {
        self.route_sequence(method, url_suffix, vec![reply])
    }

    pub fn route_sequence(
        self,
        method: HttpMethod,
        url_suffix: impl Into<String>,
        replies: Vec<FixtureReply>,
    ) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FixtureRoute {
                method,
                url_suffix: url_suffix.into(),
                replies: replies.into(),
            });
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn reply_for(&self, request: &HttpRequest) -> FixtureReply {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let route = routes.iter_mut().find(|route| {
            route.method == request.method && request.url.ends_with(&route.url_suffix)
        });

        match route {
            Some(route) if route.replies.len() > 1 => route
                .replies
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
            Some(route) => route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
            None => Ok(self
                .fallback
                .clone()
                .unwrap_or_else(|| HttpResponse::new(404, ""))),
        }
    }
}

impl HttpClient for FixtureHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let reply = self.reply_for(&request);
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            reply
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_form_encodes_fields_in_order() {
        let request = HttpRequest::post_form(
            "https://portal.test/login.html",
            &[("username", "ops@desk"), ("password", "p&ss w=rd"), ("_csrf", "abc")],
        );

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.body.as_deref(),
            Some("username=ops%40desk&password=p%26ss%20w%3Drd&_csrf=abc")
        );
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn redirect_counts_as_success_for_login() {
        assert!(HttpResponse::new(302, "").is_success_or_redirect());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success_or_redirect());
    }

    #[tokio::test]
    async fn fixture_repeats_last_reply_and_logs_requests() {
        let client = FixtureHttpClient::new().route_sequence(
            HttpMethod::Get,
            "/a.csv",
            vec![Ok(HttpResponse::new(503, "")), Ok(HttpResponse::ok("x"))],
        );

        let first = client.execute(HttpRequest::get("https://p/a.csv")).await;
        let second = client.execute(HttpRequest::get("https://p/a.csv")).await;
        let third = client.execute(HttpRequest::get("https://p/a.csv")).await;
        let missing = client.execute(HttpRequest::get("https://p/b.csv")).await;

        assert_eq!(first.map(|r| r.status), Ok(503));
        assert_eq!(second.map(|r| r.status), Ok(200));
        assert_eq!(third.map(|r| r.status), Ok(200));
        assert_eq!(missing.map(|r| r.status), Ok(404));
        assert_eq!(client.request_count(), 4);
    }

    #[tokio::test]
    async fn fixture_keeps_serving_after_a_panicking_holder() {
        let client = Arc::new(FixtureHttpClient::new().with_fallback(HttpResponse::ok("x")));
        let holder = Arc::clone(&client);
        let panicked = std::thread::spawn(move || {
            let _routes = holder.routes.lock();
            let _requests = holder.requests.lock();
            panic!("test thread gives up while holding the fixture locks");
        })
        .join();
        assert!(panicked.is_err());
        assert!(client.requests.is_poisoned());

        assert_eq!(client.request_count(), 0);
        let response = client.execute(HttpRequest::get("https://p/a.csv")).await;
        assert_eq!(response.map(|r| r.status), Ok(200));
        assert_eq!(client.requests().len(), 1);
    }
}
