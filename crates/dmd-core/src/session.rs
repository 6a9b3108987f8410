//! Portal login and the authenticated session handle.
//!
//! The login page carries an anti-forgery token in a hidden input of its
//! first form. The token is posted back together with the credentials; the
//! resulting cookies live in the transport, so the [`Session`] is simply the
//! transport plus the portal root it was authenticated against.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{AuthenticationError, FetchError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::walk::ArtifactSource;

pub const DEFAULT_BASE_URL: &str = "https://dmd.lseg.com/dmd/";

const LOGIN_PAGE: &str = "login.html";

/// Portal username and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated portal session shared by every feed in a run.
#[derive(Clone)]
pub struct Session {
    http: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl Session {
    /// Runs the login handshake on `http` and returns the session bound to it.
    pub async fn authenticate(
        http: Arc<dyn HttpClient>,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<Self, AuthenticationError> {
        let session = Self {
            http,
            base_url: base_url.to_owned(),
            timeout_ms: 30_000,
        };
        let login_url = session.url_for(LOGIN_PAGE);

        let page = session
            .http
            .execute(HttpRequest::get(&login_url).with_timeout_ms(session.timeout_ms))
            .await
            .map_err(|e| AuthenticationError::Transport(e.message().to_owned()))?;
        if !page.is_success() {
            return Err(AuthenticationError::LoginPageStatus {
                status: page.status,
            });
        }

        let token = extract_csrf_token(&page.body)?;
        debug!(url = %login_url, "found anti-forgery token on login page");

        let result = session
            .http
            .execute(
                HttpRequest::post_form(
                    &login_url,
                    &[
                        ("username", credentials.username.as_str()),
                        ("password", credentials.password.as_str()),
                        ("_csrf", token.as_str()),
                    ],
                )
                .with_timeout_ms(session.timeout_ms),
            )
            .await
            .map_err(|e| AuthenticationError::Transport(e.message().to_owned()))?;
        if !result.is_success_or_redirect() {
            return Err(AuthenticationError::Rejected {
                status: result.status,
            });
        }

        info!(
            base_url = %session.base_url,
            username = %credentials.username,
            "authenticated against portal"
        );
        Ok(session)
    }

    /// Per-request deadline for artifact downloads.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a portal-relative path onto the base URL with exactly one slash.
    pub fn url_for(&self, relative: &str) -> String {
        join_url(&self.base_url, relative)
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl ArtifactSource for Session {
    fn fetch<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.url_for(path)).with_timeout_ms(self.timeout_ms);
            let response = self
                .http
                .execute(request)
                .await
                .map_err(|e| FetchError::transport(path, &e))?;

            if !response.is_success() {
                return Err(FetchError::status(path, response.status));
            }
            Ok(response.body)
        })
    }
}

pub(crate) fn join_url(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

fn form_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<form\b[^>]*>(.*?)(?:</form>|\z)").expect("form pattern is valid")
    })
}

fn input_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("input pattern is valid"))
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("attribute pattern is valid")
    })
}

fn attribute<'h>(tag: &'h str, name: &str) -> Option<&'h str> {
    attribute_pattern().captures_iter(tag).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
    })
}

/// Value of the first hidden input inside the first form of `html`.
pub fn extract_csrf_token(html: &str) -> Result<String, AuthenticationError> {
    let form = form_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or(AuthenticationError::MissingForm)?;

    input_pattern()
        .find_iter(form.as_str())
        .map(|m| m.as_str())
        .find(|tag| attribute(tag, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")))
        .and_then(|tag| attribute(tag, "value"))
        .map(str::to_owned)
        .ok_or(AuthenticationError::MissingCsrfToken)
}
