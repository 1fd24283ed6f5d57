//! Page session seam.
//!
//! Extraction only ever sees a [`PageSnapshot`]. Whatever produces the
//! snapshot (a plain HTTP fetch or a live browser tab) sits behind the
//! [`PageSession`] trait so the load-more controller and the pipeline can be
//! driven by scripted fakes in tests.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Selector that enumerates clickable elements, in document order.
///
/// [`ClickTarget::index`] is a position in this selection, so every session
/// implementation must resolve targets against the same selector.
pub const INTERACTIVE_SELECTOR: &str = r#"button, a, [role="button"]"#;

/// Rendered markup of a page at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
}

/// A clickable element located in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    /// Position among the elements matched by [`INTERACTIVE_SELECTOR`].
    pub index: usize,
    /// Visible text, used in logs.
    pub text: String,
}

/// Something that can load a page, report its current markup, and click.
pub trait PageSession {
    /// Navigate to `url` and wait for the load to finish.
    fn open(&mut self, url: &str) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Markup of the page as it is right now.
    fn snapshot(&mut self) -> impl Future<Output = Result<PageSnapshot, SessionError>> + Send;

    /// Click the element at `target`.
    fn click(
        &mut self,
        target: &ClickTarget,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Static-HTML session over reqwest.
///
/// Serves pages that render server-side. It cannot run scripts, so
/// [`PageSession::click`] always fails with [`SessionError::Unsupported`] and
/// the load-more controller stops after its first check.
pub struct HttpSession {
    client: reqwest::Client,
    timeout: Duration,
    current: Option<PageSnapshot>,
}

impl HttpSession {
    /// Build a session with a per-page timeout and a fixed user agent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            timeout,
            current: None,
        })
    }

    fn map_transport_error(&self, url: &str, err: reqwest::Error) -> SessionError {
        if err.is_timeout() {
            SessionError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            SessionError::Http(err)
        }
    }
}

impl PageSession for HttpSession {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        self.current = None;

        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        tracing::debug!(url, final_url, bytes = html.len(), "page loaded");
        self.current = Some(PageSnapshot {
            url: final_url,
            html,
        });
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, SessionError> {
        self.current.clone().ok_or(SessionError::NoPage)
    }

    async fn click(&mut self, _target: &ClickTarget) -> Result<(), SessionError> {
        Err(SessionError::Unsupported { operation: "click" })
    }
}
