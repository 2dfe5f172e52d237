//! The browser capability surface the dispatcher drives.

mod browser;
mod config;
mod js;

pub use browser::BrowserSession;
pub use config::{SessionConfig, Viewport};

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lifecycle of an automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// The session was stopped (explicitly or after a failure). Further
    /// capability calls fail with [`Error::SessionStopped`].
    Stopped,
}

/// Options for [`Automation::set_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetValueOptions {
    /// Clear the field first.
    pub clear: bool,
    /// Blur the field afterwards.
    pub blur: bool,
    /// Type key by key instead of assigning the value.
    pub typing: bool,
}

impl Default for SetValueOptions {
    fn default() -> Self {
        Self {
            clear: true,
            blur: true,
            typing: false,
        }
    }
}

/// A condition to poll for.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitCondition {
    /// At least one element matches.
    Presence(String),
    /// The first match is displayed.
    Visible(String),
    /// No match is displayed (absent counts as invisible).
    Invisible(String),
    /// The first match is displayed and enabled.
    Clickable(String),
    /// The element's text contains `text`.
    TextInElement { selector: String, text: String },
    /// The element's value equals (or, unless `exact`, contains) `value`.
    Value {
        selector: String,
        value: String,
        exact: bool,
    },
    /// The page title equals the given text.
    Title(String),
    /// The current URL contains the given text.
    UrlContains(String),
    /// The element's computed opacity equals the given value.
    Opacity { selector: String, value: f64 },
    /// A dialog is pending.
    Alert,
    /// Nothing matches.
    NotPresent(String),
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitCondition::Presence(s) => write!(f, "presence of '{}'", s),
            WaitCondition::Visible(s) => write!(f, "'{}' to be visible", s),
            WaitCondition::Invisible(s) => write!(f, "'{}' to be invisible", s),
            WaitCondition::Clickable(s) => write!(f, "'{}' to be clickable", s),
            WaitCondition::TextInElement { selector, text } => {
                write!(f, "text '{}' in '{}'", text, selector)
            }
            WaitCondition::Value {
                selector,
                value,
                exact: true,
            } => write!(f, "value '{}' of '{}'", value, selector),
            WaitCondition::Value { selector, value, .. } => {
                write!(f, "'{}' in value of '{}'", value, selector)
            }
            WaitCondition::Title(t) => write!(f, "title '{}'", t),
            WaitCondition::UrlContains(u) => write!(f, "url containing '{}'", u),
            WaitCondition::Opacity { selector, value } => {
                write!(f, "opacity {} of '{}'", value, selector)
            }
            WaitCondition::Alert => f.write_str("an alert"),
            WaitCondition::NotPresent(s) => write!(f, "'{}' to be gone", s),
        }
    }
}

/// Browser operations the dispatcher can perform.
///
/// Selectors are CSS, or XPath when they start with `/` or `(`. Element
/// reads and interactions act on the first match unless noted.
#[async_trait(?Send)]
pub trait Automation {
    fn config(&self) -> &SessionConfig;
    fn state(&self) -> SessionState;
    /// Stop the session. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    async fn go(&mut self, url: &str) -> Result<()>;
    async fn back(&mut self) -> Result<()>;
    async fn forward(&mut self) -> Result<()>;
    async fn refresh(&mut self) -> Result<()>;
    async fn current_url(&mut self) -> Result<String>;
    async fn title(&mut self) -> Result<String>;
    async fn page_text(&mut self) -> Result<String>;
    async fn page_source(&mut self) -> Result<String>;

    async fn count(&mut self, selector: &str) -> Result<usize>;
    async fn get_text(&mut self, selector: &str) -> Result<String>;
    /// Text of every match, in document order.
    async fn get_texts(&mut self, selector: &str) -> Result<Vec<String>>;
    async fn get_value(&mut self, selector: &str) -> Result<String>;
    /// Value of every match, in document order.
    async fn get_values(&mut self, selector: &str) -> Result<Vec<String>>;
    async fn get_attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>>;
    async fn is_displayed(&mut self, selector: &str) -> Result<bool>;
    async fn is_selected(&mut self, selector: &str) -> Result<bool>;

    async fn click(&mut self, selector: &str) -> Result<()>;
    /// Click every match; returns how many were clicked.
    async fn click_all(&mut self, selector: &str) -> Result<usize>;
    async fn set_value(&mut self, selector: &str, value: &str, opts: SetValueOptions)
        -> Result<()>;
    /// Set the value of the `index`th match (document order).
    async fn set_value_at(&mut self, selector: &str, index: usize, value: &str) -> Result<()>;
    async fn clear(&mut self, selector: &str) -> Result<()>;
    /// Select the option whose visible text matches.
    async fn select_option(&mut self, selector: &str, text: &str) -> Result<()>;
    async fn move_to(&mut self, selector: &str) -> Result<()>;
    /// Focus `selector` and press `key`.
    async fn press_key(&mut self, selector: &str, key: &str) -> Result<()>;
    async fn scroll_to(&mut self, selector: &str, offset: i64) -> Result<()>;
    async fn scroll_by(&mut self, x: i64, y: i64) -> Result<()>;
    async fn execute_script(&mut self, js: &str) -> Result<Value>;

    /// Poll until `condition` holds, failing with [`Error::Timeout`].
    async fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()>;

    async fn screenshot(&mut self, path: &Path) -> Result<()>;
    async fn console_log(&mut self) -> Result<Vec<String>>;
    async fn js_errors(&mut self) -> Result<Vec<String>>;

    async fn window_count(&mut self) -> Result<usize>;
    async fn switch_to_window(&mut self, index: usize) -> Result<()>;
    async fn new_window(&mut self, url: Option<&str>) -> Result<()>;
    async fn close_window(&mut self) -> Result<()>;

    /// Text of the pending dialog, if any.
    async fn alert_text(&mut self) -> Result<Option<String>>;
    async fn accept_alert(&mut self) -> Result<()>;
    async fn dismiss_alert(&mut self) -> Result<()>;

    async fn show_cursor(&mut self) -> Result<()>;
    async fn show_keys(&mut self) -> Result<()>;
}

/// Poll `check` every `interval` until it returns `true` or `timeout`
/// elapses. Errors from `check` count as "not yet".
pub async fn wait_until<F, Fut>(
    timeout: Duration,
    interval: Duration,
    what: &str,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    // `None` when the timeout is too large to represent: wait indefinitely.
    let deadline = Instant::now().checked_add(timeout);
    let mut last_error = None;
    loop {
        match check().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => {
                debug!("wait_until {}: {}", what, e);
                last_error = Some(e);
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::Timeout(match last_error {
                Some(e) => format!("waited {:?} for {} (last error: {})", timeout, what, e),
                None => format!("waited {:?} for {}", timeout, what),
            }));
        }
        tokio::time::sleep(interval).await;
    }
}
