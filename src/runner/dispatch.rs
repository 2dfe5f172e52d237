//! Script operation names mapped onto the [`Automation`] surface.

use super::normalize::{scalar_text, Args};
use crate::automation::{Automation, SessionState, SetValueOptions, WaitCondition};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Screenshot path used when none is given.
pub const DEFAULT_SCREENSHOT_PATH: &str = "/tmp/webrunner-screenshot.png";

/// What to do with a command name that is not an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCommand {
    /// Skip silently.
    Ignore,
    /// Log a warning and skip.
    #[default]
    Warn,
    /// Fail the command.
    Error,
}

macro_rules! operations {
    ($($variant:ident => $name:literal,)*) => {
        /// An operation a script can name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant,)*
        }

        /// Every operation name, in declaration order.
        pub const OPERATION_NAMES: &[&str] = &[$($name,)*];

        impl Operation {
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

operations! {
    // Navigation
    Go => "go",
    Goto => "goto",
    Back => "back",
    Forward => "forward",
    RefreshPage => "refresh_page",

    // Interaction
    Click => "click",
    ClickAll => "click_all",
    SetValue => "set_value",
    SetValues => "set_values",
    Fill => "fill",
    Clear => "clear",
    SetSelectByText => "set_select_by_text",
    SetSelectize => "set_selectize",
    FillOtp => "fill_otp",
    MoveTo => "move_to",
    Hover => "hover",
    SendKey => "send_key",
    ScrollToElement => "scroll_to_element",
    ScrollBrowser => "scroll_browser",
    Js => "js",

    // Waiting
    Wait => "wait",
    WaitForPresence => "wait_for_presence",
    WaitForVisible => "wait_for_visible",
    WaitForInvisible => "wait_for_invisible",
    WaitForClickable => "wait_for_clickable",
    WaitForText => "wait_for_text",
    WaitForTextInValue => "wait_for_text_in_value",
    WaitForValue => "wait_for_value",
    WaitForTitle => "wait_for_title",
    WaitForUrl => "wait_for_url",
    WaitForOpacity => "wait_for_opacity",
    WaitForAlert => "wait_for_alert",
    WaitForKo => "wait_for_ko",

    // Page state
    Screenshot => "screenshot",
    ShowCursor => "show_cursor",
    ShowKeys => "show_keys",
    GetLog => "get_log",
    Log => "log",

    // Windows and dialogs
    SwitchToWindow => "switch_to_window",
    NewWindow => "new_window",
    CloseWindow => "close_window",
    AcceptAlert => "accept_alert",
    DismissAlert => "dismiss_alert",
    CloseAlert => "close_alert",

    // Assertions
    AssertExists => "assert_exists",
    AssertFound => "assert_found",
    AssertNotFound => "assert_not_found",
    AssertUrl => "assert_url",
    AssertTitle => "assert_title",
    AssertTextInPage => "assert_text_in_page",
    AssertTextNotInPage => "assert_text_not_in_page",
    AssertVisible => "assert_visible",
    AssertNotVisible => "assert_not_visible",
    AssertValueOfElement => "assert_value_of_element",
    AssertValueOfElements => "assert_value_of_elements",
    AssertTextInElement => "assert_text_in_element",
    AssertTextInElements => "assert_text_in_elements",
    AssertElementContainsText => "assert_element_contains_text",
    AssertElementHasClass => "assert_element_has_class",
    AssertElementNotHasClass => "assert_element_not_has_class",
    AssertChecked => "assert_checked",
    AssertNotChecked => "assert_not_checked",
    AssertElementCount => "assert_element_count",
    AssertAlertPresent => "assert_alert_present",
    AssertAlertNotPresent => "assert_alert_not_present",
    AssertTextInLog => "assert_text_in_log",
    AssertTextNotInLog => "assert_text_not_in_log",
    AssertJsErrors => "assert_js_errors",
    AssertJsErrorsCount => "assert_js_errors_count",
}

impl Operation {
    /// Whether the operation touches the browser.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Self::Wait | Self::Log)
    }
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::AssertionFailed(msg()))
    }
}

/// Selenium-style key names (`ENTER`, `ARROW_DOWN`) to DOM key names.
fn key_name(key: &str) -> String {
    let named = match key.to_ascii_uppercase().as_str() {
        "ENTER" | "RETURN" => "Enter",
        "TAB" => "Tab",
        "ESCAPE" | "ESC" => "Escape",
        "SPACE" => " ",
        "BACKSPACE" | "BACK_SPACE" => "Backspace",
        "DELETE" => "Delete",
        "UP" | "ARROW_UP" => "ArrowUp",
        "DOWN" | "ARROW_DOWN" => "ArrowDown",
        "LEFT" | "ARROW_LEFT" => "ArrowLeft",
        "RIGHT" | "ARROW_RIGHT" => "ArrowRight",
        "HOME" => "Home",
        "END" => "End",
        "PAGE_UP" => "PageUp",
        "PAGE_DOWN" => "PageDown",
        _ => return key.to_string(),
    };
    named.to_string()
}

/// `(selector, value)` pairs from a mapping, a list of rows, or a mix of
/// rows and single-entry mappings.
fn value_rows(args: &Args) -> Result<Vec<(String, String)>> {
    let rows: Vec<&Value> = match args.values() {
        [Value::Array(rows)] => rows.iter().collect(),
        values => values.iter().collect(),
    };
    let bad_row = |row: &Value| {
        Error::Argument(format!(
            "{}: expected [selector, value] or {{selector: value}}, got {}",
            args.op(),
            row
        ))
    };

    let mut pairs = Vec::new();
    for row in rows {
        match row {
            Value::Object(map) => {
                for (selector, value) in map {
                    let value = scalar_text(value).ok_or_else(|| bad_row(row))?;
                    pairs.push((selector.clone(), value));
                }
            }
            Value::Array(pair) => match pair.as_slice() {
                [selector, value] => {
                    let selector = scalar_text(selector).ok_or_else(|| bad_row(row))?;
                    let value = scalar_text(value).ok_or_else(|| bad_row(row))?;
                    pairs.push((selector, value));
                }
                _ => return Err(bad_row(row)),
            },
            other => return Err(bad_row(other)),
        }
    }
    Ok(pairs)
}

fn screenshot_path(template: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    PathBuf::from(template.replace("{timestamp}", &stamp))
}

/// Wait for `selector` to be present (or visible, when `wait_for` says so).
async fn settle<A: Automation + ?Sized>(
    session: &mut A,
    selector: &str,
    wait_for: Option<&str>,
    timeout: Duration,
) -> Result<()> {
    let condition = match wait_for {
        Some("visible") => WaitCondition::Visible(selector.to_string()),
        None | Some("presence") => WaitCondition::Presence(selector.to_string()),
        Some(other) => {
            return Err(Error::Argument(format!(
                "wait_for must be 'presence' or 'visible', got '{}'",
                other
            )))
        }
    };
    session.wait_for(&condition, timeout).await
}

const SELECTIZE_JS: &str = r#"(() => {
    const el = document.querySelector(SELECTOR);
    const s = el && el.selectize;
    if (!s) return 'no_selectize';
    const text = TEXT;
    const label = s.settings.labelField;
    const key = Object.keys(s.options).find((k) => String(s.options[k][label]) === text);
    if (key !== undefined) { s.setValue(key); return 'ok'; }
    if (s.settings.create) { s.createItem(text); return 'ok'; }
    return 'option_not_found';
})()"#;

/// Run one operation.
pub async fn execute<A: Automation + ?Sized>(
    session: &mut A,
    op: Operation,
    args: &Args,
) -> Result<()> {
    if op.needs_session() && session.state() == SessionState::Stopped {
        return Err(Error::SessionStopped);
    }
    let timeout = session.config().timeout();
    debug!("dispatch: {} {:?}", op.name(), args.values());

    match op {
        Operation::Go => {
            let url = args.string(0, "url")?;
            session.go(&url).await?;
        }
        Operation::Goto => {
            let url = session.config().resolve_url(&args.string(0, "url")?);
            session.go(&url).await?;
            if let Some(sel) = args.opt_string(1, "wait_for_visible")? {
                session
                    .wait_for(&WaitCondition::Visible(sel), timeout)
                    .await?;
            }
            if let Some(sel) = args.opt_string(2, "wait_for_presence")? {
                session
                    .wait_for(&WaitCondition::Presence(sel), timeout)
                    .await?;
            }
        }
        Operation::Back => session.back().await?,
        Operation::Forward => session.forward().await?,
        Operation::RefreshPage => session.refresh().await?,

        Operation::Click => {
            let selector = args.string(0, "selector")?;
            settle(session, &selector, None, timeout).await?;
            session.click(&selector).await?;
        }
        Operation::ClickAll => {
            let selector = args.string(0, "selector")?;
            let n = session.click_all(&selector).await?;
            debug!("click_all: clicked {} elements", n);
        }
        Operation::SetValue => {
            let selector = args.string(0, "selector")?;
            let value = args.string(1, "value")?;
            let defaults = SetValueOptions::default();
            let opts = SetValueOptions {
                clear: args.bool_or(2, "clear", defaults.clear)?,
                blur: args.bool_or(3, "blur", defaults.blur)?,
                typing: args.bool_or(4, "typing", defaults.typing)?,
            };
            settle(session, &selector, None, timeout).await?;
            session.set_value(&selector, &value, opts).await?;
        }
        Operation::SetValues | Operation::Fill => {
            let opts = SetValueOptions {
                clear: op == Operation::SetValues,
                ..SetValueOptions::default()
            };
            for (selector, value) in value_rows(args)? {
                settle(session, &selector, None, timeout).await?;
                session.set_value(&selector, &value, opts).await?;
            }
        }
        Operation::Clear => {
            let selector = args.string(0, "selector")?;
            settle(session, &selector, None, timeout).await?;
            session.clear(&selector).await?;
        }
        Operation::SetSelectByText => {
            let selector = args.string(0, "selector")?;
            let text = args.string(1, "text")?;
            settle(session, &selector, None, timeout).await?;
            session.select_option(&selector, &text).await?;
        }
        Operation::SetSelectize => {
            let selector = args.string(0, "selector")?;
            let text = args.string(1, "text")?;
            settle(session, &selector, None, timeout).await?;
            let js = SELECTIZE_JS
                .replace("SELECTOR", &Value::from(selector.as_str()).to_string())
                .replace("TEXT", &Value::from(text.as_str()).to_string());
            match session.execute_script(&js).await?.as_str() {
                Some("ok") => {}
                Some("option_not_found") => {
                    return Err(Error::ActionFailed(format!(
                        "option '{}' not found in '{}'",
                        text, selector
                    )))
                }
                _ => {
                    return Err(Error::ActionFailed(format!(
                        "'{}' is not a selectize control",
                        selector
                    )))
                }
            }
        }
        Operation::FillOtp => {
            let selector = args.string(0, "selector")?;
            let code = args.string(1, "code")?;
            settle(session, &selector, None, timeout).await?;
            let inputs = session.count(&selector).await?;
            let chars: Vec<char> = code.chars().collect();
            if inputs < chars.len() {
                return Err(Error::Argument(format!(
                    "fill_otp: {} characters but only {} inputs match '{}'",
                    chars.len(),
                    inputs,
                    selector
                )));
            }
            for (i, c) in chars.iter().enumerate() {
                session.set_value_at(&selector, i, &c.to_string()).await?;
            }
        }
        Operation::MoveTo | Operation::Hover => {
            let selector = args.string(0, "selector")?;
            settle(session, &selector, None, timeout).await?;
            session.move_to(&selector).await?;
        }
        Operation::SendKey => {
            let selector = args.string(0, "selector")?;
            let key = args.string(1, "key")?;
            settle(session, &selector, None, timeout).await?;
            session.press_key(&selector, &key_name(&key)).await?;
        }
        Operation::ScrollToElement => {
            let selector = args.string(0, "selector")?;
            let offset = match args.opt_i64(1, "offset")? {
                Some(o) => o,
                None => session.config().default_offset,
            };
            settle(session, &selector, None, timeout).await?;
            session.scroll_to(&selector, offset).await?;
        }
        Operation::ScrollBrowser => {
            let amount = args.i64(0, "amount")?;
            let direction = args
                .opt_string(1, "direction")?
                .unwrap_or_else(|| "down".into());
            let negated = || {
                amount.checked_neg().ok_or_else(|| {
                    Error::Argument(format!("scroll_browser: amount {} out of range", amount))
                })
            };
            let (x, y) = match direction.as_str() {
                "down" => (0, amount),
                "up" => (0, negated()?),
                "right" => (amount, 0),
                "left" => (negated()?, 0),
                other => {
                    return Err(Error::Argument(format!(
                        "scroll_browser: unknown direction '{}'",
                        other
                    )))
                }
            };
            session.scroll_by(x, y).await?;
        }
        Operation::Js => {
            let script = args.string(0, "script")?;
            let result = session.execute_script(&script).await?;
            debug!("js: -> {}", result);
        }

        Operation::Wait => {
            let secs = args.f64(0, "seconds")?;
            let pause = Duration::try_from_secs_f64(secs)
                .map_err(|_| Error::Argument(format!("wait: invalid duration {}", secs)))?;
            debug!("wait: {}s", secs);
            tokio::time::sleep(pause).await;
        }
        Operation::WaitForPresence
        | Operation::WaitForVisible
        | Operation::WaitForInvisible
        | Operation::WaitForClickable
        | Operation::WaitForKo => {
            let selector = args.string(0, "selector")?;
            let condition = match op {
                Operation::WaitForPresence => WaitCondition::Presence(selector),
                Operation::WaitForVisible => WaitCondition::Visible(selector),
                Operation::WaitForInvisible => WaitCondition::Invisible(selector),
                Operation::WaitForClickable => WaitCondition::Clickable(selector),
                _ => WaitCondition::NotPresent(selector),
            };
            session
                .wait_for(&condition, args.timeout(1, timeout)?)
                .await?;
        }
        Operation::WaitForText => {
            let condition = WaitCondition::TextInElement {
                selector: args.string(0, "selector")?,
                text: args.string(1, "text")?,
            };
            session
                .wait_for(&condition, args.timeout(2, timeout)?)
                .await?;
        }
        Operation::WaitForTextInValue | Operation::WaitForValue => {
            let condition = WaitCondition::Value {
                selector: args.string(0, "selector")?,
                value: args.string(1, "value")?,
                exact: op == Operation::WaitForValue,
            };
            session
                .wait_for(&condition, args.timeout(2, timeout)?)
                .await?;
        }
        Operation::WaitForTitle => {
            let condition = WaitCondition::Title(args.string(0, "title")?);
            session
                .wait_for(&condition, args.timeout(1, timeout)?)
                .await?;
        }
        Operation::WaitForUrl => {
            let condition = WaitCondition::UrlContains(args.string(0, "url")?);
            session
                .wait_for(&condition, args.timeout(1, timeout)?)
                .await?;
        }
        Operation::WaitForOpacity => {
            let condition = WaitCondition::Opacity {
                selector: args.string(0, "selector")?,
                value: args.f64(1, "value")?,
            };
            session
                .wait_for(&condition, args.timeout(2, timeout)?)
                .await?;
        }
        Operation::WaitForAlert => {
            session
                .wait_for(&WaitCondition::Alert, args.timeout(0, timeout)?)
                .await?;
        }

        Operation::Screenshot => {
            let template = args
                .opt_string(0, "path")?
                .unwrap_or_else(|| DEFAULT_SCREENSHOT_PATH.into());
            session.screenshot(&screenshot_path(&template)).await?;
        }
        Operation::ShowCursor => session.show_cursor().await?,
        Operation::ShowKeys => session.show_keys().await?,
        Operation::GetLog => {
            for line in session.console_log().await? {
                info!("[console] {}", line);
            }
        }
        Operation::Log => {
            let message = args
                .values()
                .iter()
                .map(|v| scalar_text(v).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(" ");
            info!("[log] {}", message);
        }

        Operation::SwitchToWindow => {
            let index = args.usize(0, "index")?;
            session.switch_to_window(index).await?;
        }
        Operation::NewWindow => {
            let url = args.opt_string(0, "url")?;
            let url = url.map(|u| session.config().resolve_url(&u));
            session.new_window(url.as_deref()).await?;
        }
        Operation::CloseWindow => session.close_window().await?,
        Operation::AcceptAlert => session.accept_alert().await?,
        Operation::DismissAlert => session.dismiss_alert().await?,
        Operation::CloseAlert => {
            if session.alert_text().await?.is_some() {
                session.dismiss_alert().await?;
            }
        }

        Operation::AssertExists | Operation::AssertFound => {
            let selector = args.string(0, "selector")?;
            let n = session.count(&selector).await?;
            check(n > 0, || {
                format!("an element could not be found for the selector: {}", selector)
            })?;
        }
        Operation::AssertNotFound => {
            let selector = args.string(0, "selector")?;
            let n = session.count(&selector).await?;
            check(n == 0, || {
                format!("{} was unexpectedly found on the page", selector)
            })?;
        }
        Operation::AssertUrl => {
            let expected = args.string(0, "url")?;
            let url = session.current_url().await?;
            check(url == expected, || {
                format!("the url was {} instead of {}", url, expected)
            })?;
        }
        Operation::AssertTitle => {
            let expected = args.string(0, "title")?;
            let title = session.title().await?;
            check(title == expected, || {
                format!("the title was '{}' instead of '{}'", title, expected)
            })?;
        }
        Operation::AssertTextInPage | Operation::AssertTextNotInPage => {
            let text = args.string(0, "text")?;
            let present = session.page_source().await?.contains(&text);
            if op == Operation::AssertTextInPage {
                check(present, || format!("'{}' was not present in the page", text))?;
            } else {
                check(!present, || format!("'{}' was present in the page", text))?;
            }
        }
        Operation::AssertVisible | Operation::AssertNotVisible => {
            let selector = args.string(0, "selector")?;
            settle(session, &selector, None, args.timeout(1, timeout)?).await?;
            let shown = session.is_displayed(&selector).await?;
            if op == Operation::AssertVisible {
                check(shown, || format!("'{}' was not visible", selector))?;
            } else {
                check(!shown, || format!("'{}' was visible", selector))?;
            }
        }
        Operation::AssertValueOfElement => {
            let selector = args.string(0, "selector")?;
            let expected = args.string(1, "value")?;
            let wait_for = args.opt_string(2, "wait_for")?;
            settle(session, &selector, wait_for.as_deref(), timeout).await?;
            let value = session.get_value(&selector).await?;
            check(value == expected, || {
                format!(
                    "the value '{}' was not found in '{}'; found '{}'",
                    expected, selector, value
                )
            })?;
        }
        Operation::AssertValueOfElements => {
            let selector = args.string(0, "selector")?;
            let expected = args.string(1, "value")?;
            let wait_for = args.opt_string(2, "wait_for")?;
            settle(session, &selector, wait_for.as_deref(), timeout).await?;
            let values = session.get_values(&selector).await?;
            check(values.contains(&expected), || {
                format!("the value '{}' was not found in '{}'", expected, selector)
            })?;
        }
        Operation::AssertTextInElement | Operation::AssertElementContainsText => {
            let selector = args.string(0, "selector")?;
            let expected = args.string(1, "text")?;
            let wait_for = args.opt_string(2, "wait_for")?;
            settle(session, &selector, wait_for.as_deref(), timeout).await?;
            let text = session.get_text(&selector).await?;
            check(text.contains(&expected), || {
                format!("'{}' not found in '{}'", expected, text)
            })?;
        }
        Operation::AssertTextInElements => {
            let selector = args.string(0, "selector")?;
            let expected = args.string(1, "text")?;
            let wait_for = args.opt_string(2, "wait_for")?;
            settle(session, &selector, wait_for.as_deref(), timeout).await?;
            let texts = session.get_texts(&selector).await?;
            check(texts.iter().any(|t| t == &expected), || {
                format!("the text '{}' was not found in '{}'", expected, selector)
            })?;
        }
        Operation::AssertElementHasClass | Operation::AssertElementNotHasClass => {
            let selector = args.string(0, "selector")?;
            let class = args.string(1, "class")?;
            let wait_for = args.opt_string(2, "wait_for")?;
            settle(session, &selector, wait_for.as_deref(), timeout).await?;
            let classes = session
                .get_attribute(&selector, "class")
                .await?
                .unwrap_or_default();
            let has = classes.contains(&class);
            if op == Operation::AssertElementHasClass {
                check(has, || format!("'{}' does not have class '{}'", selector, class))?;
            } else {
                check(!has, || format!("'{}' has class '{}'", selector, class))?;
            }
        }
        Operation::AssertChecked | Operation::AssertNotChecked => {
            let selector = args.string(0, "selector")?;
            let checked = session.is_selected(&selector).await?;
            if op == Operation::AssertChecked {
                check(checked, || format!("'{}' was not checked", selector))?;
            } else {
                check(!checked, || format!("'{}' was checked", selector))?;
            }
        }
        Operation::AssertElementCount => {
            let selector = args.string(0, "selector")?;
            let expected = args.usize(1, "count")?;
            let n = session.count(&selector).await?;
            check(n == expected, || {
                format!(
                    "expected {} elements from selector '{}', found {}",
                    expected, selector, n
                )
            })?;
        }
        Operation::AssertAlertPresent => {
            let present = session.alert_text().await?.is_some();
            check(present, || "an alert was expected but none was present".into())?;
        }
        Operation::AssertAlertNotPresent => {
            let alert = session.alert_text().await?;
            check(alert.is_none(), || {
                format!("an alert was present: '{}'", alert.clone().unwrap_or_default())
            })?;
        }
        Operation::AssertTextInLog | Operation::AssertTextNotInLog => {
            let text = args.string(0, "text")?;
            let log = session.console_log().await?.join("\n");
            let present = log.contains(&text);
            if op == Operation::AssertTextInLog {
                check(present, || format!("'{}' not found in the console log", text))?;
            } else {
                check(!present, || format!("'{}' found in the console log", text))?;
            }
        }
        Operation::AssertJsErrors => {
            let present = args.bool_or(0, "present", true)?;
            let errors = session.js_errors().await?;
            if present {
                check(!errors.is_empty(), || {
                    "expected JavaScript errors but there were none".into()
                })?;
            } else {
                check(errors.is_empty(), || {
                    format!("unexpected JavaScript errors: {:?}", errors)
                })?;
            }
        }
        Operation::AssertJsErrorsCount => {
            let expected = match args.param(0, "count") {
                None => 0,
                Some(_) => args.usize(0, "count")?,
            };
            let errors = session.js_errors().await?;
            check(errors.len() == expected, || {
                format!(
                    "expected {} JavaScript errors, found {}: {:?}",
                    expected,
                    errors.len(),
                    errors
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_round_trip() {
        for name in OPERATION_NAMES {
            let op = Operation::from_name(name).unwrap();
            assert_eq!(op.name(), *name);
        }
        assert_eq!(Operation::from_name("nope"), None);
        assert_eq!(Operation::from_name("include"), None);
    }

    #[test]
    fn test_needs_session() {
        assert!(Operation::Click.needs_session());
        assert!(Operation::AssertUrl.needs_session());
        assert!(!Operation::Wait.needs_session());
        assert!(!Operation::Log.needs_session());
    }

    #[test]
    fn test_value_rows_shapes() {
        let mapping = Args::new("set_values", vec![json!({"#a": "1", "#b": 2})]);
        assert_eq!(
            value_rows(&mapping).unwrap(),
            vec![("#a".into(), "1".into()), ("#b".into(), "2".into())]
        );

        let rows = Args::new("set_values", vec![json!([["#a", "1"], ["#b", "2"]])]);
        assert_eq!(value_rows(&rows).unwrap().len(), 2);

        let mixed = Args::new("fill", vec![json!({"#a": "1"}), json!(["#b", "2"])]);
        assert_eq!(
            value_rows(&mixed).unwrap(),
            vec![("#a".into(), "1".into()), ("#b".into(), "2".into())]
        );

        let bad = Args::new("fill", vec![json!("#a"), json!("1")]);
        assert!(matches!(value_rows(&bad), Err(Error::Argument(_))));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name("ENTER"), "Enter");
        assert_eq!(key_name("arrow_down"), "ArrowDown");
        assert_eq!(key_name("a"), "a");
    }

    #[test]
    fn test_screenshot_timestamp() {
        let path = screenshot_path("/tmp/shot-{timestamp}.png");
        let s = path.to_string_lossy();
        assert!(s.starts_with("/tmp/shot-"));
        assert!(!s.contains("{timestamp}"));
        assert_eq!(screenshot_path("a.png"), PathBuf::from("a.png"));
    }
}
