use super::js::{self, js_str};
use super::{wait_until, Automation, SessionConfig, SessionState, SetValueOptions, WaitCondition};
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::{Browser, Page};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An [`Automation`] backed by a Chrome instance driven through eoka.
pub struct BrowserSession {
    config: SessionConfig,
    browser: Option<Browser>,
    pages: Vec<Page>,
    current: usize,
}

#[derive(Deserialize)]
struct Found {
    found: bool,
    #[serde(default)]
    value: Value,
}

fn is_xpath(selector: &str) -> bool {
    selector.starts_with('/') || selector.starts_with('(')
}

fn not_found(selector: &str) -> Error {
    Error::ActionFailed(format!("element '{}' not found", selector))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl BrowserSession {
    /// Launch Chrome and open a blank page.
    pub async fn launch(config: SessionConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        let session = Self {
            config,
            browser: Some(browser),
            pages: vec![page],
            current: 0,
        };
        if session.config.focus {
            session.focus_window().await?;
        }
        Ok(session)
    }

    /// Bring the current window to the front.
    pub async fn focus_window(&self) -> Result<()> {
        let id = self.page()?.target_id().to_string();
        self.browser()?.activate_tab(&id).await?;
        Ok(())
    }

    /// Close the browser.
    pub async fn close(mut self) -> Result<()> {
        self.shutdown().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.pages.clear();
        if let Some(browser) = self.browser.take() {
            browser.close().await?;
        }
        Ok(())
    }

    fn browser(&self) -> Result<&Browser> {
        self.browser.as_ref().ok_or(Error::SessionStopped)
    }

    fn page(&self) -> Result<&Page> {
        if self.browser.is_none() {
            return Err(Error::SessionStopped);
        }
        self.pages
            .get(self.current)
            .ok_or_else(|| Error::ActionFailed("no open window".into()))
    }

    async fn eval<T: DeserializeOwned>(&self, js: &str) -> Result<T> {
        Ok(self.page()?.evaluate(js).await?)
    }

    async fn eval_bool(&self, js: &str) -> Result<bool> {
        self.eval(js).await
    }

    async fn run(&self, js: &str) -> Result<()> {
        self.page()?.execute(js).await?;
        Ok(())
    }

    /// Evaluate `expr` with `el` bound to the first match.
    async fn first(&self, selector: &str, expr: &str) -> Result<Value> {
        let found: Found = self.eval(&js::first_element(selector, expr)).await?;
        if found.found {
            Ok(found.value)
        } else {
            Err(not_found(selector))
        }
    }

    async fn all_strings(&self, selector: &str, expr: &str) -> Result<Vec<String>> {
        let body = format!("return els.map((el) => String({expr} ?? ''));");
        self.eval(&js::with_elements(selector, &body)).await
    }

    async fn install_capture(&self) -> Result<()> {
        self.run(js::CAPTURE_JS).await
    }

    /// Re-install page hooks after a navigation.
    async fn after_navigation(&self) -> Result<()> {
        if let Err(e) = self.install_capture().await {
            warn!("Failed to install page hooks: {}", e);
        }
        if self.config.demo {
            self.run(js::CURSOR_JS).await?;
            self.run(js::KEYS_JS).await?;
        }
        Ok(())
    }

    async fn scroll_if_enabled(&self, selector: &str) -> Result<()> {
        if self.config.scroll_to_element {
            self.scroll_into_view(selector, self.config.default_offset)
                .await?;
        }
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str, offset: i64) -> Result<()> {
        self.first(
            selector,
            &format!(
                "window.scrollTo(0, el.getBoundingClientRect().top + window.scrollY + ({offset}))"
            ),
        )
        .await?;
        self.page()?.wait(200).await;
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<()> {
        self.first(selector, "el.focus()").await?;
        Ok(())
    }

    async fn assign(&self, selector: &str, value: &str, append: bool) -> Result<()> {
        let v = js_str(value);
        let expr = if append {
            format!("__wrSet(el, (el.value ?? '') + {v})")
        } else {
            format!("__wrSet(el, {v})")
        };
        self.first(selector, &expr).await?;
        Ok(())
    }

    async fn pending_alert(&self) -> Result<Option<String>> {
        self.eval("(window.__wr_alerts || [])[0] ?? null").await
    }

    async fn pop_alert(&self) -> Result<()> {
        let popped: Option<String> = self
            .eval("(window.__wr_alerts || []).shift() ?? null")
            .await?;
        match popped {
            Some(text) => {
                debug!("alert closed: '{}'", text);
                Ok(())
            }
            None => Err(Error::ActionFailed("no alert present".into())),
        }
    }

    async fn activate(&mut self, index: usize) -> Result<()> {
        let id = self
            .pages
            .get(index)
            .ok_or_else(|| {
                Error::Argument(format!(
                    "window {} out of range ({} open)",
                    index,
                    self.pages.len()
                ))
            })?
            .target_id()
            .to_string();
        self.browser()?.activate_tab(&id).await?;
        self.current = index;
        Ok(())
    }

    fn predicate(condition: &WaitCondition) -> String {
        match condition {
            WaitCondition::Presence(s) => js::with_elements(s, "return els.length > 0;"),
            WaitCondition::Visible(s) => js::with_elements(s, js::VISIBLE_FIRST),
            WaitCondition::Invisible(s) => js::with_elements(s, js::NONE_VISIBLE),
            WaitCondition::Clickable(s) => js::with_elements(s, js::CLICKABLE_FIRST),
            WaitCondition::NotPresent(s) => js::with_elements(s, "return els.length === 0;"),
            WaitCondition::TextInElement { selector, text } => js::with_elements(
                selector,
                &format!(
                    "return els.length > 0 && (els[0].innerText || els[0].textContent || '').includes({});",
                    js_str(text)
                ),
            ),
            WaitCondition::Value {
                selector,
                value,
                exact,
            } => {
                let test = if *exact {
                    format!(" === {}", js_str(value))
                } else {
                    format!(".includes({})", js_str(value))
                };
                js::with_elements(
                    selector,
                    &format!("return els.length > 0 && String(els[0].value ?? ''){test};"),
                )
            }
            WaitCondition::Opacity { selector, value } => js::with_elements(
                selector,
                &format!(
                    "return els.length > 0 && Math.abs(parseFloat(getComputedStyle(els[0]).opacity) - ({value})) < 0.001;"
                ),
            ),
            WaitCondition::Title(t) => format!("document.title === {}", js_str(t)),
            WaitCondition::UrlContains(u) => {
                format!("window.location.href.includes({})", js_str(u))
            }
            WaitCondition::Alert => "(window.__wr_alerts || []).length > 0".into(),
        }
    }
}

#[async_trait(?Send)]
impl Automation for BrowserSession {
    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn state(&self) -> SessionState {
        if self.browser.is_some() {
            SessionState::Running
        } else {
            SessionState::Stopped
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if self.browser.is_some() {
            info!("Stopping browser session");
        }
        self.shutdown().await
    }

    async fn go(&mut self, url: &str) -> Result<()> {
        info!("Navigating to: {}", url);
        self.page()?.goto(url).await?;
        self.after_navigation().await
    }

    async fn back(&mut self) -> Result<()> {
        self.page()?.back().await?;
        self.after_navigation().await
    }

    async fn forward(&mut self) -> Result<()> {
        self.page()?.forward().await?;
        self.after_navigation().await
    }

    async fn refresh(&mut self) -> Result<()> {
        self.page()?.reload().await?;
        self.after_navigation().await
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.page()?.url().await?)
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self.page()?.title().await?)
    }

    async fn page_text(&mut self) -> Result<String> {
        Ok(self.page()?.text().await?)
    }

    async fn page_source(&mut self) -> Result<String> {
        self.eval("document.documentElement.outerHTML").await
    }

    async fn count(&mut self, selector: &str) -> Result<usize> {
        self.eval(&js::with_elements(selector, "return els.length;"))
            .await
    }

    async fn get_text(&mut self, selector: &str) -> Result<String> {
        let v = self
            .first(selector, "el.innerText ?? el.textContent ?? ''")
            .await?;
        Ok(as_text(&v))
    }

    async fn get_texts(&mut self, selector: &str) -> Result<Vec<String>> {
        self.all_strings(selector, "(el.innerText ?? el.textContent)")
            .await
    }

    async fn get_value(&mut self, selector: &str) -> Result<String> {
        let v = self.first(selector, "el.value ?? ''").await?;
        Ok(as_text(&v))
    }

    async fn get_values(&mut self, selector: &str) -> Result<Vec<String>> {
        self.all_strings(selector, "el.value").await
    }

    async fn get_attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>> {
        let v = self
            .first(selector, &format!("el.getAttribute({})", js_str(name)))
            .await?;
        Ok(match v {
            Value::Null => None,
            other => Some(as_text(&other)),
        })
    }

    async fn is_displayed(&mut self, selector: &str) -> Result<bool> {
        self.eval_bool(&js::with_elements(selector, js::VISIBLE_FIRST))
            .await
    }

    async fn is_selected(&mut self, selector: &str) -> Result<bool> {
        let v = self.first(selector, "!!(el.checked || el.selected)").await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        debug!("click: {}", selector);
        self.scroll_if_enabled(selector).await?;
        if is_xpath(selector) {
            self.first(selector, "el.click()").await?;
        } else if self.config.demo {
            self.page()?.human_click(selector).await?;
        } else {
            self.page()?.click(selector).await?;
        }
        Ok(())
    }

    async fn click_all(&mut self, selector: &str) -> Result<usize> {
        debug!("click_all: {}", selector);
        self.eval(&js::with_elements(
            selector,
            "els.forEach((el) => el.click()); return els.length;",
        ))
        .await
    }

    async fn set_value(
        &mut self,
        selector: &str,
        value: &str,
        opts: SetValueOptions,
    ) -> Result<()> {
        debug!("set_value: {} = '{}' ({:?})", selector, value, opts);
        self.scroll_if_enabled(selector).await?;
        if opts.typing || self.config.demo {
            if opts.clear {
                self.assign(selector, "", false).await?;
            }
            self.focus(selector).await?;
            self.page()?.type_text(value).await?;
        } else if opts.clear && !is_xpath(selector) {
            self.page()?.fill(selector, value).await?;
        } else {
            self.assign(selector, value, !opts.clear).await?;
        }
        if opts.blur {
            self.first(selector, "el.blur()").await?;
        }
        Ok(())
    }

    async fn set_value_at(&mut self, selector: &str, index: usize, value: &str) -> Result<()> {
        let body = format!(
            "const el = els[{index}]; if (!el) return false; el.focus(); __wrSet(el, {}); return true;",
            js_str(value)
        );
        if self.eval_bool(&js::with_elements(selector, &body)).await? {
            Ok(())
        } else {
            Err(Error::ActionFailed(format!(
                "no element {} for '{}'",
                index, selector
            )))
        }
    }

    async fn clear(&mut self, selector: &str) -> Result<()> {
        self.assign(selector, "", false).await
    }

    async fn select_option(&mut self, selector: &str, text: &str) -> Result<()> {
        let v = self
            .first(
                selector,
                &format!(
                    r#"(() => {{
                        const opt = Array.from(el.options || []).find(o => o.text.trim() === {t} || o.value === {t});
                        if (!opt) return 'option_not_found';
                        el.value = opt.value;
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return 'ok';
                    }})()"#,
                    t = js_str(text)
                ),
            )
            .await?;
        match v.as_str() {
            Some("ok") => Ok(()),
            Some("option_not_found") => Err(Error::ActionFailed(format!(
                "option '{}' not found in '{}'",
                text, selector
            ))),
            _ => Err(Error::ActionFailed(format!("select failed: {}", v))),
        }
    }

    async fn move_to(&mut self, selector: &str) -> Result<()> {
        self.scroll_if_enabled(selector).await?;
        let c = self
            .first(
                selector,
                "(() => { const r = el.getBoundingClientRect(); return { x: r.x + r.width / 2, y: r.y + r.height / 2 }; })()",
            )
            .await?;
        let x = c["x"].as_f64().unwrap_or(0.0);
        let y = c["y"].as_f64().unwrap_or(0.0);
        let page = self.page()?;
        page.session()
            .dispatch_mouse_event(eoka::cdp::MouseEventType::MouseMoved, x, y, None, None)
            .await?;
        page.wait(100).await;
        Ok(())
    }

    async fn press_key(&mut self, selector: &str, key: &str) -> Result<()> {
        debug!("press_key: {} on {}", key, selector);
        self.focus(selector).await?;
        self.page()?.human().press_key(key).await?;
        Ok(())
    }

    async fn scroll_to(&mut self, selector: &str, offset: i64) -> Result<()> {
        self.scroll_into_view(selector, offset).await
    }

    async fn scroll_by(&mut self, x: i64, y: i64) -> Result<()> {
        self.run(&format!("window.scrollBy({x}, {y})")).await
    }

    async fn execute_script(&mut self, script: &str) -> Result<Value> {
        let v: Option<Value> = self.eval(script).await?;
        Ok(v.unwrap_or(Value::Null))
    }

    async fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()> {
        debug!("wait_for: {} ({:?})", condition, timeout);
        let js = Self::predicate(condition);
        let js = js.as_str();
        let this = &*self;
        wait_until(
            timeout,
            self.config.poll_interval(),
            &condition.to_string(),
            move || this.eval_bool(js),
        )
        .await
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        info!("screenshot: {}", path.display());
        let data = self.page()?.screenshot().await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    async fn console_log(&mut self) -> Result<Vec<String>> {
        self.eval("window.__wr_console || []").await
    }

    async fn js_errors(&mut self) -> Result<Vec<String>> {
        self.eval("window.__wr_errors || []").await
    }

    async fn window_count(&mut self) -> Result<usize> {
        self.browser()?;
        Ok(self.pages.len())
    }

    async fn switch_to_window(&mut self, index: usize) -> Result<()> {
        debug!("switch_to_window: {}", index);
        self.activate(index).await
    }

    async fn new_window(&mut self, url: Option<&str>) -> Result<()> {
        let browser = self.browser()?;
        let page = match url {
            Some(u) => browser.new_page(u).await?,
            None => browser.new_blank_page().await?,
        };
        self.pages.push(page);
        self.activate(self.pages.len() - 1).await?;
        if url.is_some() {
            self.after_navigation().await?;
        }
        Ok(())
    }

    async fn close_window(&mut self) -> Result<()> {
        if self.pages.len() <= 1 {
            return Err(Error::ActionFailed("cannot close the last window".into()));
        }
        let id = self.page()?.target_id().to_string();
        self.browser()?.close_tab(&id).await?;
        self.pages.remove(self.current);
        let next = self.current.min(self.pages.len() - 1);
        self.activate(next).await
    }

    async fn alert_text(&mut self) -> Result<Option<String>> {
        self.pending_alert().await
    }

    async fn accept_alert(&mut self) -> Result<()> {
        self.pop_alert().await
    }

    async fn dismiss_alert(&mut self) -> Result<()> {
        self.pop_alert().await
    }

    async fn show_cursor(&mut self) -> Result<()> {
        self.run(js::CURSOR_JS).await
    }

    async fn show_keys(&mut self) -> Result<()> {
        self.run(js::KEYS_JS).await
    }
}
