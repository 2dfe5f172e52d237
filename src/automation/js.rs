//! JavaScript injected into pages.

use serde_json::Value;

/// Captures dialogs, console output and uncaught errors into page globals.
/// Dialogs never block; `confirm` answers true.
pub const CAPTURE_JS: &str = r#"(() => {
    if (window.__wr_installed) return;
    window.__wr_installed = true;
    window.__wr_alerts = [];
    window.__wr_console = [];
    window.__wr_errors = [];
    window.alert = (m) => { window.__wr_alerts.push(String(m ?? '')); };
    window.confirm = (m) => { window.__wr_alerts.push(String(m ?? '')); return true; };
    window.prompt = (m, d) => { window.__wr_alerts.push(String(m ?? '')); return d ?? ''; };
    for (const level of ['log', 'info', 'warn', 'error', 'debug']) {
        const orig = console[level].bind(console);
        console[level] = (...args) => {
            window.__wr_console.push(level.toUpperCase() + ': ' + args.map(String).join(' '));
            orig(...args);
        };
    }
    window.addEventListener('error', (e) => window.__wr_errors.push(String(e.message)));
    window.addEventListener('unhandledrejection', (e) => window.__wr_errors.push(String(e.reason)));
})()"#;

/// Element lookup helpers shared by every element query. Selectors starting
/// with `/` or `(` are XPath.
const PRELUDE_JS: &str = r#"
    const __wrFind = (sel) => {
        if (sel.startsWith('/') || sel.startsWith('(')) {
            const r = document.evaluate(sel, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            const out = [];
            for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i));
            return out;
        }
        return Array.from(document.querySelectorAll(sel));
    };
    const __wrVisible = (el) => {
        const s = getComputedStyle(el);
        return s.display !== 'none' && s.visibility !== 'hidden'
            && (el.offsetWidth > 0 || el.offsetHeight > 0 || el.getClientRects().length > 0);
    };
    const __wrSet = (el, v) => {
        const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
        const setter = Object.getOwnPropertyDescriptor(proto, 'value')?.set;
        if (setter && (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement)) setter.call(el, v);
        else el.value = v;
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
    };
"#;

/// A JSON string literal for embedding in JS.
pub fn js_str(s: &str) -> String {
    Value::from(s).to_string()
}

/// Wrap `body` so it runs with `els` bound to every match of `selector`.
pub fn with_elements(selector: &str, body: &str) -> String {
    format!(
        "(() => {{ {PRELUDE_JS} const els = __wrFind({}); {body} }})()",
        js_str(selector)
    )
}

/// Evaluate `expr` against the first match as `el`. The result is
/// `{found, value}` so a missing element is distinguishable from `null`.
pub fn first_element(selector: &str, expr: &str) -> String {
    with_elements(
        selector,
        &format!(
            "const el = els[0]; if (!el) return {{ found: false }}; return {{ found: true, value: ({expr}) }};"
        ),
    )
}

/// Predicate body for a wait condition over `els`.
pub const VISIBLE_FIRST: &str = "return els.length > 0 && __wrVisible(els[0]);";
pub const NONE_VISIBLE: &str = "return !els.some(__wrVisible);";
pub const CLICKABLE_FIRST: &str =
    "return els.length > 0 && __wrVisible(els[0]) && !els[0].disabled;";

/// Mouse follower shown in demo mode.
pub const CURSOR_JS: &str = r#"(() => {
    if (document.getElementById('__wr-cursor')) return;
    const dot = document.createElement('div');
    dot.id = '__wr-cursor';
    dot.setAttribute('style', 'position: absolute; z-index: 2147483647; pointer-events: none;'
        + 'width: 18px; height: 18px; margin: -9px 0 0 -9px; border-radius: 50%;'
        + 'background: rgba(255, 64, 64, 0.6); border: 2px solid #fff;'
        + 'transition: left 0.2s ease-out, top 0.2s ease-out; left: 0; top: 0;');
    document.body.appendChild(dot);
    document.addEventListener('mousemove', (e) => {
        dot.style.left = e.pageX + 'px';
        dot.style.top = e.pageY + 'px';
    }, true);
})()"#;

/// Keystroke display shown in demo mode.
pub const KEYS_JS: &str = r#"(() => {
    if (document.getElementById('__wr-keys')) return;
    const box = document.createElement('div');
    box.id = '__wr-keys';
    box.setAttribute('style', 'position: fixed; z-index: 2147483647; pointer-events: none;'
        + 'top: 50%; left: 50%; transform: translate(-50%, -50%);'
        + 'min-width: 125px; min-height: 125px; border: 1px solid #000; border-radius: 25px;'
        + 'background: rgba(255, 255, 255, 0.85); font: 110px/125px sans-serif;'
        + 'text-align: center; opacity: 0; transition: opacity 0.4s;');
    document.body.appendChild(box);
    let timer = null;
    document.addEventListener('keydown', (e) => {
        box.textContent = e.key === 'Enter' ? '↵' : (e.key.length === 1 ? e.key : e.key.slice(0, 5));
        box.style.opacity = '1';
        clearTimeout(timer);
        timer = setTimeout(() => { box.style.opacity = '0'; }, 300);
    }, true);
})()"#;
