//! JavaScript snippets evaluated in the watched page
//!
//! All agent state inside the page lives on `window.__tacit`:
//! - `mutations`: structural-change count since the last drain
//! - `observer`: the installed MutationObserver, gone after a reload
//! - `actions`: captured toolbar clicks `{action, subject, sender}`
//! - `clicks`: overlay button presses `{controls, decision}`
//!
//! Selectors and text are embedded as JSON string literals, never spliced raw.

use tacit_core::PageSelectors;

const STATE: &str = "(window.__tacit = window.__tacit || { mutations: 0, actions: [], clicks: [] })";

/// Overlay element id
pub const OVERLAY_ID: &str = "tacit-overlay";

fn literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Scripts parameterized by the configured selectors
#[derive(Debug, Clone)]
pub struct PageScripts {
    selectors: PageSelectors,
}

impl PageScripts {
    pub fn new(selectors: PageSelectors) -> Self {
        Self { selectors }
    }

    /// Evaluates to `true` when the container is mounted
    pub fn container_present(&self) -> String {
        format!(
            "document.querySelector({}) !== null",
            literal(&self.selectors.container)
        )
    }

    /// Reads subject and sender as seen from the detail view
    fn read_detail(&self) -> String {
        format!(
            r#"(() => {{
                const subjectEl = document.querySelector({subject});
                if (!subjectEl) {{ return {{ subject: null, sender: null }}; }}
                const senderEl = document.querySelector({sender});
                return {{
                    subject: subjectEl.innerText,
                    sender: senderEl ? senderEl.getAttribute({attribute}) : null,
                }};
            }})()"#,
            subject = literal(&self.selectors.subject),
            sender = literal(&self.selectors.sender),
            attribute = literal(&self.selectors.sender_attribute),
        )
    }

    /// Installs the mutation counter and the action capture listener
    ///
    /// Evaluates to `false` if the container vanished in the meantime.
    /// Re-running replaces the observer; the click listener is installed once.
    pub fn attach(&self) -> String {
        let actions = self
            .selectors
            .actions
            .iter()
            .map(|(action, selector)| {
                format!("[{}, {}]", literal(action.label()), literal(selector))
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"(() => {{
                const target = document.querySelector({container});
                if (!target) {{ return false; }}
                const state = {state};
                if (state.observer) {{ state.observer.disconnect(); }}
                state.observer = new MutationObserver(() => {{ state.mutations += 1; }});
                state.observer.observe(target, {{ childList: true, subtree: true }});
                if (!state.listening) {{
                    const actions = [{actions}];
                    document.addEventListener('click', (event) => {{
                        if (!(event.target instanceof Element)) {{ return; }}
                        for (const [action, selector] of actions) {{
                            if (!event.target.closest(selector)) {{ continue; }}
                            let found = {read_detail};
                            if (found.subject === null) {{
                                const row = event.target.closest({row});
                                const subjectEl = row && row.querySelector({row_subject});
                                const senderEl = row && row.querySelector('[' + {attribute} + ']');
                                found = {{
                                    subject: subjectEl ? subjectEl.innerText : null,
                                    sender: senderEl ? senderEl.getAttribute({attribute}) : null,
                                }};
                            }}
                            state.actions.push({{ action, subject: found.subject, sender: found.sender }});
                            return;
                        }}
                    }}, true);
                    state.listening = true;
                }}
                return true;
            }})()"#,
            container = literal(&self.selectors.container),
            state = STATE,
            actions = actions,
            read_detail = self.read_detail(),
            row = literal(&self.selectors.list_row),
            row_subject = literal(&self.selectors.list_subject),
            attribute = literal(&self.selectors.sender_attribute),
        )
    }

    /// Evaluates to the number of mutations since the last call, resetting it
    ///
    /// Evaluates to `-1` when no observer is installed, as after a reload.
    pub fn take_mutations(&self) -> String {
        format!(
            "(() => {{ const state = {}; if (!state.observer) {{ return -1; }} const n = state.mutations; state.mutations = 0; return n; }})()",
            STATE
        )
    }

    /// Evaluates to `JSON.stringify({subject, sender})` for the current view
    pub fn inspect(&self) -> String {
        format!("JSON.stringify({})", self.read_detail())
    }

    /// Evaluates to a JSON array of captured actions, draining the queue
    pub fn take_actions(&self) -> String {
        format!(
            "(() => {{ const state = {}; return JSON.stringify(state.actions.splice(0)); }})()",
            STATE
        )
    }
}

/// Creates the overlay if needed and rebuilds its text and both buttons
///
/// The old buttons are removed, not reused; the new ones record presses
/// tagged with `controls`.
pub fn render_overlay(controls: u64, label: &str) -> String {
    format!(
        r#"(() => {{
            const state = {state};
            let bar = document.getElementById({id});
            if (!bar) {{
                bar = document.createElement('div');
                bar.id = {id};
                bar.style.cssText = 'position:fixed;bottom:30px;left:50%;transform:translateX(-50%);display:none;gap:16px;align-items:center;padding:12px 20px;border-radius:12px;background:#1e293b;color:#f1f5f9;font-family:sans-serif;z-index:9999;';
                const title = document.createElement('div');
                title.textContent = 'Suggestion:';
                const suggestion = document.createElement('div');
                suggestion.className = 'tacit-suggestion';
                const buttons = document.createElement('div');
                buttons.className = 'tacit-buttons';
                bar.append(title, suggestion, buttons);
                document.body.appendChild(bar);
            }}
            bar.querySelector('.tacit-suggestion').textContent = {label};
            const buttons = bar.querySelector('.tacit-buttons');
            buttons.replaceChildren();
            for (const [text, decision] of [['Accept', 'accepted'], ['Reject', 'rejected']]) {{
                const button = document.createElement('button');
                button.textContent = text;
                button.addEventListener('click', () => {{
                    state.clicks.push({{ controls: {controls}, decision }});
                }});
                buttons.appendChild(button);
            }}
            return true;
        }})()"#,
        state = STATE,
        id = literal(OVERLAY_ID),
        label = literal(label),
        controls = controls,
    )
}

/// Shows or hides the overlay; a missing overlay is left alone
pub fn set_overlay_visible(visible: bool) -> String {
    format!(
        "(() => {{ const bar = document.getElementById({}); if (bar) {{ bar.style.display = {}; }} return bar !== null; }})()",
        literal(OVERLAY_ID),
        if visible { "'flex'" } else { "'none'" }
    )
}

/// Evaluates to the next overlay press as JSON, or `"null"`
pub fn take_click() -> String {
    format!(
        "(() => {{ const state = {}; return JSON.stringify(state.clicks.shift() || null); }})()",
        STATE
    )
}
