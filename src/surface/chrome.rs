//! chromiumoxide implementation of [`PageSurface`]
//!
//! Selector probes and text reads run as small scripts inside the target
//! document's execution context, so nested frames are handled the same way as
//! the main document. Keyboard input is dispatched through CDP `Input` events,
//! which land on whatever element holds focus in any frame.

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::keys::{KeyDefinition, USKEYBOARD_LAYOUT, get_key_definition};
use chromiumoxide_cdp::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide_cdp::cdp::browser_protocol::page::FrameId;
use chromiumoxide_cdp::cdp::js_protocol::runtime::EvaluateParams;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use super::{Key, PageSurface, Probe, Scope};
use crate::utils::{ScraperError, ScraperResult};

// `__SELECTOR__` is replaced with a JSON string literal, never raw text.
const PROBE_JS: &str = r#"(() => {
    const el = document.querySelector(__SELECTOR__);
    if (!el) return false;
    if (!__VISIBLE__) return true;
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden';
})()"#;

const ACTIVATE_JS: &str = r#"(() => {
    const el = document.querySelector(__SELECTOR__);
    if (!el) return false;
    el.scrollIntoView({ block: 'center', inline: 'center' });
    if (typeof el.focus === 'function') el.focus();
    el.click();
    return true;
})()"#;

const TEXT_JS: &str = r#"(() => {
    const el = document.querySelector(__SELECTOR__);
    if (!el) return { found: false, text: '' };
    return { found: true, text: el.innerText || el.textContent || '' };
})()"#;

#[derive(Debug, Deserialize)]
struct TextProbe {
    found: bool,
    text: String,
}

/// Page capabilities backed by a live chromiumoxide [`Page`]
#[derive(Clone)]
pub struct ChromeSurface {
    page: Page,
    slow_mo: Duration,
}

impl ChromeSurface {
    /// `slow_mo` is paused before every input dispatched to the page.
    pub fn new(page: Page, slow_mo: Duration) -> Self {
        Self { page, slow_mo }
    }

    async fn slow_down(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    /// Evaluate `expression` in the execution context of `scope`
    async fn eval_in<T>(&self, scope: &Scope, expression: String) -> ScraperResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut builder = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .await_promise(true);

        if !scope.is_main() {
            let context = self
                .page
                .frame_execution_context(FrameId::new(scope.id()))
                .await
                .map_err(|e| ScraperError::Browser(format!("{}: {}", scope, e)))?
                .ok_or_else(|| {
                    ScraperError::Browser(format!("{} has no execution context", scope))
                })?;
            builder = builder.context_id(context);
        }

        let params = builder
            .build()
            .map_err(|e| ScraperError::Browser(format!("Failed to build evaluate params: {e}")))?;

        self.page
            .evaluate_expression(params)
            .await
            .map_err(|e| ScraperError::Browser(format!("{}: {}", scope, e)))?
            .into_value()
            .map_err(|e| ScraperError::Browser(format!("{}: unexpected script result: {}", scope, e)))
    }

    /// Real mouse click at the element's clickable point (main document only)
    async fn mouse_click(&self, selector: &str) -> ScraperResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::Browser(format!("'{}' not found: {}", selector, e)))?;

        element.scroll_into_view().await.map_err(|e| {
            ScraperError::Browser(format!(
                "Failed to scroll '{}' into view: {}",
                selector, e
            ))
        })?;

        // Clickable point + page click bypasses the IntersectionObserver wait in Element::click
        let point = element.clickable_point().await.map_err(|e| {
            ScraperError::Browser(format!(
                "Failed to get clickable point for '{}'. Element may not be visible: {}",
                selector, e
            ))
        })?;

        self.page
            .click(point)
            .await
            .map_err(|e| ScraperError::Browser(format!("Click on '{}' failed: {}", selector, e)))?;

        Ok(())
    }

    async fn script_click(&self, scope: &Scope, selector: &str) -> ScraperResult<()> {
        let activated: bool = self.eval_in(scope, script(ACTIVATE_JS, selector)?).await?;
        if activated {
            Ok(())
        } else {
            Err(ScraperError::Browser(format!(
                "'{}' disappeared from {} before it could be clicked",
                selector, scope
            )))
        }
    }

    async fn activate(&self, scope: &Scope, selector: &str) -> ScraperResult<()> {
        self.slow_down().await;
        if scope.is_main() {
            self.mouse_click(selector).await
        } else {
            self.script_click(scope, selector).await
        }
    }

    async fn key_event(&self, params: DispatchKeyEventParams) -> ScraperResult<()> {
        self.page
            .execute(params)
            .await
            .map_err(|e| ScraperError::Browser(format!("Key dispatch failed: {e}")))?;
        Ok(())
    }
}

/// Substitute a selector (as a JSON literal) into a script template
fn script(template: &str, selector: &str) -> ScraperResult<String> {
    let literal = serde_json::to_string(selector)
        .map_err(|e| ScraperError::Browser(format!("Unencodable selector '{}': {}", selector, e)))?;
    Ok(template.replace("__SELECTOR__", &literal))
}

/// CDP modifier bitmask for the platform's select-all chord
fn select_all_modifier() -> i64 {
    // Alt=1, Ctrl=2, Meta=4, Shift=8
    if cfg!(target_os = "macos") { 4 } else { 2 }
}

struct KeySpec {
    key: &'static str,
    code: &'static str,
    virtual_code: i64,
    modifiers: i64,
    text: Option<&'static str>,
    /// Editing command run on keydown; macOS only honours Cmd+A through this
    command: Option<&'static str>,
}

fn key_spec(key: Key) -> KeySpec {
    match key {
        Key::Enter => KeySpec {
            key: "Enter",
            code: "Enter",
            virtual_code: 13,
            modifiers: 0,
            text: Some("\r"),
            command: None,
        },
        Key::Backspace => KeySpec {
            key: "Backspace",
            code: "Backspace",
            virtual_code: 8,
            modifiers: 0,
            text: None,
            command: None,
        },
        Key::SelectAll => KeySpec {
            key: "a",
            code: "KeyA",
            virtual_code: 65,
            modifiers: select_all_modifier(),
            text: None,
            command: Some("selectAll"),
        },
    }
}

fn build_key_event(
    kind: DispatchKeyEventType,
    key: &str,
    code: &str,
    virtual_code: i64,
    modifiers: i64,
    text: Option<&str>,
    command: Option<&str>,
) -> ScraperResult<DispatchKeyEventParams> {
    let mut builder = DispatchKeyEventParams::builder()
        .r#type(kind)
        .key(key)
        .code(code)
        .windows_virtual_key_code(virtual_code)
        .native_virtual_key_code(virtual_code)
        .modifiers(modifiers);
    if let Some(text) = text {
        builder = builder.text(text).unmodified_text(text);
    }
    if let Some(command) = command {
        builder = builder.command(command);
    }
    builder
        .build()
        .map_err(|e| ScraperError::Browser(format!("Failed to build key event: {e}")))
}

/// US-layout key for a typed character, main block before numpad
///
/// `get_key_definition` alone returns the first match, which for `/` and `-`
/// is the numpad key.
fn typed_key(ch: &str) -> Option<&'static KeyDefinition> {
    USKEYBOARD_LAYOUT
        .iter()
        .find(|def| def.key == ch && !def.code.starts_with("Numpad"))
        .or_else(|| get_key_definition(ch))
}

#[async_trait]
impl PageSurface for ChromeSurface {
    async fn scopes(&self) -> ScraperResult<Vec<Scope>> {
        let main = self
            .page
            .mainframe()
            .await
            .map_err(|e| ScraperError::Browser(format!("Failed to get main frame: {e}")))?;
        let frames = self
            .page
            .frames()
            .await
            .map_err(|e| ScraperError::Browser(format!("Failed to list frames: {e}")))?;

        let main_id = main.map(|id| id.inner().clone());
        let mut scopes = Vec::with_capacity(frames.len() + 1);
        scopes.push(Scope::main(main_id.clone().unwrap_or_default()));
        scopes.extend(
            frames
                .into_iter()
                .map(|id| id.inner().clone())
                .filter(|id| Some(id) != main_id.as_ref())
                .map(Scope::frame),
        );

        trace!("Page has {} scope(s)", scopes.len());
        Ok(scopes)
    }

    async fn probe(&self, scope: &Scope, selector: &str, probe: Probe) -> ScraperResult<bool> {
        let visible = matches!(probe, Probe::Visible);
        let expression = script(PROBE_JS, selector)?.replace("__VISIBLE__", &visible.to_string());
        self.eval_in(scope, expression).await
    }

    async fn focus(&self, scope: &Scope, selector: &str) -> ScraperResult<()> {
        debug!("Focusing '{}' in {}", selector, scope);
        self.activate(scope, selector).await
    }

    async fn click(&self, scope: &Scope, selector: &str) -> ScraperResult<()> {
        debug!("Clicking '{}' in {}", selector, scope);
        self.activate(scope, selector).await
    }

    async fn press(&self, key: Key) -> ScraperResult<()> {
        self.slow_down().await;
        let spec = key_spec(key);
        let down_kind = if spec.text.is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };

        self.key_event(build_key_event(
            down_kind,
            spec.key,
            spec.code,
            spec.virtual_code,
            spec.modifiers,
            spec.text,
            spec.command,
        )?)
        .await?;
        self.key_event(build_key_event(
            DispatchKeyEventType::KeyUp,
            spec.key,
            spec.code,
            spec.virtual_code,
            spec.modifiers,
            None,
            None,
        )?)
        .await
    }

    async fn type_text(&self, text: &str, delay: Duration) -> ScraperResult<()> {
        self.slow_down().await;
        let mut buf = [0u8; 4];
        for (i, ch) in text.chars().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let typed: &str = ch.encode_utf8(&mut buf);
            let (key, code, virtual_code) = match typed_key(typed) {
                Some(def) => (def.key, def.code, def.key_code),
                None => (typed, "", 0),
            };
            self.key_event(build_key_event(
                DispatchKeyEventType::KeyDown,
                key,
                code,
                virtual_code,
                0,
                Some(typed),
                None,
            )?)
            .await?;
            self.key_event(build_key_event(
                DispatchKeyEventType::KeyUp,
                key,
                code,
                virtual_code,
                0,
                None,
                None,
            )?)
            .await?;
        }
        Ok(())
    }

    async fn inner_text(&self, scope: &Scope, selector: &str) -> ScraperResult<Option<String>> {
        let probe: TextProbe = self.eval_in(scope, script(TEXT_JS, selector)?).await?;
        Ok(probe.found.then_some(probe.text))
    }

    async fn scroll_to_top(&self) -> ScraperResult<()> {
        self.page
            .evaluate("window.scrollTo(0, 0);")
            .await
            .map_err(|e| ScraperError::Browser(format!("Scroll to top failed: {e}")))?;
        Ok(())
    }
}
