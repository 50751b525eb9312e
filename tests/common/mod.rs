//! Synthetic page for exercising the backfill driver without a browser
//!
//! Scopes hold elements with visible/hidden flags. A date typed into any field
//! and submitted switches the price cell to that day's quote after a
//! configurable number of reads, mimicking the page's asynchronous recompute.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use price_backfill::{Key, PageSurface, Probe, Scope, ScraperError, ScraperResult};

pub const DATE_INPUT: &str = "input#asofDate";
pub const EDITABLE: &str = "div[contenteditable='true']";
pub const SUBMIT: &str = "#customAsOfBal";
pub const PRICE: &str =
    "#caoBalDiv > table > tbody > tr > td.unite-table-cell.unite-table-cell-2.unite-table-column-unit";

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub selector: String,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct FakeScope {
    pub scope: Scope,
    pub elements: Vec<FakeElement>,
    /// Every probe in this scope errors, like a detached frame
    pub broken: bool,
}

impl FakeScope {
    pub fn main() -> Self {
        Self {
            scope: Scope::main("main"),
            elements: Vec::new(),
            broken: false,
        }
    }

    pub fn frame(id: &str) -> Self {
        Self {
            scope: Scope::frame(id),
            elements: Vec::new(),
            broken: false,
        }
    }

    pub fn visible(mut self, selector: &str) -> Self {
        self.elements.push(FakeElement {
            selector: selector.to_string(),
            visible: true,
        });
        self
    }

    pub fn hidden(mut self, selector: &str) -> Self {
        self.elements.push(FakeElement {
            selector: selector.to_string(),
            visible: false,
        });
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    fn find(&self, selector: &str) -> Option<&FakeElement> {
        self.elements.iter().find(|el| el.selector == selector)
    }
}

#[derive(Debug, Default)]
struct PageState {
    typed: String,
    focused: Option<String>,
    shown_price: String,
    pending: Option<(String, usize)>,
    submitted: Vec<String>,
    events: Vec<String>,
    probes: Vec<(String, String)>,
    scope_reads: usize,
}

/// Fake page implementing the browser capability surface
pub struct FakePage {
    scopes: Mutex<Vec<FakeScope>>,
    quotes: HashMap<String, String>,
    lag_reads: usize,
    failing_clicks: Mutex<u32>,
    failing_scopes_calls: Mutex<u32>,
    ready_after_scope_reads: Option<usize>,
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(scopes: Vec<FakeScope>) -> Self {
        Self {
            scopes: Mutex::new(scopes),
            quotes: HashMap::new(),
            lag_reads: 0,
            failing_clicks: Mutex::new(0),
            failing_scopes_calls: Mutex::new(0),
            ready_after_scope_reads: None,
            state: Mutex::new(PageState::default()),
        }
    }

    /// Main document with date input, submit and price cell, all visible
    pub fn balance_page() -> Self {
        Self::new(vec![
            FakeScope::main()
                .visible(DATE_INPUT)
                .visible(SUBMIT)
                .visible(PRICE),
        ])
    }

    /// Quote shown after submitting `mm/dd/yyyy`
    pub fn quote(mut self, mmddyyyy: &str, price: &str) -> Self {
        self.quotes.insert(mmddyyyy.to_string(), price.to_string());
        self
    }

    pub fn showing(self, price: &str) -> Self {
        self.state.lock().unwrap().shown_price = price.to_string();
        self
    }

    /// Number of price reads after a submit before the new quote appears
    pub fn lag(mut self, reads: usize) -> Self {
        self.lag_reads = reads;
        self
    }

    /// The next `n` clicks on the submit control fail
    pub fn failing_clicks(self, n: u32) -> Self {
        *self.failing_clicks.lock().unwrap() = n;
        self
    }

    /// The next `n` scope enumerations fail
    pub fn failing_scopes(self, n: u32) -> Self {
        *self.failing_scopes_calls.lock().unwrap() = n;
        self
    }

    /// Scopes report no elements until they have been listed `n` times
    pub fn ready_after(mut self, n: usize) -> Self {
        self.ready_after_scope_reads = Some(n);
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    /// (scope id, selector) pairs in the order they were probed
    pub fn probes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().probes.clone()
    }

    pub fn remove(&self, selector: &str) {
        for scope in self.scopes.lock().unwrap().iter_mut() {
            scope.elements.retain(|el| el.selector != selector);
        }
    }

    fn element(&self, scope: &Scope, selector: &str) -> ScraperResult<Option<FakeElement>> {
        let scopes = self.scopes.lock().unwrap();
        let fake = scopes
            .iter()
            .find(|s| &s.scope == scope)
            .ok_or_else(|| ScraperError::Browser(format!("unknown {}", scope)))?;
        if fake.broken {
            return Err(ScraperError::Browser(format!("{} detached", scope)));
        }
        Ok(fake.find(selector).cloned())
    }

    fn log(&self, event: String) {
        self.state.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl PageSurface for FakePage {
    async fn scopes(&self) -> ScraperResult<Vec<Scope>> {
        {
            let mut failing = self.failing_scopes_calls.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(ScraperError::Browser("target closed".into()));
            }
        }

        let mut state = self.state.lock().unwrap();
        state.scope_reads += 1;
        if let Some(n) = self.ready_after_scope_reads
            && state.scope_reads <= n
        {
            return Ok(vec![Scope::main("loading")]);
        }

        Ok(self.scopes.lock().unwrap().iter().map(|s| s.scope.clone()).collect())
    }

    async fn probe(&self, scope: &Scope, selector: &str, probe: Probe) -> ScraperResult<bool> {
        self.state
            .lock()
            .unwrap()
            .probes
            .push((scope.id().to_string(), selector.to_string()));

        if scope.id() == "loading" {
            return Ok(false);
        }
        let found = self.element(scope, selector)?;
        Ok(match (found, probe) {
            (Some(el), Probe::Visible) => el.visible,
            (Some(_), Probe::Present) => true,
            (None, _) => false,
        })
    }

    async fn focus(&self, scope: &Scope, selector: &str) -> ScraperResult<()> {
        self.element(scope, selector)?
            .ok_or_else(|| ScraperError::Browser(format!("'{}' vanished", selector)))?;
        let mut state = self.state.lock().unwrap();
        state.focused = Some(selector.to_string());
        state.events.push(format!("focus {}", selector));
        Ok(())
    }

    async fn click(&self, scope: &Scope, selector: &str) -> ScraperResult<()> {
        self.element(scope, selector)?
            .ok_or_else(|| ScraperError::Browser(format!("'{}' vanished", selector)))?;

        {
            let mut failing = self.failing_clicks.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                self.log(format!("click {} (failed)", selector));
                return Err(ScraperError::Browser("element is obscured".into()));
            }
        }

        let mut state = self.state.lock().unwrap();
        state.events.push(format!("click {}", selector));
        let date = state.typed.clone();
        state.submitted.push(date.clone());
        let price = self.quotes.get(&date).cloned().unwrap_or_default();
        state.pending = Some((price, self.lag_reads));
        Ok(())
    }

    async fn press(&self, key: Key) -> ScraperResult<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("press {:?}", key));
        if key == Key::Backspace {
            state.typed.clear();
        }
        Ok(())
    }

    async fn type_text(&self, text: &str, delay: Duration) -> ScraperResult<()> {
        for (i, ch) in text.chars().enumerate() {
            if i > 0 {
                tokio::time::sleep(delay).await;
            }
            self.state.lock().unwrap().typed.push(ch);
        }
        self.log(format!("type {}", text));
        Ok(())
    }

    async fn inner_text(&self, scope: &Scope, selector: &str) -> ScraperResult<Option<String>> {
        if self.element(scope, selector)?.is_none() {
            return Ok(None);
        }

        let mut state = self.state.lock().unwrap();
        if let Some((price, remaining)) = state.pending.take() {
            if remaining == 0 {
                state.shown_price = price;
            } else {
                state.pending = Some((price, remaining - 1));
            }
        }
        Ok(Some(format!("  {}\n", state.shown_price)))
    }

    async fn scroll_to_top(&self) -> ScraperResult<()> {
        self.log("scroll top".to_string());
        Ok(())
    }
}
