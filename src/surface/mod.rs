//! The browser capabilities the backfill loop depends on
//!
//! Everything the driver needs from a page goes through [`PageSurface`]:
//! enumerate documents, probe selectors, focus/click elements, dispatch keys
//! and read text. The chromiumoxide implementation lives in [`chrome`]; tests
//! substitute a synthetic document tree.

mod chrome;

pub use chrome::ChromeSurface;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::utils::ScraperResult;

/// One navigable document: the main document or a nested frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    id: String,
    main: bool,
}

impl Scope {
    pub fn main(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            main: true,
        }
    }

    pub fn frame(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            main: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_main(&self) -> bool {
        self.main
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.main {
            write!(f, "main({})", self.id)
        } else {
            write!(f, "frame({})", self.id)
        }
    }
}

/// What a selector probe must establish about the matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Element exists and currently renders with a non-empty box
    Visible,
    /// Element exists in the document, rendered or not
    Present,
}

/// Keys dispatched to whichever element holds focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    /// Ctrl+A, or Cmd+A on macOS
    SelectAll,
}

/// Opaque page capabilities: documents, selectors, input, text
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// All documents of the page, main document first, then frames in discovery order.
    async fn scopes(&self) -> ScraperResult<Vec<Scope>>;

    /// Whether `selector` matches an element in `scope` satisfying `probe`.
    async fn probe(&self, scope: &Scope, selector: &str, probe: Probe) -> ScraperResult<bool>;

    /// Focus the first match of `selector` in `scope` by clicking it.
    async fn focus(&self, scope: &Scope, selector: &str) -> ScraperResult<()>;

    /// Activate the first match of `selector` in `scope`.
    async fn click(&self, scope: &Scope, selector: &str) -> ScraperResult<()>;

    async fn press(&self, key: Key) -> ScraperResult<()>;

    /// Type `text` one character at a time, pausing `delay` between keystrokes.
    async fn type_text(&self, text: &str, delay: Duration) -> ScraperResult<()>;

    /// Rendered text of the first match, `None` when nothing matches.
    async fn inner_text(&self, scope: &Scope, selector: &str) -> ScraperResult<Option<String>>;

    async fn scroll_to_top(&self) -> ScraperResult<()>;
}
