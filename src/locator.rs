//! Locator resolution across selector candidates and frames
//!
//! The balance page ships under several markups and sometimes inside an
//! iframe, so each logical role carries an ordered list of selectors. The first
//! (scope, selector) pair that matches wins: main document first with every
//! selector in priority order, then each nested frame in discovery order.
//! A probe that errors counts as a miss for that probe only.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::surface::{PageSurface, Probe, Scope};

/// Logical element the backfill loop needs to find on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    DateInput,
    EditableDiv,
    SubmitButton,
    PriceCell,
}

impl Role {
    /// The price cell is read even before it renders, every other role must be visible.
    pub fn probe(self) -> Probe {
        match self {
            Role::PriceCell => Probe::Present,
            _ => Probe::Visible,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::DateInput => "date input",
            Role::EditableDiv => "editable date field",
            Role::SubmitButton => "submit button",
            Role::PriceCell => "price cell",
        };
        f.write_str(name)
    }
}

/// Ordered, immutable selector candidates for one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    role: Role,
    selectors: Vec<String>,
}

impl SelectorSet {
    pub fn new<I, S>(role: Role, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role,
            selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }
}

/// A resolved element: where it lives and which selector matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub scope: Scope,
    pub selector: String,
}

/// First selector of `set` that matches in `scope`, in priority order
pub async fn resolve_in_scope(
    surface: &dyn PageSurface,
    scope: &Scope,
    set: &SelectorSet,
) -> Option<String> {
    let probe = set.role().probe();
    for selector in set.selectors() {
        match surface.probe(scope, selector, probe).await {
            Ok(true) => return Some(selector.clone()),
            Ok(false) => {}
            Err(e) => trace!("Probe '{}' in {} failed: {}", selector, scope, e),
        }
    }
    None
}

/// Resolve a role across every scope of the page
///
/// Returns `None` when no combination matches; absence is not an error here.
pub async fn resolve(surface: &dyn PageSurface, set: &SelectorSet) -> Option<Located> {
    let scopes = match surface.scopes().await {
        Ok(scopes) => scopes,
        Err(e) => {
            debug!("Could not enumerate page scopes for {}: {}", set.role(), e);
            return None;
        }
    };

    for scope in scopes {
        if let Some(selector) = resolve_in_scope(surface, &scope, set).await {
            debug!("Resolved {} as '{}' in {}", set.role(), selector, scope);
            return Some(Located { scope, selector });
        }
    }

    trace!("No match for {} in any scope", set.role());
    None
}
