//! Price cell reading, update detection and normalization

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::locator::{SelectorSet, resolve};
use crate::surface::PageSurface;
use crate::utils::{PollPolicy, poll_until};

// Optional sign and `$`, optional thousands separators, exactly two decimals.
static PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\$?\s*([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})|[0-9]+(?:\.[0-9]{2}))")
        .expect("price pattern is valid")
});

/// Extract a plain decimal from freeform price text
///
/// `"$1,234.56"` becomes `"1234.56"`. Text without a money pattern comes back
/// trimmed but otherwise untouched.
pub fn clean_price(raw: &str) -> String {
    let normalized = raw.replace('\u{00A0}', " ");
    let normalized = normalized.trim();
    if normalized.is_empty() {
        return String::new();
    }

    match PRICE_REGEX.captures(normalized).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().replace(',', ""),
        None => normalized.to_string(),
    }
}

/// Current price cell text, trimmed; empty when the cell is missing or unreadable
pub async fn read_price_text(surface: &dyn PageSurface, cell: &SelectorSet) -> String {
    let Some(located) = resolve(surface, cell).await else {
        return String::new();
    };

    match surface.inner_text(&located.scope, &located.selector).await {
        Ok(text) => text.unwrap_or_default().trim().to_string(),
        Err(e) => {
            trace!("Reading price cell failed: {}", e);
            String::new()
        }
    }
}

/// How a wait for a fresh price ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Non-empty text that differs from the previous snapshot (or any text if there was none)
    Updated,
    /// Timed out still showing the previous non-empty text
    Unchanged,
    /// Timed out without any text
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub text: String,
    pub status: UpdateStatus,
}

/// Poll the price cell until its text changes from `previous`
///
/// The page gives no completion signal after a submit, so a text change is the
/// only evidence the recompute finished. A price that genuinely did not move
/// ends as [`UpdateStatus::Unchanged`] once the policy times out.
pub async fn wait_for_update(
    surface: &dyn PageSurface,
    cell: &SelectorSet,
    previous: Option<&str>,
    policy: PollPolicy,
) -> UpdateOutcome {
    let previous = previous.filter(|p| !p.is_empty());

    let polled = poll_until(
        policy,
        || read_price_text(surface, cell),
        |text: &String| !text.is_empty() && previous.is_none_or(|p| text.as_str() != p),
    )
    .await;

    let status = if polled.satisfied {
        UpdateStatus::Updated
    } else if polled.value.is_empty() {
        UpdateStatus::Empty
    } else {
        UpdateStatus::Unchanged
    };
    debug!("Price wait ended {:?} with '{}'", status, polled.value);

    UpdateOutcome {
        text: polled.value,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_decimal_is_idempotent() {
        assert_eq!(clean_price("12.34"), "12.34");
        assert_eq!(clean_price(&clean_price("$1,234.56")), "1234.56");
    }

    #[test]
    fn strips_currency_and_separators() {
        assert_eq!(clean_price("$1,234.56"), "1234.56");
        assert_eq!(clean_price("  $ 987,654,321.00 per unit"), "987654321.00");
        assert_eq!(clean_price("1234.56"), "1234.56");
    }

    #[test]
    fn non_breaking_spaces_are_normalized() {
        assert_eq!(clean_price("\u{00A0}$\u{00A0}42.10\u{00A0}"), "42.10");
    }

    #[test]
    fn unmatched_text_is_trimmed_only() {
        assert_eq!(clean_price("N/A"), "N/A");
        assert_eq!(clean_price("  pending \n"), "pending");
        assert_eq!(clean_price("12.3"), "12.3");
        assert_eq!(clean_price(""), "");
    }

    #[test]
    fn sign_is_dropped_with_the_symbol() {
        assert_eq!(clean_price("-$5.25"), "5.25");
    }
}
