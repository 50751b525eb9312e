//! Form interactions: typing the as-of date and submitting it

use std::time::Duration;

use tracing::{debug, info};

use crate::locator::{Located, SelectorSet, resolve};
use crate::surface::{Key, PageSurface};
use crate::utils::{ScraperError, ScraperResult};

/// Clear the element and type `text` into it keystroke by keystroke
///
/// Input masks on the page validate per keystroke, so the value is never
/// assigned directly.
async fn fill(
    surface: &dyn PageSurface,
    located: &Located,
    text: &str,
    keystroke_delay: Duration,
) -> ScraperResult<()> {
    surface.focus(&located.scope, &located.selector).await?;
    surface.press(Key::SelectAll).await?;
    surface.press(Key::Backspace).await?;
    surface.type_text(text, keystroke_delay).await
}

/// Type `date` (already `MM/DD/YYYY`) into the first settable date field
///
/// Tries the typed input candidates first, then the editable-region fallback.
/// Returns where the date was typed.
pub async fn set_date(
    surface: &dyn PageSurface,
    date_input: &SelectorSet,
    editable: &SelectorSet,
    date: &str,
    keystroke_delay: Duration,
) -> ScraperResult<Located> {
    let mut last_error = None;

    for set in [date_input, editable] {
        let Some(located) = resolve(surface, set).await else {
            continue;
        };

        match fill(surface, &located, date, keystroke_delay).await {
            Ok(()) => {
                debug!("Typed {} into {} '{}'", date, set.role(), located.selector);
                return Ok(located);
            }
            Err(e) => {
                info!("Typing into {} '{}' failed: {}", set.role(), located.selector, e);
                last_error = Some(ScraperError::interaction(set.role(), e));
            }
        }
    }

    Err(last_error.unwrap_or(ScraperError::ElementNotFound {
        role: date_input.role(),
    }))
}

/// Click the submit control wherever it resolves; no retry here
pub async fn click_submit(surface: &dyn PageSurface, submit: &SelectorSet) -> ScraperResult<Located> {
    let located = resolve(surface, submit)
        .await
        .ok_or(ScraperError::ElementNotFound { role: submit.role() })?;

    surface
        .click(&located.scope, &located.selector)
        .await
        .map_err(|e| ScraperError::interaction(submit.role(), e))?;

    Ok(located)
}
