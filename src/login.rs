//! Waiting for the operator to reach the balance page
//!
//! The site may redirect to a login or MFA flow that a human completes in the
//! visible browser. Readiness is inferred only from the target controls
//! appearing; there is no other signal.

use tracing::{info, warn};

use crate::SelectorConfig;
use crate::locator::{Role, resolve};
use crate::surface::PageSurface;
use crate::utils::{PollPolicy, poll_until};

pub const LOGIN_NOTICE: &str = "If you see a login page or MFA, complete it manually. \
Once you reach Account Overview, leave the tab open; the script will proceed.";

/// Whether a date field (input or editable region) and the submit control are both present
pub async fn controls_ready(surface: &dyn PageSurface, selectors: &SelectorConfig) -> bool {
    let date_field = resolve(surface, &selectors.set(Role::DateInput)).await.is_some()
        || resolve(surface, &selectors.set(Role::EditableDiv)).await.is_some();
    if !date_field {
        return false;
    }
    resolve(surface, &selectors.set(Role::SubmitButton)).await.is_some()
}

/// Poll until the controls are ready or the window elapses
///
/// Returns whether the page became ready; the run proceeds either way.
pub async fn wait_until_ready(
    surface: &dyn PageSurface,
    selectors: &SelectorConfig,
    policy: PollPolicy,
) -> bool {
    let polled = poll_until(policy, || controls_ready(surface, selectors), |ready| *ready).await;

    if polled.satisfied {
        info!("Balance page controls found, starting backfill");
    } else {
        warn!(
            "Balance page controls not found within {}s, proceeding anyway",
            policy.timeout.as_secs()
        );
    }
    polled.satisfied
}
