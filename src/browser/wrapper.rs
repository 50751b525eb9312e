//! Browser process lifetime
//!
//! Owns the chromiumoxide `Browser`, its CDP handler task and the temporary
//! profile directory for the duration of one run.

use anyhow::Result;
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::BrowserConfig;

/// Wrapper for Browser and its event handler task
///
/// The handler MUST be aborted once the browser is gone, otherwise it keeps
/// polling a dead websocket.
pub(crate) struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Remove the profile directory
    ///
    /// MUST run after `browser.wait()` so Chrome has released its file handles.
    pub(crate) fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up profile directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up profile directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();

        if let Some(dir) = self.user_data_dir.as_ref() {
            warn!(
                "BrowserWrapper dropped without shutdown; profile directory orphaned: {}",
                dir.display()
            );
        }
    }
}

/// Launch the run's browser with a per-process profile directory
pub(crate) async fn launch_browser(config: &BrowserConfig) -> Result<BrowserWrapper> {
    let user_data_dir =
        std::env::temp_dir().join(format!("price_backfill_chrome_{}", std::process::id()));

    let (browser, handler) = crate::browser_setup::launch_browser(config, &user_data_dir).await?;

    Ok(BrowserWrapper::new(browser, handler, user_data_dir))
}

/// Open the single working page
///
/// Starts from about:blank so navigation (and any login redirect) happens on a
/// page the session already tracks.
pub(crate) async fn create_blank_page(wrapper: &BrowserWrapper) -> Result<Page> {
    let page = wrapper
        .browser()
        .new_page("about:blank")
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create blank page: {e}"))?;

    info!("Created blank page");
    Ok(page)
}
