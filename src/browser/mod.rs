//! Browser session for a backfill run
//!
//! One browser, one page, held for the whole run and closed exactly once.

mod wrapper;

use wrapper::{BrowserWrapper, create_blank_page, launch_browser};

use chromiumoxide::page::Page;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::BrowserConfig;
use crate::surface::ChromeSurface;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation to {url} failed: {message}")]
    NavigationFailed { url: String, message: String },
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// The browser process plus the page the run drives
pub struct BrowserSession {
    wrapper: BrowserWrapper,
    page: Page,
    slow_mo: Duration,
}

impl BrowserSession {
    /// Launch the browser and open a blank working page
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        let wrapper = launch_browser(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("{e:#}")))?;

        let page = match create_blank_page(&wrapper).await {
            Ok(page) => page,
            Err(e) => {
                Self::close_wrapper(wrapper).await;
                return Err(BrowserError::PageCreationFailed(format!("{e:#}")));
            }
        };

        Ok(Self {
            wrapper,
            page,
            slow_mo: Duration::from_millis(config.slow_mo_ms),
        })
    }

    /// Navigate and wait for the document to load
    pub async fn navigate(&self, url: &str) -> BrowserResult<()> {
        info!("Navigating to {}", url);
        let failed = |e: chromiumoxide::error::CdpError| BrowserError::NavigationFailed {
            url: url.to_string(),
            message: e.to_string(),
        };

        self.page.goto(url).await.map_err(failed)?;
        self.page.wait_for_navigation().await.map_err(failed)?;
        Ok(())
    }

    /// Page capabilities for the backfill loop
    pub fn surface(&self) -> ChromeSurface {
        ChromeSurface::new(self.page.clone(), self.slow_mo)
    }

    /// Close the page and browser, wait for exit, remove the profile
    ///
    /// `BrowserWrapper::drop` only aborts the handler; without an explicit
    /// close the Chrome process outlives the run.
    pub async fn shutdown(self) {
        let Self { wrapper, page, .. } = self;

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }
        Self::close_wrapper(wrapper).await;
    }

    async fn close_wrapper(mut wrapper: BrowserWrapper) {
        info!("Shutting down browser");

        if let Err(e) = wrapper.browser_mut().close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = wrapper.browser_mut().wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }

        wrapper.cleanup_temp_dir();
    }
}
