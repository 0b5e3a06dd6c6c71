use crate::{
    browser::config::{ConnectionOptions, LaunchOptions},
    error::{Result, ScrapeError},
};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// A Chrome/Chromium instance whose foreground tab is the extraction target
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // CRM login pages tend to refuse automation-flagged browsers
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        launch_opts.idle_browser_timeout = options.idle_timeout;
        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| ScrapeError::LaunchFailed(e.to_string()))?;
        browser
            .new_tab()
            .map_err(|e| ScrapeError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        log::info!("Launched browser (headless: {})", options.headless);
        Ok(Self { browser })
    }

    /// Attach to a running browser via its DevTools websocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url.clone(), Duration::from_millis(options.timeout))
            .map_err(|e| ScrapeError::ConnectionFailed(e.to_string()))?;

        log::info!("Connected to browser at {}", options.ws_url);
        Ok(Self { browser })
    }

    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| ScrapeError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// The foreground tab, if there is one.
    ///
    /// Visible and focused wins; a merely visible tab is the fallback.
    pub fn active_tab(&self) -> Result<Option<Arc<Tab>>> {
        let tabs = self.get_tabs()?;

        let checks = [
            "document.visibilityState === 'visible' && document.hasFocus()",
            "document.visibilityState === 'visible'",
        ];

        for check in checks {
            if let Some(tab) = tabs.iter().find(|tab| evaluates_true(tab, check)) {
                return Ok(Some(tab.clone()));
            }
        }

        Ok(None)
    }

    /// Load `url` in the foreground tab and wait for it to settle
    pub fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.active_tab()?.ok_or(ScrapeError::NoTarget)?;
        tab.navigate_to(url)
            .map_err(|e| ScrapeError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| ScrapeError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// Close every tab; the process itself goes away when the session is dropped
    pub fn close(&self) -> Result<()> {
        for tab in self.get_tabs()? {
            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close tab {}: {}", tab.get_target_id(), e);
            }
        }
        Ok(())
    }
}

fn evaluates_true(tab: &Tab, expression: &str) -> bool {
    match tab.evaluate(expression, false) {
        Ok(remote_object) => remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false),
        Err(e) => {
            log::debug!("Failed to check tab status: {}", e);
            false
        }
    }
}
