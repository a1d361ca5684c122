//! Chromium-backed page driver.
//!
//! Uses chromiumoxide (CDP) with basic fingerprint evasion: stealth launch
//! arguments, a randomized user agent per session, and webdriver-property
//! masking. Career sites running client-side frameworks need this driver;
//! server-rendered ones can use the static driver instead.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::page::{ElementHandle, PageDriver, PageError};
use super::{random_user_agent, CrawlError};

/// Script that resolves once the document is interactive, with its own
/// fallback timeout in case the event never fires.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Best-effort evasion scripts applied after each navigation.
const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Fix languages
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
];

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// One exclusive browser session driving a single page.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    elements: Vec<Element>,
}

impl BrowserSession {
    /// Launch a browser and open a blank page with a randomized user agent.
    pub async fn launch(headless: bool) -> Result<Self, CrawlError> {
        let chrome_path = find_chrome().ok_or_else(|| {
            CrawlError::Setup(
                "Chrome/Chromium not found; install it or add it to PATH".to_string(),
            )
        })?;
        info!("Launching browser from {} (headless={})", chrome_path, headless);

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if !headless {
            builder = builder.with_head();
        }
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--window-size=1920,1080");

        let config = builder
            .build()
            .map_err(|e| CrawlError::Setup(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Setup(format!("failed to launch browser: {e}")))?;

        // Drive the CDP event loop for the lifetime of the session.
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Setup(format!("failed to open page: {e}")))?;

        let user_agent = random_user_agent();
        debug!("Session user agent: {}", user_agent);
        page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
            .map_err(|e| CrawlError::Setup(format!("failed to set user agent: {e}")))?;

        Ok(Self {
            browser,
            page,
            elements: Vec::new(),
        })
    }

    fn element(&self, handle: ElementHandle) -> Result<&Element, PageError> {
        self.elements
            .get(handle.0)
            .ok_or(PageError::StaleHandle(handle.0))
    }

    fn register(&mut self, elements: Vec<Element>) -> Vec<ElementHandle> {
        let start = self.elements.len();
        self.elements.extend(elements);
        (start..self.elements.len()).map(ElementHandle).collect()
    }

    async fn apply_stealth(&self) {
        for script in STEALTH_SCRIPTS {
            if let Err(e) = self.page.evaluate(script.to_string()).await {
                // Best-effort; fails on non-HTML pages and mid-transition.
                debug!("Stealth script injection skipped: {}", e);
            }
        }
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        self.elements.clear();
        debug!("Navigating to {}", url);

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let navigation = async {
            self.page
                .execute(params)
                .await
                .map_err(|e| PageError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            // Wait on readyState instead of a blind fixed delay.
            match self.page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()).await {
                Ok(result) => {
                    let state: String = result
                        .into_value()
                        .unwrap_or_else(|_| "unknown".to_string());
                    debug!("Page ready state: {}", state);
                }
                Err(e) => debug!("Could not check ready state: {}", e),
            }
            Ok::<(), PageError>(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => {
                self.apply_stealth().await;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PageError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn query_all(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, PageError> {
        let found = match scope {
            None => self.page.find_elements(selector).await,
            Some(handle) => self.element(handle)?.find_elements(selector).await,
        };
        match found {
            Ok(elements) => Ok(self.register(elements)),
            // CDP surfaces "no match" as an error for scoped queries.
            Err(e) => {
                debug!("find_elements({:?}) failed: {}", selector, e);
                Ok(Vec::new())
            }
        }
    }

    async fn query_one(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Option<ElementHandle>, PageError> {
        let found = match scope {
            None => self.page.find_element(selector).await,
            Some(handle) => self.element(handle)?.find_element(selector).await,
        };
        match found {
            Ok(element) => Ok(self.register(vec![element]).into_iter().next()),
            Err(_) => Ok(None),
        }
    }

    async fn text(&mut self, element: ElementHandle) -> Result<String, PageError> {
        self.element(element)?
            .inner_text()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PageError::Backend(e.to_string()))
    }

    async fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        self.element(element)?
            .attribute(name)
            .await
            .map_err(|e| PageError::Backend(e.to_string()))
    }

    async fn inner_html(&mut self, element: ElementHandle) -> Result<String, PageError> {
        self.element(element)?
            .inner_html()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PageError::Backend(e.to_string()))
    }

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, PageError> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), PageError> {
        self.element(element)?
            .scroll_into_view()
            .await
            .map(|_| ())
            .map_err(|e| PageError::Backend(e.to_string()))
    }

    async fn click(&mut self, element: ElementHandle) -> Result<(), PageError> {
        self.element(element)?
            .click()
            .await
            .map(|_| ())
            .map_err(|e| PageError::Backend(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.elements.clear();
        if let Err(e) = self.page.clone().close().await {
            debug!("Page close failed: {}", e);
        }
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        Ok(())
    }
}

/// Find a Chrome executable: well-known paths first, then `which`.
fn find_chrome() -> Option<String> {
    for path in CHROME_PATHS {
        if std::path::Path::new(path).exists() {
            debug!("Found Chrome at {}", path);
            return Some(path.to_string());
        }
    }

    for cmd in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    debug!("Found Chrome in PATH: {}", path);
                    return Some(path);
                }
            }
        }
    }

    None
}
