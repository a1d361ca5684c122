//! Rendered-page access abstraction.
//!
//! The crawl engine never talks to a browser directly; it drives whatever
//! implements [`PageDriver`]. One driver represents one exclusive page
//! session, so every method takes `&mut self` and no locking is needed.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle to an element discovered by a query.
///
/// Handles are indices into the driver's element registry and are
/// invalidated by the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHandle(pub usize);

/// Driver-level failure.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("element handle {0} is stale or unknown")]
    StaleHandle(usize),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("page backend error: {0}")]
    Backend(String),
}

/// A navigable, scriptable view of a fully rendered web page.
///
/// Implementations: a chromiumoxide-backed browser session for scripted
/// sites, a fetch-and-parse driver for server-rendered ones, and a fake
/// for tests. Any implementation satisfying this capability set is
/// interchangeable from the engine's point of view.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to `url`, bounded by `timeout`. Invalidates all handles.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// All elements matching `selector`, scoped to `scope` when given,
    /// otherwise to the whole document. No match is an empty vec, not an
    /// error.
    async fn query_all(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, PageError>;

    /// First element matching `selector` within `scope`, if any.
    async fn query_one(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Option<ElementHandle>, PageError>;

    /// Rendered text content of the element.
    async fn text(&mut self, element: ElementHandle) -> Result<String, PageError>;

    /// Attribute value, `None` when the attribute is absent.
    async fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError>;

    /// Inner markup of the element.
    async fn inner_html(&mut self, element: ElementHandle) -> Result<String, PageError>;

    /// Evaluate a script in page context and return its value. Drivers
    /// without a script engine return `Null`.
    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, PageError>;

    /// Bring the element into the viewport. Best-effort for callers.
    async fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), PageError>;

    /// Click the element.
    async fn click(&mut self, element: ElementHandle) -> Result<(), PageError>;

    /// Release the underlying session. Must be called on every exit path.
    async fn close(&mut self) -> Result<(), PageError>;
}
