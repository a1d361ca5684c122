//! Fetch-and-parse page driver for server-rendered sites.
//!
//! Sites that ship their listings in the initial HTML don't need a browser;
//! this driver satisfies the same [`PageDriver`] contract with a plain HTTP
//! fetch and an HTML parser. Scripts and scrolling are no-ops, which makes
//! the scroll-stabilization loop converge immediately.
//!
//! Elements are kept as owned HTML fragments and re-parsed per operation,
//! so nothing borrowed crosses an await point. Scoped queries therefore
//! match descendants of the scope element only, which is what selector
//! chains use.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use super::page::{ElementHandle, PageDriver, PageError};
use super::random_user_agent;

/// HTTP-backed page driver.
pub struct StaticPage {
    client: reqwest::Client,
    document: String,
    fragments: Vec<String>,
}

impl StaticPage {
    pub fn new() -> Result<Self, PageError> {
        let client = reqwest::Client::builder()
            .user_agent(random_user_agent())
            .cookie_store(true)
            .build()
            .map_err(|e| PageError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            document: String::new(),
            fragments: Vec::new(),
        })
    }

    fn parse_selector(selector: &str) -> Result<Selector, PageError> {
        Selector::parse(selector)
            .map_err(|e| PageError::Backend(format!("bad selector {selector:?}: {e}")))
    }

    fn scope_html(&self, scope: Option<ElementHandle>) -> Result<ScopeDoc, PageError> {
        match scope {
            None => Ok(ScopeDoc::Document(Html::parse_document(&self.document))),
            Some(handle) => {
                let fragment = self
                    .fragments
                    .get(handle.0)
                    .ok_or(PageError::StaleHandle(handle.0))?;
                Ok(ScopeDoc::Fragment(Html::parse_fragment(fragment)))
            }
        }
    }

    fn fragment(&self, handle: ElementHandle) -> Result<Html, PageError> {
        let html = self
            .fragments
            .get(handle.0)
            .ok_or(PageError::StaleHandle(handle.0))?;
        Ok(Html::parse_fragment(html))
    }

    fn push(&mut self, html: String) -> ElementHandle {
        self.fragments.push(html);
        ElementHandle(self.fragments.len() - 1)
    }
}

enum ScopeDoc {
    Document(Html),
    Fragment(Html),
}

impl ScopeDoc {
    fn html(&self) -> &Html {
        match self {
            ScopeDoc::Document(html) | ScopeDoc::Fragment(html) => html,
        }
    }
}

/// First element of a parsed fragment, i.e. the stored element itself.
fn fragment_root(fragment: &Html) -> Option<scraper::ElementRef<'_>> {
    fragment
        .root_element()
        .children()
        .filter_map(scraper::ElementRef::wrap)
        .next()
}

#[async_trait]
impl PageDriver for StaticPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PageError::NavigationTimeout {
                        url: url.to_string(),
                        timeout,
                    }
                } else {
                    PageError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        self.document = response.text().await.map_err(|e| PageError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.fragments.clear();
        Ok(())
    }

    async fn query_all(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, PageError> {
        let parsed = Self::parse_selector(selector)?;
        let doc = self.scope_html(scope)?;
        let matches: Vec<String> = doc.html().select(&parsed).map(|el| el.html()).collect();
        Ok(matches.into_iter().map(|html| self.push(html)).collect())
    }

    async fn query_one(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Option<ElementHandle>, PageError> {
        let parsed = Self::parse_selector(selector)?;
        let doc = self.scope_html(scope)?;
        let found = doc.html().select(&parsed).next().map(|el| el.html());
        Ok(found.map(|html| self.push(html)))
    }

    async fn text(&mut self, element: ElementHandle) -> Result<String, PageError> {
        let fragment = self.fragment(element)?;
        Ok(fragment.root_element().text().collect::<String>())
    }

    async fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let fragment = self.fragment(element)?;
        Ok(fragment_root(&fragment).and_then(|el| el.attr(name).map(str::to_string)))
    }

    async fn inner_html(&mut self, element: ElementHandle) -> Result<String, PageError> {
        let fragment = self.fragment(element)?;
        Ok(fragment_root(&fragment)
            .map(|el| el.inner_html())
            .unwrap_or_default())
    }

    async fn execute_script(&mut self, _script: &str) -> Result<serde_json::Value, PageError> {
        // No script engine; height probes read Null and stabilize at once.
        Ok(serde_json::Value::Null)
    }

    async fn scroll_into_view(&mut self, _element: ElementHandle) -> Result<(), PageError> {
        Ok(())
    }

    async fn click(&mut self, _element: ElementHandle) -> Result<(), PageError> {
        // Static documents have nothing to click; consent dismissal is moot.
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.document.clear();
        self.fragments.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <html><body>
          <div id="results">
            <a class="job-card" href="/jobs/101/">
              <h3>Backend Engineer</h3>
              <span class="job-location">Denver, CO</span>
            </a>
            <a class="job-card" href="/jobs/102/">
              <h3>Data Scientist</h3>
              <span class="job-location">NYC</span>
            </a>
          </div>
        </body></html>
    "#;

    fn loaded_page() -> StaticPage {
        let mut page = StaticPage::new().unwrap();
        page.document = LISTING_HTML.to_string();
        page
    }

    #[tokio::test]
    async fn query_all_finds_cards_in_document_order() {
        let mut page = loaded_page();
        let cards = page.query_all(None, "a.job-card").await.unwrap();
        assert_eq!(cards.len(), 2);

        let first_title = page.query_one(Some(cards[0]), "h3").await.unwrap().unwrap();
        assert_eq!(page.text(first_title).await.unwrap(), "Backend Engineer");
    }

    #[tokio::test]
    async fn scoped_query_stays_inside_the_scope() {
        let mut page = loaded_page();
        let cards = page.query_all(None, "a.job-card").await.unwrap();

        let location = page
            .query_one(Some(cards[1]), ".job-location")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.text(location).await.unwrap(), "NYC");
    }

    #[tokio::test]
    async fn attribute_reads_the_stored_element_itself() {
        let mut page = loaded_page();
        let cards = page.query_all(None, "a.job-card").await.unwrap();
        let href = page.attribute(cards[0], "href").await.unwrap();
        assert_eq!(href.as_deref(), Some("/jobs/101/"));
    }

    #[tokio::test]
    async fn missing_match_is_none_not_error() {
        let mut page = loaded_page();
        let missing = page.query_one(None, ".does-not-exist").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn scripts_are_inert() {
        let mut page = loaded_page();
        let value = page
            .execute_script("document.body.scrollHeight")
            .await
            .unwrap();
        assert!(value.is_null());
    }
}
