//! In-memory page driver for engine tests.
//!
//! `FakePage` interprets a small fixed selector vocabulary against fixture
//! documents, counts every query, and scripts scroll-height responses, so
//! tests can assert on short-circuiting, scroll stabilization, and
//! pagination behavior without a browser.
//!
//! Selector conventions understood by the fake:
//! - `.app-ready` (document): matches when the doc is marked ready
//! - `.card` (document): one match per fixture card
//! - `.title` / `.loc` / `.team` / `.date` (card scope): card fields
//! - `a` (card scope): the card's link, when it has an href
//! - `p, span, div` (card scope): the card's loose text blocks
//! - `.next` (document): the next-page control
//! - `.desc` (document): the detail-page description node
//! - `.consent` (document): a consent button, when configured
//! Anything else matches nothing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{DelayConfig, FieldSelectors, SelectorChain, SiteConfig};

use super::page::{ElementHandle, PageDriver, PageError};

#[derive(Debug, Clone, Default)]
pub struct FakeCard {
    pub title: Option<String>,
    pub location: Option<String>,
    pub team: Option<String>,
    pub date: Option<String>,
    pub href: Option<String>,
    pub text_blocks: Vec<String>,
}

impl FakeCard {
    /// Card with only a title, no link.
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    /// Complete card linking to `/jobs/{id}/`.
    pub fn listing(title: &str, id: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            location: Some("Remote".to_string()),
            team: Some("Platform".to_string()),
            date: Some("Jul 30, 2026".to_string()),
            href: Some(format!("/jobs/{id}/")),
            text_blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeNext {
    pub class: String,
    pub aria_disabled: Option<String>,
    pub disabled_attr: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDoc {
    pub ready: bool,
    pub heights: Vec<i64>,
    pub cards: Vec<FakeCard>,
    pub next: Option<FakeNext>,
    pub description_html: Option<String>,
    pub consent: bool,
}

impl FakeDoc {
    /// Empty but ready document with a stable height.
    pub fn ready() -> Self {
        Self {
            ready: true,
            heights: vec![0],
            ..Self::default()
        }
    }

    /// Ready document holding the given cards and an enabled next control.
    pub fn with_cards(cards: Vec<FakeCard>) -> Self {
        Self {
            cards,
            next: Some(FakeNext::default()),
            ..Self::ready()
        }
    }
}

#[derive(Debug, Clone)]
enum FakeHandle {
    Marker,
    Card(usize),
    Field { card: usize, field: &'static str },
    Link(usize),
    Block { card: usize, idx: usize },
    Next,
    Desc,
    Consent,
}

/// Scripted in-memory [`PageDriver`].
pub struct FakePage {
    pages: HashMap<String, FakeDoc>,
    current: FakeDoc,
    registry: Vec<FakeHandle>,
    height_cursor: usize,
    /// Every selector queried, in order.
    pub queries: Vec<String>,
    /// Scroll-to-bottom script invocations.
    pub scroll_count: u32,
    /// Every URL navigated to, in order.
    pub nav_log: Vec<String>,
    /// URLs whose navigation times out.
    pub timeout_urls: Vec<String>,
    pub click_count: u32,
    pub closed: bool,
}

impl FakePage {
    /// Driver already sitting on the given document.
    pub fn single_page(doc: FakeDoc) -> Self {
        Self {
            pages: HashMap::new(),
            current: doc,
            registry: Vec::new(),
            height_cursor: 0,
            queries: Vec::new(),
            scroll_count: 0,
            nav_log: Vec::new(),
            timeout_urls: Vec::new(),
            click_count: 0,
            closed: false,
        }
    }

    /// Driver serving fixture documents by URL; unknown URLs load an
    /// empty, not-ready document.
    pub fn with_pages<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = (String, FakeDoc)>,
    {
        let mut page = Self::single_page(FakeDoc::default());
        page.pages = pages.into_iter().collect();
        page
    }

    /// Register a handle for card `index` on the current document.
    pub fn card_handle(&mut self, index: usize) -> ElementHandle {
        self.push(FakeHandle::Card(index))
    }

    /// How many times `selector` was queried.
    pub fn query_count(&self, selector: &str) -> usize {
        self.queries.iter().filter(|s| *s == selector).count()
    }

    fn push(&mut self, handle: FakeHandle) -> ElementHandle {
        self.registry.push(handle);
        ElementHandle(self.registry.len() - 1)
    }

    fn handle(&self, element: ElementHandle) -> Result<&FakeHandle, PageError> {
        self.registry
            .get(element.0)
            .ok_or(PageError::StaleHandle(element.0))
    }

    fn card(&self, index: usize) -> Result<&FakeCard, PageError> {
        self.current
            .cards
            .get(index)
            .ok_or(PageError::StaleHandle(index))
    }

    fn matches(&self, scope: Option<&FakeHandle>, selector: &str) -> Vec<FakeHandle> {
        match scope {
            None => match selector {
                ".app-ready" if self.current.ready => vec![FakeHandle::Marker],
                ".card" => (0..self.current.cards.len()).map(FakeHandle::Card).collect(),
                ".next" if self.current.next.is_some() => vec![FakeHandle::Next],
                ".desc" if self.current.description_html.is_some() => vec![FakeHandle::Desc],
                ".consent" if self.current.consent => vec![FakeHandle::Consent],
                _ => Vec::new(),
            },
            Some(FakeHandle::Card(card)) => {
                let index = *card;
                let Ok(card) = self.card(index) else {
                    return Vec::new();
                };
                let field = |value: &Option<String>, name: &'static str| -> Vec<FakeHandle> {
                    if value.is_some() {
                        vec![FakeHandle::Field { card: index, field: name }]
                    } else {
                        Vec::new()
                    }
                };
                match selector {
                    ".title" => field(&card.title, "title"),
                    ".loc" => field(&card.location, "location"),
                    ".team" => field(&card.team, "team"),
                    ".date" => field(&card.date, "date"),
                    "a" if card.href.is_some() => vec![FakeHandle::Link(index)],
                    "p, span, div" => (0..card.text_blocks.len())
                        .map(|idx| FakeHandle::Block { card: index, idx })
                        .collect(),
                    _ => Vec::new(),
                }
            }
            Some(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        self.nav_log.push(url.to_string());
        if self.timeout_urls.iter().any(|u| u == url) {
            return Err(PageError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            });
        }
        self.current = self.pages.get(url).cloned().unwrap_or_default();
        self.registry.clear();
        self.height_cursor = 0;
        Ok(())
    }

    async fn query_all(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, PageError> {
        self.queries.push(selector.to_string());
        let scope = match scope {
            Some(element) => Some(self.handle(element)?.clone()),
            None => None,
        };
        let matches = self.matches(scope.as_ref(), selector);
        Ok(matches.into_iter().map(|h| self.push(h)).collect())
    }

    async fn query_one(
        &mut self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Option<ElementHandle>, PageError> {
        self.queries.push(selector.to_string());
        let scope = match scope {
            Some(element) => Some(self.handle(element)?.clone()),
            None => None,
        };
        let matches = self.matches(scope.as_ref(), selector);
        Ok(matches.into_iter().next().map(|h| self.push(h)))
    }

    async fn text(&mut self, element: ElementHandle) -> Result<String, PageError> {
        match self.handle(element)?.clone() {
            FakeHandle::Field { card, field } => {
                let card = self.card(card)?;
                let value = match field {
                    "title" => &card.title,
                    "location" => &card.location,
                    "team" => &card.team,
                    "date" => &card.date,
                    _ => &None,
                };
                Ok(value.clone().unwrap_or_default())
            }
            FakeHandle::Block { card, idx } => {
                Ok(self.card(card)?.text_blocks.get(idx).cloned().unwrap_or_default())
            }
            _ => Ok(String::new()),
        }
    }

    async fn attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        match self.handle(element)?.clone() {
            FakeHandle::Card(index) | FakeHandle::Link(index) => {
                if name == "href" {
                    Ok(self.card(index)?.href.clone())
                } else {
                    Ok(None)
                }
            }
            FakeHandle::Next => {
                let next = self.current.next.clone().unwrap_or_default();
                Ok(match name {
                    "class" => Some(next.class),
                    "aria-disabled" => next.aria_disabled,
                    "disabled" => next.disabled_attr.then(String::new),
                    _ => None,
                })
            }
            _ => Ok(None),
        }
    }

    async fn inner_html(&mut self, element: ElementHandle) -> Result<String, PageError> {
        match self.handle(element)? {
            FakeHandle::Desc => Ok(self.current.description_html.clone().unwrap_or_default()),
            _ => self.text(element).await,
        }
    }

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, PageError> {
        if script.starts_with("window.scrollTo") {
            self.scroll_count += 1;
            return Ok(serde_json::Value::Null);
        }
        if script.contains("scrollHeight") {
            let heights = &self.current.heights;
            let height = heights
                .get(self.height_cursor.min(heights.len().saturating_sub(1)))
                .copied()
                .unwrap_or(0);
            self.height_cursor += 1;
            return Ok(serde_json::json!(height));
        }
        Ok(serde_json::Value::Null)
    }

    async fn scroll_into_view(&mut self, _element: ElementHandle) -> Result<(), PageError> {
        Ok(())
    }

    async fn click(&mut self, _element: ElementHandle) -> Result<(), PageError> {
        self.click_count += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.closed = true;
        Ok(())
    }
}

/// Site config wired to the fake's selector vocabulary, with all waits
/// zeroed so tests run instantly.
pub fn fake_site() -> SiteConfig {
    SiteConfig {
        company: "faketech".to_string(),
        base_url: "https://careers.fake.test/jobs".to_string(),
        page_url_template: Some("https://careers.fake.test/jobs?page={page}".to_string()),
        ready_probes: SelectorChain::new([".app-ready"]),
        consent_selectors: SelectorChain::default(),
        listing_selectors: SelectorChain::new([".card"]),
        fields: FieldSelectors {
            title: SelectorChain::new([".title"]),
            location: SelectorChain::new([".loc"]),
            team: SelectorChain::new([".team"]),
            date: SelectorChain::new([".date"]),
        },
        link_selectors: SelectorChain::new(["a"]),
        id_pattern: None,
        next_selectors: SelectorChain::new([".next"]),
        disabled_markers: vec!["disabled".to_string()],
        positional_fallback: false,
        detail: None,
        limits: crate::models::CrawlLimits {
            nav_retries: 0,
            ..Default::default()
        },
        delays: DelayConfig {
            nav_timeout_secs: 1,
            settle_ms: 0,
            probe_timeout_secs: 0,
            scroll_settle_ms: 0,
            field_timeout_ms: 200,
            page_delay_min_ms: 0,
            page_delay_max_ms: 0,
            detail_delay_min_ms: 0,
            detail_delay_max_ms: 0,
        },
        use_browser: false,
    }
}
