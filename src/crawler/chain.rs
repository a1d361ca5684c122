//! Selector chain resolution.
//!
//! Every field lookup in the crawler goes through [`resolve`]: an ordered
//! list of candidate selectors tried until one yields a usable value. This
//! is the single mechanism that tolerates markup drift; nothing in the
//! engine queries a lone hardcoded selector.

use std::time::Duration;

use tracing::trace;

use crate::models::SelectorChain;

use super::page::{ElementHandle, PageDriver};

/// What to pull out of a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// Rendered text content, trimmed.
    Text,
    /// A named attribute's value.
    Attribute(String),
    /// Inner markup, for description capture.
    InnerHtml,
}

/// Try each selector in `chain` against `scope` until one yields a
/// non-empty value.
///
/// A present-but-empty element is a miss, as is a query error or timeout;
/// the chain simply moves on. `None` means the whole chain was exhausted.
/// Selectors after the first success are never evaluated.
pub async fn resolve(
    driver: &mut dyn PageDriver,
    scope: Option<ElementHandle>,
    chain: &SelectorChain,
    mode: &Extract,
    per_query_timeout: Duration,
) -> Option<String> {
    for selector in chain.iter() {
        let element =
            match tokio::time::timeout(per_query_timeout, driver.query_one(scope, selector)).await
            {
                Ok(Ok(Some(element))) => element,
                Ok(Ok(None)) => {
                    trace!("selector {:?} matched nothing", selector);
                    continue;
                }
                Ok(Err(e)) => {
                    trace!("selector {:?} query failed: {}", selector, e);
                    continue;
                }
                Err(_) => {
                    trace!("selector {:?} query timed out", selector);
                    continue;
                }
            };

        let value = match mode {
            Extract::Text => driver.text(element).await.ok(),
            Extract::Attribute(name) => driver.attribute(element, name).await.ok().flatten(),
            Extract::InnerHtml => driver.inner_html(element).await.ok(),
        };

        if let Some(value) = value {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                trace!("selector {:?} resolved", selector);
                return Some(trimmed.to_string());
            }
        }
        trace!("selector {:?} yielded an empty value", selector);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeCard, FakeDoc, FakePage};
    use super::*;

    fn timeout() -> Duration {
        Duration::from_millis(200)
    }

    #[tokio::test]
    async fn first_match_short_circuits_rest_of_chain() {
        let mut page = FakePage::single_page(FakeDoc {
            cards: vec![FakeCard::titled("Engineer")],
            ..FakeDoc::ready()
        });
        let card = page.card_handle(0);

        let chain = SelectorChain::new([".missing-one", ".title", ".never-tried"]);
        let value = resolve(&mut page, Some(card), &chain, &Extract::Text, timeout()).await;

        assert_eq!(value.as_deref(), Some("Engineer"));
        assert_eq!(page.query_count(".missing-one"), 1);
        assert_eq!(page.query_count(".title"), 1);
        assert_eq!(page.query_count(".never-tried"), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_returns_none() {
        let mut page = FakePage::single_page(FakeDoc {
            cards: vec![FakeCard::default()],
            ..FakeDoc::ready()
        });
        let card = page.card_handle(0);

        let chain = SelectorChain::new([".a", ".b"]);
        let value = resolve(&mut page, Some(card), &chain, &Extract::Text, timeout()).await;

        assert_eq!(value, None);
        assert_eq!(page.query_count(".a"), 1);
        assert_eq!(page.query_count(".b"), 1);
    }

    #[tokio::test]
    async fn present_but_empty_element_is_a_miss() {
        let mut page = FakePage::single_page(FakeDoc {
            cards: vec![FakeCard {
                title: Some("   ".to_string()),
                location: Some("Cupertino".to_string()),
                ..FakeCard::default()
            }],
            ..FakeDoc::ready()
        });
        let card = page.card_handle(0);

        // .title matches but is whitespace-only, so the chain moves on.
        let chain = SelectorChain::new([".title", ".loc"]);
        let value = resolve(&mut page, Some(card), &chain, &Extract::Text, timeout()).await;

        assert_eq!(value.as_deref(), Some("Cupertino"));
        assert_eq!(page.query_count(".loc"), 1);
    }

    #[tokio::test]
    async fn attribute_mode_reads_attribute() {
        let mut page = FakePage::single_page(FakeDoc {
            cards: vec![FakeCard {
                href: Some("/jobs/123".to_string()),
                ..FakeCard::default()
            }],
            ..FakeDoc::ready()
        });
        let card = page.card_handle(0);

        let chain = SelectorChain::new(["a"]);
        let value = resolve(
            &mut page,
            Some(card),
            &chain,
            &Extract::Attribute("href".to_string()),
            timeout(),
        )
        .await;

        assert_eq!(value.as_deref(), Some("/jobs/123"));
    }
}
