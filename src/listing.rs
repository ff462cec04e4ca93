use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

use crate::extract::{extract_id, extract_mileage, extract_price, extract_warranty, extract_year};

pub const UNNAMED_TITLE: &str = "unnamed";

/// One advertisement from the search results page.
///
/// `id` and `price` are always real values; the remaining text fields may hold
/// the sentinels from [`crate::extract`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub year: String,
    pub price: String,
    pub mileage: String,
    pub warranty: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("fragment has no /mobility/item/ link")]
    NoItemLink,
    #[error("item link has no numeric identifier")]
    NoIdentifier,
    #[error("title is on the denylist: {title}")]
    Excluded { title: String },
    #[error("listing has no price")]
    NoPrice,
}

// -------------------------
// Selectors
// -------------------------

static ARTICLE: LazyLock<Selector> = LazyLock::new(|| sel("article"));
static ITEM_LINK: LazyLock<Selector> = LazyLock::new(|| sel("a[href*='/mobility/item/']"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("h2, h3, h4"));
static CAPTION: LazyLock<Selector> = LazyLock::new(|| sel("span.text-caption.font-bold"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| sel("span.t3.font-bold"));
static DETAIL: LazyLock<Selector> = LazyLock::new(|| sel("div.text-detail span.truncate"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

// -------------------------
// Builder
// -------------------------

/// Builds a [`Listing`] from one `<article>` fragment of the results page.
///
/// Missing caption, price or detail nodes degrade to empty text. Only a missing
/// identifier, a denylisted title or a missing price reject the fragment.
pub fn build_listing(fragment: &ElementRef, base: &Url) -> Result<Listing, Rejection> {
    let href = fragment
        .select(&ITEM_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or(Rejection::NoItemLink)?;

    let link = base
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string());

    let id = extract_id(&link).ok_or(Rejection::NoIdentifier)?;

    let title = text_of(fragment, &TITLE).unwrap_or_else(|| UNNAMED_TITLE.to_string());
    if is_excluded(&title) {
        return Err(Rejection::Excluded { title });
    }

    let caption = text_of(fragment, &CAPTION).unwrap_or_default();
    let year = extract_year(&caption);
    let mileage = extract_mileage(&caption);

    let price_text = text_of(fragment, &PRICE).unwrap_or_default();
    let price = extract_price(&price_text).ok_or(Rejection::NoPrice)?;

    let detail = text_of(fragment, &DETAIL).unwrap_or_default();
    let warranty = extract_warranty(&detail);

    Ok(Listing {
        id,
        title,
        year,
        price,
        mileage,
        warranty,
        link,
    })
}

/// Fixed title denylist: any Toyota Yaris, and ads already marked as sold.
pub fn is_excluded(title: &str) -> bool {
    if title.contains("Yaris") {
        return true;
    }
    let lower = title.to_lowercase();
    lower.contains("solgt") || lower.contains("sold")
}

fn text_of(scope: &ElementRef, selector: &Selector) -> Option<String> {
    let el = scope.select(selector).next()?;
    let text = el.text().collect::<String>();
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

// -------------------------
// Page level
// -------------------------

#[derive(Debug, Default)]
pub struct PageListings {
    pub listings: Vec<Listing>,
    pub fragments: usize,
    pub rejected: usize,
}

/// Parses a whole results page and builds every `<article>` in document order.
pub fn collect_listings(html: &str, base: &Url) -> PageListings {
    let doc = Html::parse_document(html);
    let mut page = PageListings::default();

    for article in doc.select(&ARTICLE) {
        page.fragments += 1;
        match build_listing(&article, base) {
            Ok(listing) => page.listings.push(listing),
            Err(reason) => {
                page.rejected += 1;
                tracing::debug!(%reason, "skipping fragment");
            }
        }
    }

    tracing::info!(
        fragments = page.fragments,
        listings = page.listings.len(),
        rejected = page.rejected,
        "parsed search page"
    );
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.finn.no").unwrap()
    }

    fn article(href: &str, title: &str, caption: &str, price: &str, detail: &str) -> String {
        format!(
            r#"<article>
                 <h2><a href="{href}">{title}</a></h2>
                 <span class="text-caption font-bold">{caption}</span>
                 <span class="t3 font-bold">{price}</span>
                 <div class="text-detail"><span class="truncate">{detail}</span></div>
               </article>"#
        )
    }

    fn build(html: &str) -> Result<Listing, Rejection> {
        let doc = Html::parse_fragment(html);
        let node = doc.select(&ARTICLE).next().expect("article in fixture");
        build_listing(&node, &base())
    }

    #[test]
    fn builds_full_listing() {
        let html = article(
            "/mobility/item/123456",
            "2019 Volvo XC60",
            "2019 · 45 000 km",
            "189 000,-",
            "12 mnd garanti",
        );
        let listing = build(&html).unwrap();
        assert_eq!(
            listing,
            Listing {
                id: "123456".into(),
                title: "2019 Volvo XC60".into(),
                year: "2019".into(),
                price: "189 000 kr".into(),
                mileage: "45 000 km".into(),
                warranty: "12 months".into(),
                link: "https://www.finn.no/mobility/item/123456".into(),
            }
        );
    }

    #[test]
    fn absolute_links_are_kept() {
        let html = article(
            "https://www.finn.no/mobility/item/777?q=1",
            "Skoda Octavia",
            "2018 · 90 000 km",
            "150 000 kr",
            "",
        );
        let listing = build(&html).unwrap();
        assert_eq!(listing.link, "https://www.finn.no/mobility/item/777?q=1");
        assert_eq!(listing.id, "777");
        assert_eq!(listing.warranty, "unspecified");
    }

    #[test]
    fn rejects_fragment_without_item_link() {
        let html = r#"<article><h2><a href="/realestate/ad/1">Annonse</a></h2>
            <span class="t3 font-bold">100 000 kr</span></article>"#;
        assert_eq!(build(html), Err(Rejection::NoItemLink));
    }

    #[test]
    fn rejects_item_link_without_digits() {
        let html = article("/mobility/item/new", "Volvo V60", "2020", "200 000 kr", "");
        assert_eq!(build(&html), Err(Rejection::NoIdentifier));
    }

    #[test]
    fn rejects_missing_or_digitless_price() {
        let html = article("/mobility/item/1", "Volvo V60", "2020", "Solgt snart", "");
        assert_eq!(build(&html), Err(Rejection::NoPrice));

        let html = r#"<article><a href="/mobility/item/2">x</a><h3>Volvo V70</h3></article>"#;
        assert_eq!(build(html), Err(Rejection::NoPrice));
    }

    #[test]
    fn denylisted_titles_are_rejected() {
        for title in [
            "Toyota Yaris Hybrid",
            "2018 Yaris",
            "SOLGT Volvo V40",
            "Volvo V40 - Solgt",
            "solgt",
            "Already sold",
        ] {
            let html = article("/mobility/item/5", title, "2020", "100 000 kr", "");
            assert!(
                matches!(build(&html), Err(Rejection::Excluded { .. })),
                "{title} should be excluded"
            );
        }
    }

    #[test]
    fn yaris_match_is_case_sensitive() {
        let html = article("/mobility/item/5", "yaris-lookalike", "2020", "100 000 kr", "");
        assert!(build(&html).is_ok());
    }

    #[test]
    fn missing_sub_nodes_fall_back_to_sentinels() {
        let html = r#"<article>
            <a href="/mobility/item/9"></a>
            <span class="t3 font-bold">50 000 kr</span>
          </article>"#;
        let listing = build(html).unwrap();
        assert_eq!(listing.title, UNNAMED_TITLE);
        assert_eq!(listing.year, "unspecified year");
        assert_eq!(listing.mileage, "unspecified mileage");
        assert_eq!(listing.warranty, "unspecified");
        assert_eq!(listing.price, "50 000 kr");
    }

    #[test]
    fn page_keeps_document_order_and_counts_rejections() {
        let html = format!(
            "<html><body>{}{}{}{}</body></html>",
            article("/mobility/item/3", "Volvo XC40", "2021 · 10 000 km", "300 000 kr", ""),
            article("/mobility/item/4", "Toyota Yaris", "2021", "100 000 kr", ""),
            "<article><p>Annonse</p></article>",
            article("/mobility/item/1", "Volvo V90", "2017 · 120 000 km", "199 000 kr", ""),
        );
        let page = collect_listings(&html, &base());
        assert_eq!(page.fragments, 4);
        assert_eq!(page.rejected, 2);
        let ids: Vec<_> = page.listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["3", "1"]);
    }
}
