//! Field extraction from raw listing text.
//!
//! Every extractor is pure and falls back to a fixed sentinel when the field
//! can't be found. Only the identifier and the price report absence as `None`,
//! since a listing without either is rejected upstream.

use regex::Regex;
use std::sync::LazyLock;

pub const UNSPECIFIED_YEAR: &str = "unspecified year";
pub const UNSPECIFIED_MILEAGE: &str = "unspecified mileage";
pub const UNSPECIFIED_WARRANTY: &str = "unspecified";

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2}|19\d{2})\b").expect("year pattern"));

// digits, optionally grouped by plain or non-breaking spaces, then the unit
static MILEAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d \t\u{00A0}\u{202F}]*)\s*km\b").expect("mileage pattern")
});

static WARRANTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:mnd\.?\s*garanti|months?\s+warranty)").expect("warranty pattern")
});

static ITEM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/mobility/item/(\d+)").expect("item id pattern"));

// -------------------------
// Extractors
// -------------------------

pub fn extract_year(text: &str) -> String {
    YEAR_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNSPECIFIED_YEAR.to_string())
}

pub fn extract_mileage(text: &str) -> String {
    MILEAGE_RE
        .captures(text)
        .and_then(|caps| parse_grouped_number(&caps[1]))
        .map(|km| format!("{} km", group_thousands(km)))
        .unwrap_or_else(|| UNSPECIFIED_MILEAGE.to_string())
}

/// Normalizes a price such as `"189 000,-"` into `"189 000 kr"`.
///
/// Every non-digit is dropped before parsing, so currency suffixes and the
/// trailing `,-` never matter. Returns `None` when no digits remain.
pub fn extract_price(text: &str) -> Option<String> {
    parse_grouped_number(text).map(|kr| format!("{} kr", group_thousands(kr)))
}

pub fn extract_warranty(text: &str) -> String {
    WARRANTY_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|months| format!("{months} months"))
        .unwrap_or_else(|| UNSPECIFIED_WARRANTY.to_string())
}

pub fn extract_id(link: &str) -> Option<String> {
    ITEM_ID_RE.captures(link).map(|caps| caps[1].to_string())
}

// -------------------------
// Number helpers
// -------------------------

fn parse_grouped_number(s: &str) -> Option<u64> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Renders `n` with a single space between groups of three digits.
pub fn group_thousands(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_picks_first_plausible_token() {
        assert_eq!(extract_year("2019 · 45 000 km"), "2019");
        assert_eq!(extract_year("Modell 1998, reg. 2001"), "1998");
        assert_eq!(extract_year("12345 km"), UNSPECIFIED_YEAR);
        assert_eq!(extract_year("2150"), UNSPECIFIED_YEAR);
        assert_eq!(extract_year(""), UNSPECIFIED_YEAR);
    }

    #[test]
    fn mileage_is_regrouped() {
        assert_eq!(extract_mileage("12 345 km"), "12 345 km");
        assert_eq!(extract_mileage("2019 · 45 000 km"), "45 000 km");
        assert_eq!(extract_mileage("2020 · 7\u{00A0}500 km"), "7 500 km");
        assert_eq!(extract_mileage("123456km"), "123 456 km");
    }

    #[test]
    fn mileage_without_digits_is_unspecified() {
        assert_eq!(extract_mileage("km"), UNSPECIFIED_MILEAGE);
        assert_eq!(extract_mileage("2019 · Bensin"), UNSPECIFIED_MILEAGE);
    }

    #[test]
    fn price_drops_everything_but_digits() {
        assert_eq!(extract_price("189 000,-").as_deref(), Some("189 000 kr"));
        assert_eq!(extract_price("95\u{00A0}500 kr").as_deref(), Some("95 500 kr"));
        assert_eq!(extract_price("999").as_deref(), Some("999 kr"));
        assert_eq!(extract_price("Solgt"), None);
        assert_eq!(extract_price(""), None);
    }

    #[test]
    fn warranty_accepts_norwegian_and_english_phrases() {
        assert_eq!(extract_warranty("12 mnd garanti"), "12 months");
        assert_eq!(extract_warranty("Bruktbilgaranti · 24 MND GARANTI"), "24 months");
        assert_eq!(extract_warranty("6 months warranty"), "6 months");
        assert_eq!(extract_warranty("Garanti"), UNSPECIFIED_WARRANTY);
    }

    #[test]
    fn id_comes_from_item_path() {
        assert_eq!(
            extract_id("https://www.finn.no/mobility/item/123456?ref=search").as_deref(),
            Some("123456")
        );
        assert_eq!(extract_id("/mobility/item/42").as_deref(), Some("42"));
        assert_eq!(extract_id("https://www.finn.no/mobility/item/abc"), None);
        assert_eq!(extract_id("https://www.finn.no/realestate/homes/ad.html?finnkode=1"), None);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1 000");
        assert_eq!(group_thousands(1234567), "1 234 567");
    }
}
