use anyhow::{Context, Result};
use url::Url;

pub const SITE_ORIGIN: &str = "https://www.finn.no";
const CAR_SEARCH_PATH: &str = "/mobility/search/car";

/// Filter criteria for the car search. Multi-valued filters become repeated
/// query parameters, in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub dealer_segments: Vec<String>,
    pub fuels: Vec<String>,
    pub locations: Vec<String>,
    pub makes: Vec<String>,
    pub mileage_to: Option<u32>,
    pub price_to: Option<u32>,
    pub transmission: Option<String>,
    pub year_from: Option<u16>,
}

impl Default for SearchQuery {
    /// Private and dealer ads, petrol/hybrid, two Oslo-area locations, three
    /// makes, automatic, 2017 or newer, under 130 000 km and 200 000 kr.
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            dealer_segments: owned(&["2", "1"]),
            fuels: owned(&["1", "6", "1352"]),
            locations: owned(&["0.20015", "0.20016"]),
            makes: owned(&["0.813", "0.817", "0.777"]),
            mileage_to: Some(130_000),
            price_to: Some(200_000),
            transmission: Some("2".to_string()),
            year_from: Some(2017),
        }
    }
}

impl SearchQuery {
    pub fn to_url(&self) -> Result<Url> {
        let mut url = Url::parse(SITE_ORIGIN)
            .and_then(|u| u.join(CAR_SEARCH_PATH))
            .context("build search base url")?;

        let mut qp: Vec<(&str, String)> = vec![];
        qp.extend(self.dealer_segments.iter().map(|v| ("dealer_segment", v.clone())));
        qp.extend(self.fuels.iter().map(|v| ("fuel", v.clone())));
        qp.extend(self.locations.iter().map(|v| ("location", v.clone())));
        qp.extend(self.makes.iter().map(|v| ("make", v.clone())));
        if let Some(v) = self.mileage_to {
            qp.push(("mileage_to", v.to_string()));
        }
        if let Some(v) = self.price_to {
            qp.push(("price_to", v.to_string()));
        }
        if let Some(v) = &self.transmission {
            qp.push(("transmission", v.clone()));
        }
        if let Some(v) = self.year_from {
            qp.push(("year_from", v.to_string()));
        }

        url.query_pairs_mut()
            .clear()
            .extend_pairs(qp.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }
}

/// Origin (`scheme://host[:port]`) of an arbitrary search URL, for link
/// resolution and cookie warm-up.
pub fn origin_of(url: &Url) -> Result<Url> {
    url.host_str().context("search url has no host")?;
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    let _ = origin.set_username("");
    let _ = origin.set_password(None);
    Ok(origin)
}
