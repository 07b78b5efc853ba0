use crate::model::{
    country_flag, VisitEvent, UNKNOWN_COUNTRY_CODE, UNKNOWN_COUNTRY_NAME,
};
use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

/// Country details resolved for one visit.
#[derive(Debug, Clone)]
pub struct ResolvedCountry {
    pub name: String,
    pub code: String,
    pub flag: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    country_name: Option<String>,
    country_code: Option<String>,
}

/// One geolocation lookup per attempted (non-suppressed) visit.
pub struct GeoClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GeoClient {
    pub fn new(http: reqwest::Client, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    /// `None` means the lookup itself failed; the visit is then counted
    /// under the unknown sentinel, never abandoned.
    pub async fn resolve(&self) -> Option<ResolvedCountry> {
        match self.lookup().await {
            Ok(geo) => {
                let code = geo
                    .country_code
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_COUNTRY_CODE.to_string());
                let name = geo
                    .country_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_COUNTRY_NAME.to_string());
                Some(ResolvedCountry {
                    flag: country_flag(&code),
                    name,
                    code,
                })
            }
            Err(e) => {
                warn!("Geolocation lookup failed, counting as unknown: {e:#}");
                None
            }
        }
    }

    async fn lookup(&self) -> Result<GeoResponse> {
        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Local-only fallback event: when geolocation failed and no tier with
/// its own notion of the visitor's country is reachable, the country
/// code may be inferred from the process locale. Name stays "Unknown".
pub fn locale_event() -> VisitEvent {
    let code = std::env::var("LANG")
        .ok()
        .and_then(|lang| country_from_locale(&lang))
        .unwrap_or_else(|| UNKNOWN_COUNTRY_CODE.to_string());
    VisitEvent::new(UNKNOWN_COUNTRY_NAME, &code, &country_flag(&code))
}

/// Extract the region from a locale string like `en_US.UTF-8` or `en-GB`.
pub fn country_from_locale(locale: &str) -> Option<String> {
    let tag = locale.split('.').next()?;
    let region = tag.split(['_', '-']).nth(1)?;
    if region.len() == 2 && region.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(region.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_region_extraction() {
        assert_eq!(country_from_locale("en_US.UTF-8"), Some("US".to_string()));
        assert_eq!(country_from_locale("en-GB"), Some("GB".to_string()));
        assert_eq!(country_from_locale("fr_FR"), Some("FR".to_string()));
        assert_eq!(country_from_locale("C"), None);
        assert_eq!(country_from_locale("POSIX"), None);
        assert_eq!(country_from_locale(""), None);
    }
}
