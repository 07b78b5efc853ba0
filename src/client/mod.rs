//! The client side of the service: the degrading fallback chain the
//! static site drives from the browser, expressed as an explicit,
//! testable orchestration.
//!
//! Tier 1 is the remote recording protocol, tier 2 a public counter API
//! that only carries the total, tier 3 client-local storage that needs
//! no network and therefore always succeeds. A session marker bounds
//! duplicate counting to once per 30-minute window.

pub mod counter_api;
pub mod geo;
pub mod local;
pub mod session;

pub use counter_api::CounterApi;
pub use geo::{GeoClient, ResolvedCountry};
pub use local::LocalStats;
pub use session::{SessionState, REVISIT_WINDOW_MS};

use crate::config::ClientConfig;
use crate::model::{VisitEvent, VisitorAggregate};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Which fallback level ended up serving a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Remote,
    CounterApi,
    LocalOnly,
}

#[derive(Debug)]
pub struct VisitOutcome {
    pub tier: Tier,
    /// False when the session marker suppressed recording and only a
    /// read was performed.
    pub recorded: bool,
    pub stats: VisitorAggregate,
}

pub struct VisitTracker {
    http: reqwest::Client,
    track_endpoint: String,
    geo: GeoClient,
    counter: CounterApi,
    local: LocalStats,
    session_path: PathBuf,
}

impl VisitTracker {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("building HTTP client")?;
        let state_dir = PathBuf::from(&config.state_dir);

        Ok(Self {
            geo: GeoClient::new(http.clone(), &config.geo_api_url),
            counter: CounterApi::new(
                http.clone(),
                &config.counter_api_url,
                &config.counter_namespace,
                &config.counter_key,
            ),
            local: LocalStats::new(state_dir.join("local-stats.json")),
            session_path: state_dir.join("session.json"),
            track_endpoint: config.track_endpoint.clone(),
            http,
        })
    }

    /// Decide whether this visit should be counted, then record it
    /// through the first tier that works. Suppressed visits degrade to a
    /// pure read of the last known aggregate.
    pub async fn visit(&self, now_ms: i64) -> VisitOutcome {
        let mut session = SessionState::load(&self.session_path).await;

        if !session.should_record(now_ms) {
            let mut outcome = self.current().await;
            outcome.recorded = false;
            return outcome;
        }

        // A failed geolocation lookup still counts the visit, under the
        // unknown sentinel; only the local-only tier may refine that
        // from the process locale.
        let resolved = self.geo.resolve().await;
        let event = match &resolved {
            Some(country) => VisitEvent::new(&country.name, &country.code, &country.flag),
            None => VisitEvent::default(),
        };

        // Each tier is attempted at most once; the marker is set after
        // the attempt regardless of which tier served it.
        let outcome = match self.post_remote(&event).await {
            Ok(stats) => VisitOutcome {
                tier: Tier::Remote,
                recorded: true,
                stats,
            },
            Err(e) => {
                warn!("Remote tracking unavailable, falling back: {e:#}");
                self.fallback_record(&event, resolved.is_none()).await
            }
        };

        session.mark(now_ms);
        if let Err(e) = session.save(&self.session_path).await {
            warn!("Could not save session marker: {e:#}");
        }
        outcome
    }

    /// Display-only read, walking the same tiers without mutating any
    /// of them.
    pub async fn current(&self) -> VisitOutcome {
        match self.fetch_remote().await {
            Ok(stats) => {
                return VisitOutcome {
                    tier: Tier::Remote,
                    recorded: false,
                    stats,
                }
            }
            Err(e) => info!("Loading stats from fallback sources: {e:#}"),
        }

        match self.counter.read().await {
            Ok(total) => {
                let local = self.local.load().await;
                return VisitOutcome {
                    tier: Tier::CounterApi,
                    recorded: false,
                    stats: VisitorAggregate {
                        total_visitors: total,
                        countries: local.countries,
                    },
                };
            }
            Err(e) => info!("Counter API unavailable: {e:#}"),
        }

        VisitOutcome {
            tier: Tier::LocalOnly,
            recorded: false,
            stats: self.local.load().await,
        }
    }

    async fn fallback_record(&self, event: &VisitEvent, geo_failed: bool) -> VisitOutcome {
        match self.counter.hit().await {
            Ok(total) => {
                let countries = self.local.record_country(event).await;
                VisitOutcome {
                    tier: Tier::CounterApi,
                    recorded: true,
                    stats: VisitorAggregate {
                        total_visitors: total,
                        countries,
                    },
                }
            }
            Err(e) => {
                warn!("Counter API unavailable, counting locally only: {e:#}");
                let event = if geo_failed {
                    geo::locale_event()
                } else {
                    event.clone()
                };
                VisitOutcome {
                    tier: Tier::LocalOnly,
                    recorded: true,
                    stats: self.local.record(&event).await,
                }
            }
        }
    }

    async fn post_remote(&self, event: &VisitEvent) -> Result<VisitorAggregate> {
        let response = self
            .http
            .post(&self.track_endpoint)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn fetch_remote(&self) -> Result<VisitorAggregate> {
        let response = self
            .http
            .get(&self.track_endpoint)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
