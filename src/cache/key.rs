//! Cache-key construction and TTL selection for dashboard responses.
//!
//! Keys look like `{prefix}:dashboard:v1:{scope}:{metric}:{digest}`. The
//! scope segment stays readable so a whole scope can be dropped with a
//! `SCAN MATCH`; request parameters are folded into a short digest.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::services::date_range::{DateRange, NormalizedRange};
use crate::services::scope::Scope;

/// Bumped when payload shapes change so stale entries are never decoded.
const KEY_VERSION: &str = "v1";

/// Hex characters of the parameter digest kept in the key.
const DIGEST_LEN: usize = 16;

/// The dashboard payload a key caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Stats,
    Trends,
    Priorities,
    Team,
    Departments,
    Tags,
    Workspaces,
    Projects,
}

/// How quickly a metric's underlying data is expected to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlTier {
    Live,
    Standard,
    Extended,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Trends => "trends",
            Self::Priorities => "priorities",
            Self::Team => "team",
            Self::Departments => "departments",
            Self::Tags => "tags",
            Self::Workspaces => "workspaces",
            Self::Projects => "projects",
        }
    }

    pub fn tier(&self) -> TtlTier {
        match self {
            Self::Stats | Self::Priorities => TtlTier::Live,
            Self::Trends | Self::Team | Self::Workspaces | Self::Projects => TtlTier::Standard,
            Self::Departments | Self::Tags => TtlTier::Extended,
        }
    }
}

/// Namespace shared by every dashboard key under `prefix`.
fn namespace(prefix: &str) -> String {
    format!("{prefix}:dashboard:{KEY_VERSION}")
}

/// Canonical form of the normalized request parameters. Extra parameters
/// are sorted by name so their order in the request never matters.
pub fn canonical_params(params: &NormalizedRange, extra: &[(&str, String)]) -> String {
    let mut out = format!(
        "start={};end={};granularity={}",
        params.range.start,
        params.range.end,
        params.granularity.as_str()
    );
    let mut extra: Vec<&(&str, String)> = extra.iter().collect();
    extra.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in extra {
        out.push_str(&format!(";{name}={value}"));
    }
    out
}

fn digest(canonical: &str) -> String {
    let hash = Sha256::digest(canonical.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(DIGEST_LEN);
    hex
}

/// Full cache key for one dashboard response.
pub fn dashboard_key(
    prefix: &str,
    scope: &Scope,
    metric: Metric,
    params: &NormalizedRange,
    extra: &[(&str, String)],
) -> String {
    format!(
        "{}:{}:{}:{}",
        namespace(prefix),
        scope.cache_segment(),
        metric.as_str(),
        digest(&canonical_params(params, extra))
    )
}

/// `SCAN MATCH` pattern for every key of one scope segment.
pub fn scope_pattern(prefix: &str, segment: &str) -> String {
    format!("{}:{segment}:*", namespace(prefix))
}

/// `SCAN MATCH` pattern for every dashboard key.
pub fn all_pattern(prefix: &str) -> String {
    format!("{}:*", namespace(prefix))
}

/// Seconds a response may live in the cache.
///
/// Ranges that ended before today only change when old tasks are edited,
/// so they get the historical TTL when it is longer than the metric's tier.
pub fn ttl_for(metric: Metric, range: &DateRange, today: NaiveDate, config: &CacheConfig) -> u64 {
    let tier = match metric.tier() {
        TtlTier::Live => config.ttl_live_secs,
        TtlTier::Standard => config.ttl_standard_secs,
        TtlTier::Extended => config.ttl_extended_secs,
    };
    let ttl = if range.is_historical(today) {
        tier.max(config.ttl_historical_secs)
    } else {
        tier
    };
    ttl.max(1)
}
