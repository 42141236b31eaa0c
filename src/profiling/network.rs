use crate::error::{AnimationError, AnimationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkClass {
    Offline,
    CellularSlow,
    CellularFast,
    Wifi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Unstable,
    Poor,
}

/// Link type reported by the platform connectivity listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    None,
    Cellular,
    Wifi,
    Wired,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub class: NetworkClass,
    /// Mean round trip of recent successful probes
    pub latency_ms: f64,
    pub stability: Stability,
}

impl NetworkProfile {
    pub fn offline() -> Self {
        Self {
            class: NetworkClass::Offline,
            latency_ms: 0.0,
            stability: Stability::Poor,
        }
    }

    /// Offline or poor links force minimal preloading
    pub fn is_degraded(&self) -> bool {
        self.class == NetworkClass::Offline || self.stability == Stability::Poor
    }
}

/// Measures one round trip
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    async fn probe(&self) -> AnimationResult<Duration>;
}

/// Times a HEAD request against a fixed endpoint
#[derive(Debug, Clone)]
pub struct HttpLatencyProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpLatencyProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AnimationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnimationError::ProfilerUnavailable {
                reason: format!("failed to build probe client: {}", e),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl LatencyProbe for HttpLatencyProbe {
    async fn probe(&self) -> AnimationResult<Duration> {
        let start = Instant::now();
        self.client
            .head(&self.url)
            .send()
            .await
            .map_err(|e| AnimationError::ProfilerUnavailable {
                reason: format!("probe to {} failed: {}", self.url, e),
            })?;
        Ok(start.elapsed())
    }
}

/// Probe settings for `NetworkProfiler`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePlan {
    pub history_len: usize,
    pub probes_per_assessment: usize,
    pub probe_timeout: Duration,
    /// Cellular links faster than this are classed as fast
    pub cellular_fast_ms: u64,
}

impl Default for ProbePlan {
    fn default() -> Self {
        Self {
            history_len: 5,
            probes_per_assessment: 3,
            probe_timeout: Duration::from_secs(2),
            cellular_fast_ms: 150,
        }
    }
}

#[derive(Debug, Default)]
struct ProbeHistory {
    link: Option<LinkKind>,
    /// `None` marks a failed or timed out probe
    samples: VecDeque<Option<f64>>,
}

pub struct NetworkProfiler {
    probe: Arc<dyn LatencyProbe>,
    plan: ProbePlan,
    history: Mutex<ProbeHistory>,
}

impl std::fmt::Debug for NetworkProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkProfiler")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl NetworkProfiler {
    pub fn new(probe: Arc<dyn LatencyProbe>, plan: ProbePlan) -> Self {
        Self {
            probe,
            plan,
            history: Mutex::new(ProbeHistory::default()),
        }
    }

    /// Re-run on every network change. History is reset when the link kind changes.
    pub async fn assess(&self, link: LinkKind) -> NetworkProfile {
        if link == LinkKind::None {
            self.reset(Some(link));
            info!("Network offline");
            return NetworkProfile::offline();
        }

        let mut results = Vec::with_capacity(self.plan.probes_per_assessment);
        for _ in 0..self.plan.probes_per_assessment {
            let sample = match tokio::time::timeout(self.plan.probe_timeout, self.probe.probe()).await {
                Ok(Ok(rtt)) => Some(rtt.as_secs_f64() * 1000.0),
                Ok(Err(e)) => {
                    debug!("Latency probe failed: {}", e);
                    None
                }
                Err(_) => {
                    debug!("Latency probe timed out after {:?}", self.plan.probe_timeout);
                    None
                }
            };
            results.push(sample);
        }

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.link != Some(link) {
            history.samples.clear();
            history.link = Some(link);
        }
        for sample in results {
            if history.samples.len() == self.plan.history_len.max(1) {
                history.samples.pop_front();
            }
            history.samples.push_back(sample);
        }

        let profile = self.classify(link, &history.samples);
        info!(
            "Network assessed: {:?} {:.0}ms {:?}",
            profile.class, profile.latency_ms, profile.stability
        );
        profile
    }

    fn reset(&self, link: Option<LinkKind>) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.samples.clear();
        history.link = link;
    }

    fn classify(&self, link: LinkKind, samples: &VecDeque<Option<f64>>) -> NetworkProfile {
        let successes: Vec<f64> = samples.iter().flatten().copied().collect();
        if successes.is_empty() {
            warn!("No latency probe succeeded on {:?} link, treating as offline", link);
            return NetworkProfile::offline();
        }

        let failure_ratio = 1.0 - successes.len() as f64 / samples.len() as f64;
        let mean = successes.iter().sum::<f64>() / successes.len() as f64;
        let variance = successes.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / successes.len() as f64;
        let variation = if mean > 0.0 { variance.sqrt() / mean } else { 0.0 };

        let stability = if failure_ratio > 0.3 || variation > 0.5 {
            Stability::Poor
        } else if failure_ratio > 0.0 || variation > 0.2 {
            Stability::Unstable
        } else {
            Stability::Stable
        };

        let class = match link {
            LinkKind::Wifi | LinkKind::Wired => NetworkClass::Wifi,
            LinkKind::Cellular if mean < self.plan.cellular_fast_ms as f64 => NetworkClass::CellularFast,
            LinkKind::Cellular => NetworkClass::CellularSlow,
            LinkKind::None => NetworkClass::Offline,
        };

        NetworkProfile {
            class,
            latency_ms: mean,
            stability,
        }
    }
}
