//! Action scoring capability
//!
//! The decision engine asks "given this state and candidate action, how
//! promising is it?" and receives a value in [0, 1]. The answer comes
//! from the aggregate statistics table, or, when configured, from an
//! external learned scorer over HTTP. The engine never needs to know
//! which; learned failures quietly fall back to the statistical path.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::error::{GameError, Result};
use crate::stats::store::StatsHandle;

/// Features describing one candidate action
#[derive(Debug, Clone, Serialize)]
pub struct ActionFeatures {
    pub card_id: String,
    /// 1.0 when the cycle is defensive, 0.0 for an offensive push
    pub defensive: f32,
    pub own_base_health: f32,
    pub target_base_health: f32,
    pub elixir_fraction: f32,
    pub threat_count: usize,
}

/// HTTP client for the external learned scorer
pub struct ScorerClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f32,
}

impl ScorerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// POST the features, expect `{"score": s}` with s in [0, 1]
    pub async fn score(&self, features: &ActionFeatures) -> Result<f32> {
        let response = self
            .client
            .post(&self.url)
            .json(features)
            .send()
            .await
            .map_err(|e| GameError::Scorer(e.to_string()))?;
        let body: ScoreResponse = response
            .json()
            .await
            .map_err(|e| GameError::Scorer(e.to_string()))?;
        Ok(body.score.clamp(0.0, 1.0))
    }
}

/// Where scores come from
pub enum ScoreSource {
    /// Historical win rates from the aggregate statistics table
    Statistical(Arc<StatsHandle>),
    /// External learned scorer, statistical fallback on any error
    Learned {
        client: ScorerClient,
        fallback: Arc<StatsHandle>,
    },
}

impl ScoreSource {
    pub fn statistical(stats: Arc<StatsHandle>) -> Self {
        Self::Statistical(stats)
    }

    pub fn learned(url: impl Into<String>, fallback: Arc<StatsHandle>) -> Self {
        Self::Learned {
            client: ScorerClient::new(url),
            fallback,
        }
    }

    /// Score a candidate action in [0, 1]
    pub async fn score(&self, features: &ActionFeatures) -> f32 {
        match self {
            Self::Statistical(stats) => stats.card_win_rate(&features.card_id),
            Self::Learned { client, fallback } => match client.score(features).await {
                Ok(score) => score,
                Err(e) => {
                    tracing::debug!(error = %e, "learned scorer unavailable, using statistics");
                    fallback.card_win_rate(&features.card_id)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::store::{MatchSummary, MemoryStore};

    fn stats_with_history() -> Arc<StatsHandle> {
        let handle = StatsHandle::load(Box::new(MemoryStore::default())).unwrap();
        handle.record_match(
            &["knight".into()],
            MatchSummary {
                winner: Some("bot".into()),
                turns: 10,
                bot_won: true,
                strategy: "baseline".into(),
                ended_at_unix: 0,
            },
        );
        Arc::new(handle)
    }

    fn features(card: &str) -> ActionFeatures {
        ActionFeatures {
            card_id: card.into(),
            defensive: 0.0,
            own_base_health: 1.0,
            target_base_health: 1.0,
            elixir_fraction: 0.5,
            threat_count: 0,
        }
    }

    #[tokio::test]
    async fn test_statistical_source_uses_win_rates() {
        let source = ScoreSource::statistical(stats_with_history());
        assert_eq!(source.score(&features("knight")).await, 1.0);
        assert_eq!(source.score(&features("tesla")).await, 0.5);
    }

    #[tokio::test]
    async fn test_learned_source_falls_back_on_error() {
        // Nothing is listening here; every call fails over to statistics
        let source = ScoreSource::learned("http://127.0.0.1:1/score", stats_with_history());
        assert_eq!(source.score(&features("knight")).await, 1.0);
    }
}
