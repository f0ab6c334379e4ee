//! Pair selection
//!
//! Every cycle the selector refreshes balances, keeps the active markets
//! whose base currency we hold, scores each of them and returns the best.
//! Ties go to the first pair seen: only a strictly greater score replaces
//! the current leader, and the leader starts at negative infinity, so a
//! pass where nothing could be scored selects nothing.

use tracing::{debug, info};

use crate::gateway::{ExchangeGateway, GatewayResult};
use crate::scorer::PairScorer;
use crate::thresholds::RsiThresholds;
use crate::types::{Balances, Market, Pair};

/// One balance-eligible pair, alive for a single selection pass
#[derive(Debug, Clone, PartialEq)]
pub struct PairCandidate {
    pub market: Market,
    /// Base currency balance
    pub balance: f64,
    pub score: f64,
}

/// Result of a selection pass
#[derive(Debug, Clone)]
pub struct Selection {
    pub pair: Option<Pair>,
    pub balances: Balances,
    pub candidates: Vec<PairCandidate>,
}

#[derive(Debug, Clone, Default)]
pub struct PairSelector {
    scorer: PairScorer,
}

impl PairSelector {
    pub fn new(scorer: PairScorer) -> Self {
        Self { scorer }
    }

    /// Active markets whose base currency has a positive balance, in
    /// listing order
    pub fn eligible_markets(markets: &[Market], balances: &Balances) -> Vec<Market> {
        markets
            .iter()
            .filter(|m| m.active && balances.has_positive(&m.base))
            .cloned()
            .collect()
    }

    /// Index of the strictly highest score; earlier entries win ties
    pub fn pick_best(scores: &[f64]) -> Option<usize> {
        let mut best: Option<usize> = None;
        let mut best_score = f64::NEG_INFINITY;
        for (i, &score) in scores.iter().enumerate() {
            if score > best_score {
                best_score = score;
                best = Some(i);
            }
        }
        best
    }

    /// Refresh balances and markets from the gateway and list the candidates
    /// without scoring them
    pub async fn candidates<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> GatewayResult<(Balances, Vec<PairCandidate>)> {
        let balances = gateway.fetch_balance().await?;
        let markets = gateway.load_markets().await?;

        let candidates = Self::eligible_markets(&markets, &balances)
            .into_iter()
            .map(|market| PairCandidate {
                balance: balances.get(&market.base),
                market,
                score: f64::NEG_INFINITY,
            })
            .collect();

        Ok((balances, candidates))
    }

    pub async fn select<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        thresholds: RsiThresholds,
    ) -> GatewayResult<Selection> {
        let (balances, mut candidates) = self.candidates(gateway).await?;
        info!("Balances: {}", balances);

        for candidate in candidates.iter_mut() {
            candidate.score = self
                .scorer
                .score_or_exclude(gateway, &candidate.market.pair, thresholds)
                .await;
            debug!(
                "Candidate {} (balance {}): score {}",
                candidate.market.pair, candidate.balance, candidate.score
            );
        }

        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        let pair = Self::pick_best(&scores).map(|i| candidates[i].market.pair.clone());

        match &pair {
            Some(p) => info!("Selected pair: {}", p),
            None => info!("No pair selected ({} candidates)", candidates.len()),
        }

        Ok(Selection {
            pair,
            balances,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(pair: &str, base: &str, active: bool) -> Market {
        Market {
            pair: Pair::new(pair),
            base: base.into(),
            quote: "USD".into(),
            active,
        }
    }

    #[test]
    fn test_eligible_markets_need_active_and_balance() {
        let markets = vec![
            market("BTC-USD", "BTC", true),
            market("ETH-USD", "ETH", true),
            market("SOL-USD", "SOL", false),
            market("BTC-EUR", "BTC", true),
        ];
        let balances = Balances::from_entries(vec![("BTC", 1.0), ("SOL", 4.0), ("ETH", 0.0)]);

        let eligible = PairSelector::eligible_markets(&markets, &balances);
        let ids: Vec<&str> = eligible.iter().map(|m| m.pair.as_str()).collect();
        assert_eq!(ids, vec!["BTC-USD", "BTC-EUR"]);
    }

    #[test]
    fn test_pick_best_first_wins_ties() {
        assert_eq!(PairSelector::pick_best(&[1.0, 3.0, 3.0, 2.0]), Some(1));
    }

    #[test]
    fn test_pick_best_skips_unscorable() {
        assert_eq!(PairSelector::pick_best(&[f64::NEG_INFINITY, -5.0]), Some(1));
    }

    #[test]
    fn test_pick_best_nothing_scorable() {
        assert_eq!(PairSelector::pick_best(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), None);
        assert_eq!(PairSelector::pick_best(&[]), None);
    }
}
