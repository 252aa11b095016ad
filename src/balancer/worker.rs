use crate::balancer::engine::RebalanceEngine;
use crate::dex::state::PoolStateReader;
use crate::errors::RebalanceError;
use crate::models::{PriceEvent, RebalanceDecision};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Event together with what the engine made of it.
#[derive(Debug)]
pub struct DecisionOutcome {
    pub event: PriceEvent,
    pub result: Result<RebalanceDecision, RebalanceError>,
}

/// Single owner of the decision pipeline for one (main, target) pool pair.
///
/// Events are taken one at a time and the next one is only received after
/// the current decision finished, so reads for one target pool never
/// interleave across decisions.
pub struct PairWorker<R> {
    engine: RebalanceEngine<R>,
    events: mpsc::Receiver<PriceEvent>,
    outcomes: mpsc::Sender<DecisionOutcome>,
}

/// Channels and task of a spawned `PairWorker`.
pub struct PairHandle {
    pub events: mpsc::Sender<PriceEvent>,
    pub outcomes: mpsc::Receiver<DecisionOutcome>,
    pub task: tokio::task::JoinHandle<()>,
}

impl<R: PoolStateReader> PairWorker<R> {
    pub fn new(
        engine: RebalanceEngine<R>,
        events: mpsc::Receiver<PriceEvent>,
        outcomes: mpsc::Sender<DecisionOutcome>,
    ) -> Self {
        Self {
            engine,
            events,
            outcomes,
        }
    }

    /// Runs until the event sender or the outcome receiver goes away.
    pub async fn run(mut self) {
        let mut processed: u64 = 0;
        while let Some(event) = self.events.recv().await {
            let started = Instant::now();
            let result = self.engine.on_price_event(&event).await;
            processed += 1;
            debug!(
                processed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "[BALANCE] decision finished"
            );
            if self
                .outcomes
                .send(DecisionOutcome { event, result })
                .await
                .is_err()
            {
                info!("[BALANCE] outcome receiver closed");
                break;
            }
        }
        info!(processed, "[BALANCE] pair worker stopped");
    }
}

/// Spawns a worker with bounded channels of `buffer` slots each.
pub fn spawn_pair_worker<R>(engine: RebalanceEngine<R>, buffer: usize) -> PairHandle
where
    R: PoolStateReader + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(buffer);
    let (outcome_tx, outcome_rx) = mpsc::channel(buffer);
    let task = tokio::spawn(PairWorker::new(engine, event_rx, outcome_tx).run());
    PairHandle {
        events: event_tx,
        outcomes: outcome_rx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::testing::{MockPool, pair, sqrt_q96};
    use crate::models::TokenSide;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn event(sqrt: u64, block: u64) -> PriceEvent {
        PriceEvent {
            sqrt_price_x96: sqrt_q96(sqrt),
            tick: 0,
            block_number: Some(block),
        }
    }

    #[tokio::test]
    async fn decisions_are_sequential_and_ordered() {
        let pool = Arc::new(
            MockPool::new(sqrt_q96(2), 0, 10)
                .with_liquidity(Some(100))
                .at_block(10)
                .with_delay(Duration::from_millis(20)),
        );
        let engine = RebalanceEngine::new(pool.clone(), pair(18, 18));
        let PairHandle {
            events,
            mut outcomes,
            task,
        } = spawn_pair_worker(engine, 8);

        let sent = vec![event(1, 1), event(2, 2), event(3, 3), event(1, 4), event(4, 5)];
        for ev in &sent {
            events.send(ev.clone()).await.unwrap();
        }
        drop(events);

        let mut received = Vec::new();
        while let Some(outcome) = outcomes.recv().await {
            received.push(outcome);
        }
        task.await.unwrap();

        assert_eq!(
            received.iter().map(|o| o.event.clone()).collect::<Vec<_>>(),
            sent
        );
        assert_eq!(pool.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(pool.snapshot_reads.load(Ordering::SeqCst), sent.len());

        let sides: Vec<Option<TokenSide>> = received
            .iter()
            .map(|o| o.result.as_ref().unwrap().trade().map(|t| t.token_to_sell))
            .collect();
        assert_eq!(
            sides,
            vec![
                Some(TokenSide::Token0),
                None,
                Some(TokenSide::Token1),
                Some(TokenSide::Token0),
                Some(TokenSide::Token1),
            ]
        );
    }

    #[tokio::test]
    async fn failures_are_forwarded_and_do_not_stop_the_worker() {
        let pool = MockPool::new(sqrt_q96(2), 0, 10).with_liquidity(Some(1));
        let engine = RebalanceEngine::new(pool, pair(18, 18));
        let mut handle = spawn_pair_worker(engine, 4);

        let mut bad = event(1, 1);
        bad.sqrt_price_x96 = alloy_primitives::U256::ZERO;
        handle.events.send(bad).await.unwrap();
        handle.events.send(event(2, 2)).await.unwrap();

        let first = handle.outcomes.recv().await.unwrap();
        assert!(matches!(
            first.result,
            Err(RebalanceError::InvalidSqrtPrice { .. })
        ));
        let second = handle.outcomes.recv().await.unwrap();
        assert!(second.result.unwrap().is_parity());
    }

    #[tokio::test]
    async fn worker_stops_when_outcomes_are_dropped() {
        let pool = MockPool::new(sqrt_q96(2), 0, 10).with_liquidity(Some(1));
        let engine = RebalanceEngine::new(pool, pair(18, 18));
        let PairHandle {
            events,
            outcomes,
            task,
        } = spawn_pair_worker(engine, 1);
        drop(outcomes);

        events.send(event(1, 1)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
