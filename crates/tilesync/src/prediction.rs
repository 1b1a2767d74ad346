//! Optimistic movement for the locally controlled actor.
//!
//! Local moves advance the predicted tile right away and bump an in-flight
//! counter. Authoritative updates that change the server tile count as one
//! confirmation each. The predicted tile is forced onto the server tile once
//! the counter drains, or when the newest prediction is older than the
//! reconcile timeout.

use crate::geom::{Direction, TilePos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Moves are still in flight; the predicted tile was left alone.
    InFlight,
    /// Nothing was pending and the prediction already matched the server.
    Settled,
    /// The predicted tile was moved onto the authoritative tile.
    Corrected { timed_out: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// The authoritative tile changed, consuming one pending prediction.
    pub confirmed: bool,
    pub outcome: ReconcileOutcome,
}

#[derive(Debug, Clone)]
pub struct PredictionStore {
    predicted: TilePos,
    authoritative: TilePos,
    pending: u32,
    last_prediction_ms: f64,
    timeout_ms: f64,
}

impl PredictionStore {
    pub fn new(tile: TilePos, timeout_ms: f64) -> Self {
        Self {
            predicted: tile,
            authoritative: tile,
            pending: 0,
            last_prediction_ms: 0.0,
            timeout_ms,
        }
    }

    pub fn predicted_tile(&self) -> TilePos {
        self.predicted
    }

    pub fn authoritative_tile(&self) -> TilePos {
        self.authoritative
    }

    pub fn pending_predictions(&self) -> u32 {
        self.pending
    }

    pub fn last_prediction_ms(&self) -> f64 {
        self.last_prediction_ms
    }

    /// Applies `direction` without any legality check.
    pub fn predict_move(&mut self, direction: Direction, now_ms: f64) -> TilePos {
        self.predicted = self.predicted.offset(direction);
        self.pending = self.pending.saturating_add(1);
        self.last_prediction_ms = now_ms;
        self.predicted
    }

    /// Call on every authoritative snapshot, even when the tile is unchanged,
    /// so a stalled prediction still times out.
    pub fn reconcile_server(&mut self, server_tile: TilePos, now_ms: f64) -> Reconciliation {
        let confirmed = server_tile != self.authoritative;
        if confirmed {
            self.authoritative = server_tile;
            self.pending = self.pending.saturating_sub(1);
        }

        let timed_out = self.pending > 0 && now_ms - self.last_prediction_ms > self.timeout_ms;
        if self.pending > 0 && !timed_out {
            return Reconciliation {
                confirmed,
                outcome: ReconcileOutcome::InFlight,
            };
        }

        self.pending = 0;
        let outcome = if self.predicted == self.authoritative {
            ReconcileOutcome::Settled
        } else {
            self.predicted = self.authoritative;
            ReconcileOutcome::Corrected { timed_out }
        };
        Reconciliation { confirmed, outcome }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const TIMEOUT_MS: f64 = 300.0;

    #[test]
    fn confirmed_single_move_settles_without_correction() {
        let mut store = PredictionStore::new(TilePos::new(3, 4), TIMEOUT_MS);
        assert_eq!(store.predict_move(Direction::Right, 1_000.0), TilePos::new(4, 4));
        assert_eq!(store.pending_predictions(), 1);

        let result = store.reconcile_server(TilePos::new(4, 4), 1_010.0);
        assert!(result.confirmed);
        assert_eq!(result.outcome, ReconcileOutcome::Settled);
        assert_eq!(store.predicted_tile(), TilePos::new(4, 4));
        assert_eq!(store.pending_predictions(), 0);
    }

    #[test]
    fn burst_of_predictions_is_trusted_while_in_flight() {
        let mut store = PredictionStore::new(TilePos::new(4, 4), TIMEOUT_MS);
        for step in 0..3 {
            store.predict_move(Direction::Right, 1_000.0 + f64::from(step) * 10.0);
        }
        assert_eq!(store.predicted_tile(), TilePos::new(7, 4));

        let result = store.reconcile_server(TilePos::new(5, 4), 1_050.0);
        assert!(result.confirmed);
        assert_eq!(result.outcome, ReconcileOutcome::InFlight);
        assert_eq!(store.pending_predictions(), 2);
        assert_eq!(store.predicted_tile(), TilePos::new(7, 4));
    }

    #[test]
    fn stalled_predictions_time_out_to_authoritative_tile() {
        let mut store = PredictionStore::new(TilePos::new(4, 4), TIMEOUT_MS);
        for step in 0..3 {
            store.predict_move(Direction::Right, 1_000.0 + f64::from(step) * 10.0);
        }
        store.reconcile_server(TilePos::new(5, 4), 1_050.0);

        let result = store.reconcile_server(TilePos::new(5, 4), 1_020.0 + 350.0);
        assert!(!result.confirmed);
        assert_eq!(result.outcome, ReconcileOutcome::Corrected { timed_out: true });
        assert_eq!(store.predicted_tile(), TilePos::new(5, 4));
        assert_eq!(store.pending_predictions(), 0);
    }

    #[test]
    fn repeated_same_tile_does_not_confirm() {
        let mut store = PredictionStore::new(TilePos::new(0, 0), TIMEOUT_MS);
        store.predict_move(Direction::Down, 0.0);
        store.predict_move(Direction::Down, 10.0);
        for now in [20.0, 40.0, 60.0] {
            let result = store.reconcile_server(TilePos::new(0, 0), now);
            assert!(!result.confirmed);
            assert_eq!(store.pending_predictions(), 2);
        }
    }

    #[test]
    fn timeout_boundary_is_exclusive() {
        let mut store = PredictionStore::new(TilePos::new(0, 0), TIMEOUT_MS);
        store.predict_move(Direction::Left, 100.0);
        let at_limit = store.reconcile_server(TilePos::new(0, 0), 400.0);
        assert_eq!(at_limit.outcome, ReconcileOutcome::InFlight);
        let past_limit = store.reconcile_server(TilePos::new(0, 0), 400.5);
        assert_eq!(past_limit.outcome, ReconcileOutcome::Corrected { timed_out: true });
    }

    #[test]
    fn rejected_move_corrects_only_after_timeout() {
        let mut store = PredictionStore::new(TilePos::new(2, 2), TIMEOUT_MS);
        store.predict_move(Direction::Up, 0.0);
        assert_eq!(
            store.reconcile_server(TilePos::new(2, 2), 150.0).outcome,
            ReconcileOutcome::InFlight
        );
        assert_eq!(store.predicted_tile(), TilePos::new(2, 1));
        store.reconcile_server(TilePos::new(2, 2), 301.0);
        assert_eq!(store.predicted_tile(), TilePos::new(2, 2));
    }

    #[test]
    fn server_drift_without_predictions_is_a_hard_correction() {
        let mut store = PredictionStore::new(TilePos::new(1, 1), TIMEOUT_MS);
        let result = store.reconcile_server(TilePos::new(9, 9), 10.0);
        assert!(result.confirmed);
        assert_eq!(result.outcome, ReconcileOutcome::Corrected { timed_out: false });
        assert_eq!(store.predicted_tile(), TilePos::new(9, 9));
        assert_eq!(store.pending_predictions(), 0);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Predict(Direction),
        Reconcile { dx: i32, dy: i32 },
        Wait(u16),
    }

    fn direction() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ]
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            direction().prop_map(Step::Predict),
            (-1i32..=1, -1i32..=1).prop_map(|(dx, dy)| Step::Reconcile { dx, dy }),
            (0u16..500).prop_map(Step::Wait),
        ]
    }

    proptest! {
        #[test]
        fn pending_counter_tracks_predictions_and_never_underflows(
            steps in proptest::collection::vec(step(), 0..64)
        ) {
            let mut store = PredictionStore::new(TilePos::new(0, 0), TIMEOUT_MS);
            let mut server = TilePos::new(0, 0);
            let mut now = 0.0;
            for step in steps {
                let before = store.pending_predictions();
                match step {
                    Step::Predict(direction) => {
                        store.predict_move(direction, now);
                        prop_assert_eq!(store.pending_predictions(), before + 1);
                    }
                    Step::Reconcile { dx, dy } => {
                        server = TilePos::new(server.x + dx, server.y + dy);
                        store.reconcile_server(server, now);
                        prop_assert!(store.pending_predictions() <= before);
                        if store.pending_predictions() == 0 {
                            prop_assert_eq!(store.predicted_tile(), server);
                        }
                    }
                    Step::Wait(ms) => now += f64::from(ms),
                }
            }
        }

        #[test]
        fn quiet_period_longer_than_timeout_converges(
            steps in proptest::collection::vec(step(), 0..64),
            server_x in -5i32..5,
            server_y in -5i32..5,
        ) {
            let mut store = PredictionStore::new(TilePos::new(0, 0), TIMEOUT_MS);
            let mut now = 0.0;
            for step in steps {
                match step {
                    Step::Predict(direction) => {
                        store.predict_move(direction, now);
                    }
                    Step::Reconcile { dx, dy } => {
                        let tile = store.authoritative_tile();
                        store.reconcile_server(TilePos::new(tile.x + dx, tile.y + dy), now);
                    }
                    Step::Wait(ms) => now += f64::from(ms),
                }
            }

            let server = TilePos::new(server_x, server_y);
            let quiet = store.last_prediction_ms().max(now) + TIMEOUT_MS + 1.0;
            store.reconcile_server(server, quiet);
            store.reconcile_server(server, quiet + TIMEOUT_MS + 1.0);
            prop_assert_eq!(store.predicted_tile(), server);
            prop_assert_eq!(store.authoritative_tile(), server);
            prop_assert_eq!(store.pending_predictions(), 0);
        }
    }
}
