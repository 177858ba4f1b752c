//! Meeting-zone session: current inputs and the current result slot
//!
//! Every input change bumps the generation, publishes the new state and
//! starts a fresh computation. A computation only writes the slot while the
//! slot still carries its own generation, so a late answer for old inputs
//! can never replace the state of newer ones.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::{MeetingZoneEngine, ZoneState};
use crate::error::FailureReason;
use crate::models::{GeoPoint, Location, zone_center};

/// State of the session at one generation
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSnapshot {
    pub generation: u64,
    pub state: ZoneState,
}

pub struct MeetingZoneSession {
    engine: Arc<MeetingZoneEngine>,
    runtime: Handle,
    location_a: Option<Location>,
    location_b: Option<Location>,
    generation: u64,
    slot: Arc<watch::Sender<ZoneSnapshot>>,
    in_flight: Option<JoinHandle<()>>,
}

/// Write `state` only if the slot still belongs to `generation`
fn commit(slot: &watch::Sender<ZoneSnapshot>, generation: u64, state: ZoneState) -> bool {
    slot.send_if_modified(|snapshot| {
        if snapshot.generation != generation {
            return false;
        }
        snapshot.state = state;
        true
    })
}

impl MeetingZoneSession {
    /// Computations are spawned on `runtime`, so inputs may be set from
    /// threads outside it
    pub fn new(engine: Arc<MeetingZoneEngine>, runtime: Handle) -> Self {
        let (slot, _) = watch::channel(ZoneSnapshot {
            generation: 0,
            state: ZoneState::Idle,
        });
        Self {
            engine,
            runtime,
            location_a: None,
            location_b: None,
            generation: 0,
            slot: Arc::new(slot),
            in_flight: None,
        }
    }

    pub fn set_location_a(&mut self, location: Option<Location>) {
        if self.location_a != location {
            self.location_a = location;
            self.restart();
        }
    }

    pub fn set_location_b(&mut self, location: Option<Location>) {
        if self.location_b != location {
            self.location_b = location;
            self.restart();
        }
    }

    /// Replace both inputs as one change
    pub fn set_locations(&mut self, a: Option<Location>, b: Option<Location>) {
        if self.location_a != a || self.location_b != b {
            self.location_a = a;
            self.location_b = b;
            self.restart();
        }
    }

    pub fn clear(&mut self) {
        self.set_locations(None, None);
    }

    #[must_use]
    pub fn location_a(&self) -> Option<&Location> {
        self.location_a.as_ref()
    }

    #[must_use]
    pub fn location_b(&self) -> Option<&Location> {
        self.location_b.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Receiver that sees every committed state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ZoneSnapshot> {
        self.slot.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> ZoneSnapshot {
        self.slot.borrow().clone()
    }

    /// Map center for the current inputs and result
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        let snapshot = self.slot.borrow();
        if let Some(result) = snapshot.state.result() {
            return result.center;
        }
        zone_center(
            None,
            self.location_a.as_ref(),
            self.location_b.as_ref(),
            self.engine.settings().fallback_center,
        )
    }

    fn restart(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.generation += 1;
        let generation = self.generation;

        let (Some(a), Some(b)) = (self.location_a.clone(), self.location_b.clone()) else {
            debug!("Generation {} is idle", generation);
            self.slot.send_replace(ZoneSnapshot {
                generation,
                state: ZoneState::Idle,
            });
            return;
        };

        info!(
            "Generation {}: computing zone between '{}' and '{}'",
            generation, a.display_name, b.display_name
        );
        self.slot.send_replace(ZoneSnapshot {
            generation,
            state: ZoneState::AwaitingTravelTime,
        });

        let engine = self.engine.clone();
        let slot = self.slot.clone();
        self.in_flight = Some(self.runtime.spawn(async move {
            let report = |state: ZoneState| {
                commit(&slot, generation, state);
            };
            let state = match engine.compute_with_progress(&a, &b, &report).await {
                Ok(result) => ZoneState::Settled(Arc::new(result)),
                Err(e) => ZoneState::Failed(FailureReason::from(&e)),
            };
            if !commit(&slot, generation, state) {
                debug!("Discarded stale result of generation {}", generation);
            }
        }));
    }
}

impl Drop for MeetingZoneSession {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
