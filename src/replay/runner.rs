use serde::Serialize;

use crate::controller::{Controller, ControllerSnapshot, SharedController};
use crate::message::MessageFactory;
use crate::replay::{HistoryRecorder, HistoryTable, ReplayError};
use crate::track::TrackSource;
use crate::transport::{Channel, DeliveryStats, Transport, TransportMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum ReplayState {
    Initializing,
    AwaitingFirstSample,
    Ticking,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub history: HistoryTable,
    /// Sample index current at each tick, parallel to the history rows.
    pub selected: Vec<usize>,
    pub deliveries: usize,
    /// Crossed samples skipped because a newer one was crossed in the same tick.
    pub dropped: usize,
    pub mode: TransportMode,
    pub stats: DeliveryStats,
}

/// Replays a track against a controller in simulated camera time.
///
/// Tick `k` sits at `t0 + k * tick`. On each tick the newest sample at or
/// before that time is delivered if it is newer than the current one, then
/// the controller updates its pointing once and its state is recorded.
pub struct ReplayLoop<'a, T, C> {
    track: &'a TrackSource,
    factory: &'a MessageFactory,
    transport: T,
    controller: SharedController<C>,
    tick: f64,
    state: ReplayState,
    index: usize,
    ticks: u64,
    history: HistoryRecorder,
    selected: Vec<usize>,
    deliveries: usize,
    dropped: usize,
}

impl<'a, T: Transport, C: Controller> ReplayLoop<'a, T, C> {
    pub fn new(
        track: &'a TrackSource,
        factory: &'a MessageFactory,
        transport: T,
        controller: SharedController<C>,
        tick: f64,
    ) -> Result<Self, ReplayError> {
        if !tick.is_finite() || tick <= 0.0 {
            return Err(ReplayError::InvalidTick(tick));
        }
        Ok(Self {
            track,
            factory,
            transport,
            controller,
            tick,
            state: ReplayState::Initializing,
            index: 0,
            ticks: 0,
            history: HistoryRecorder::new(),
            selected: Vec::new(),
            deliveries: 0,
            dropped: 0,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn sim_time(&self) -> f64 {
        sim_time(self.track, self.tick, self.ticks)
    }

    /// Deliver configuration, orientation and the first object. Any failure
    /// here aborts the run.
    pub fn initialize(&mut self) -> Result<(), ReplayError> {
        self.require_state(ReplayState::Initializing)?;
        log::info!(
            "Initializing replay of {} ({} samples) over {} transport",
            self.track.id(),
            self.track.len(),
            self.transport.mode()
        );

        let config = self.factory.config_envelope()?;
        self.transport.deliver(Channel::Config, &config)?;

        let orientation = self.factory.orientation_envelope()?;
        self.transport.deliver(Channel::Orientation, &orientation)?;

        let object = self.factory.object_envelope(self.track.first())?;
        self.transport.deliver(Channel::Object, &object)?;

        self.deliveries += 3;
        self.state = ReplayState::AwaitingFirstSample;
        Ok(())
    }

    /// Record the bootstrap snapshot at the first sample's timestamp.
    pub fn start(&mut self) -> Result<(), ReplayError> {
        self.require_state(ReplayState::AwaitingFirstSample)?;
        let snapshot = self.read_snapshot(false)?;
        self.history.record(self.sim_time(), snapshot);
        self.selected.push(self.index);
        self.state = self.next_state();
        Ok(())
    }

    /// Advance one tick.
    pub fn step(&mut self) -> Result<ReplayState, ReplayError> {
        self.require_state(ReplayState::Ticking)?;
        self.ticks += 1;
        let now = self.sim_time();

        if now >= self.track.samples()[self.index + 1].timestamp {
            let next = self.track.latest_at_or_before(self.index + 1, now);
            let skipped = next - self.index - 1;
            if skipped > 0 {
                self.dropped += skipped;
                log::warn!(
                    "t={:.3}: {} crossed sample(s) dropped, delivering sample {}",
                    now,
                    skipped,
                    next
                );
            }
            log::debug!("t={:.3}: selecting sample {}", now, next);
            self.index = next;

            let envelope = self.factory.object_envelope(&self.track.samples()[next])?;
            match self.transport.deliver(Channel::Object, &envelope) {
                Ok(()) => self.deliveries += 1,
                Err(e) => log::warn!("t={:.3}: delivery of sample {} failed: {}", now, next, e),
            }
        }

        let snapshot = self.read_snapshot(true)?;
        self.history.record(now, snapshot);
        self.selected.push(self.index);
        self.state = self.next_state();
        Ok(self.state)
    }

    /// Drive the loop from its current state to termination.
    pub fn run(mut self) -> Result<ReplayOutcome, ReplayError> {
        if self.state == ReplayState::Initializing {
            self.initialize()?;
        }
        if self.state == ReplayState::AwaitingFirstSample {
            self.start()?;
        }
        while self.state == ReplayState::Ticking {
            self.step()?;
        }
        self.finish()
    }

    pub fn finish(self) -> Result<ReplayOutcome, ReplayError> {
        self.require_state(ReplayState::Terminated)?;
        let history = self.history.finalize()?;
        log::info!(
            "Replay of {} finished: {} ticks, {} deliveries, {} dropped",
            self.track.id(),
            history.len(),
            self.deliveries,
            self.dropped
        );
        Ok(ReplayOutcome {
            history,
            selected: self.selected,
            deliveries: self.deliveries,
            dropped: self.dropped,
            mode: self.transport.mode(),
            stats: self.transport.stats(),
        })
    }

    fn read_snapshot(&self, update: bool) -> Result<ControllerSnapshot, ReplayError> {
        let mut controller = self
            .controller
            .lock()
            .map_err(|_| ReplayError::ControllerPoisoned)?;
        if update {
            controller.update_pointing();
        }
        Ok(controller.snapshot())
    }

    fn next_state(&self) -> ReplayState {
        if self.index >= self.track.last_index() {
            ReplayState::Terminated
        } else {
            ReplayState::Ticking
        }
    }

    fn require_state(&self, expected: ReplayState) -> Result<(), ReplayError> {
        if self.state != expected {
            return Err(ReplayError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

fn sim_time(track: &TrackSource, tick: f64, ticks: u64) -> f64 {
    track.first().timestamp + ticks as f64 * tick
}

/// Number of history rows a replay of `track` at `tick` will produce,
/// bootstrap row included.
pub fn expected_ticks(track: &TrackSource, tick: f64) -> Result<usize, ReplayError> {
    if !tick.is_finite() || tick <= 0.0 {
        return Err(ReplayError::InvalidTick(tick));
    }
    let samples = track.samples();
    let mut index = 0;
    let mut ticks = 0u64;
    while index < track.last_index() {
        ticks += 1;
        let now = sim_time(track, tick, ticks);
        if now >= samples[index + 1].timestamp {
            index = track.latest_at_or_before(index + 1, now);
        }
    }
    Ok(ticks as usize + 1)
}
