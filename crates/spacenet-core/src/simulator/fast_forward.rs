//! Partial runs up to a target event.
//!
//! Planning tools ask "what does the scenario look like just before this
//! event?" without running the whole campaign. [`FastForward`] drives the
//! shared loop until the head of the queue reaches a target time and
//! priority, then runs one last demand cycle so that consumption up to the
//! target is accounted for.
//!
//! With `reset = false` successive calls continue from where the previous
//! one stopped, which makes incremental lookahead cheap.

use super::{RunState, SimulationError, Simulator};
use crate::event::{Event, EventKind};
use crate::scenario::Scenario;

/// A simulator that stops short of a target.
#[derive(Debug)]
pub struct FastForward {
    sim: Simulator,
}

impl FastForward {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            sim: Simulator::new(scenario),
        }
    }

    pub fn from_simulator(sim: Simulator) -> Self {
        Self { sim }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    pub fn into_simulator(self) -> Simulator {
        self.sim
    }

    /// Whether the head of the queue should still run for this target.
    ///
    /// Events strictly before `time` always run. At exactly `time`, mission
    /// events run and other events run only below `priority`.
    fn head_runs(&self, time: f64, priority: i32) -> bool {
        let Some(head) = self.sim.next_event() else {
            return false;
        };
        if head.time > time {
            return false;
        }
        head.time < time || matches!(head.kind, EventKind::Mission(_)) || head.priority < priority
    }

    /// Run every event ordered before `(time, priority)`, then settle the
    /// clock at `time`.
    pub fn run_to(&mut self, time: f64, priority: i32, reset: bool) -> Result<(), SimulationError> {
        if reset || self.sim.state() == RunState::Initialized {
            self.sim.initialize()?;
        }
        tracing::debug!(time, priority, reset, "fast-forwarding");
        while self.head_runs(time, priority) {
            if !self.sim.advance()? {
                break;
            }
            self.sim.handle_demands()?;
            self.sim.execute();
        }
        self.sim.settle_at(time)?;
        if self.sim.next_event().is_none() {
            self.sim.finish();
        }
        Ok(())
    }

    /// Run the whole scenario.
    pub fn run_all(&mut self) -> Result<(), SimulationError> {
        self.run_to(f64::INFINITY, i32::MAX, true)
    }

    /// Run up to, but not including, `event`.
    pub fn run_to_event(&mut self, event: &Event) -> Result<(), SimulationError> {
        self.run_to(event.time, event.priority, true)
    }

    /// Run every event up to and including `time`.
    pub fn run_to_time(&mut self, time: f64) -> Result<(), SimulationError> {
        self.run_to(time, i32::MAX, true)
    }
}
