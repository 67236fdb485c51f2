//! The discrete-event simulator.
//!
//! # Control loop
//!
//! Every run works on a private clone of the caller's [`Scenario`]:
//!
//! 1. **Initialize** -- validate the source scenario, clone it, clear the
//!    queue and logs, and schedule one mission event per mission.
//! 2. **Advance** -- pop the earliest event, compute the time elapsed since
//!    the previous event, and move the clock.
//! 3. **Demand cycle** -- every live element generates demand for the
//!    elapsed time; the demand is discretized, optionally repaired, and
//!    applied against inventory. A popped mission event also schedules its
//!    mission-level demand at the end of transit.
//! 4. **Execute** -- apply the event. Failures are logged, never raised.
//!
//! The demand cycle runs before execution because consumption depends on
//! the time spent in the state that held *before* the event.
//!
//! The variants in [`fast_forward`], [`history`], [`supply`] and [`moe`]
//! own a [`Simulator`] and drive the same steps with extra bookkeeping.

mod execute;
pub mod fast_forward;
pub mod history;
pub mod moe;
pub mod report;
pub mod supply;

pub use fast_forward::FastForward;
pub use history::{SimStateRecord, StateHistory};
pub use moe::{MoeCollector, MoeCrewTime, MoeReport, CrewTimeCategory};
pub use report::{RunReport, ReportError, fingerprint};
pub use supply::{SupplyAggregator, SupplyEdge, SupplyGap, SupplyPoint};

use crate::config::RunOptions;
use crate::demand::DemandSet;
use crate::discretize::Discretizer;
use crate::event::{Event, EventKind};
use crate::id::{ElementId, MissionId};
use crate::log::SimLog;
use crate::mission::MissionWindow;
use crate::model::ModelError;
use crate::network::Location;
use crate::queue::EventQueue;
use crate::scenario::{Scenario, ScenarioError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a run could not complete. Shortfalls and misplaced elements are
/// not among them: those are logged in the [`SimLog`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("run cancelled at day {time:.3}")]
    Cancelled { time: f64 },
}

// ---------------------------------------------------------------------------
// Run state and cancellation
// ---------------------------------------------------------------------------

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Initialized,
    Running,
    Complete,
    Cancelled,
}

/// Cooperative cancellation flag, checked before each event is popped.
///
/// Clones share the flag, so one clone can be handed to another thread
/// while the run holds the other.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// The shared event loop. Run it directly with [`Simulator::simulate`] for
/// a plain full run, or through one of the variants.
#[derive(Debug)]
pub struct Simulator {
    /// The caller's scenario. Never mutated by a run.
    source: Scenario,
    /// Working clone of `source` for the current run.
    scenario: Scenario,
    queue: EventQueue,
    clock: f64,
    /// Days elapsed between the previous event and the current one.
    duration: f64,
    current: Option<Event>,
    log: SimLog,
    discretizer: Discretizer,
    mission_order: Vec<MissionId>,
    windows: Vec<MissionWindow>,
    options: RunOptions,
    /// Elements dropped from a stack by staging during a transport.
    staged: BTreeSet<ElementId>,
    state: RunState,
    cancel: CancelToken,
    events_executed: u64,
}

impl Simulator {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            discretizer: Discretizer::new(&scenario.config),
            scenario: scenario.clone(),
            source: scenario,
            queue: EventQueue::new(),
            clock: 0.0,
            duration: 0.0,
            current: None,
            log: SimLog::new(),
            mission_order: Vec::new(),
            windows: Vec::new(),
            options: RunOptions::default(),
            staged: BTreeSet::new(),
            state: RunState::Initialized,
            cancel: CancelToken::new(),
            events_executed: 0,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The scenario the simulator was built from.
    pub fn source(&self) -> &Scenario {
        &self.source
    }

    /// The working scenario as of the current clock.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn current_event(&self) -> Option<&Event> {
        self.current.as_ref()
    }

    pub fn next_event(&self) -> Option<&Event> {
        self.queue.peek()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn events_executed(&self) -> u64 {
        self.events_executed
    }

    pub fn log(&self) -> &SimLog {
        &self.log
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn options_mut(&mut self) -> &mut RunOptions {
        &mut self.options
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Active interval of every mission of the current run.
    pub fn mission_windows(&self) -> &[MissionWindow] {
        &self.windows
    }

    // -----------------------------------------------------------------------
    // Loop steps
    // -----------------------------------------------------------------------

    /// Start a fresh run from the source scenario.
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        self.source.validate()?;
        self.scenario = self.source.clone();
        self.queue.clear();
        self.log.clear();
        self.discretizer = Discretizer::new(&self.scenario.config);
        self.staged.clear();
        self.clock = 0.0;
        self.duration = 0.0;
        self.current = None;
        self.events_executed = 0;
        self.mission_order = self.scenario.mission_order();
        self.windows = self.scenario.mission_windows();
        for id in self.mission_order.clone() {
            let mission = &self.scenario.missions[id];
            let event = Event::new(mission.name.clone(), mission.start, EventKind::Mission(id));
            self.schedule(event);
        }
        self.state = RunState::Running;
        tracing::info!(
            scenario = %self.scenario.name,
            missions = self.mission_order.len(),
            elements = self.scenario.elements.len(),
            "simulation initialized"
        );
        Ok(())
    }

    /// Queue an event. Its time is rounded to the time precision and never
    /// placed before the clock.
    pub fn schedule(&mut self, mut event: Event) {
        event.time = self.scenario.config.round_time(event.time).max(self.clock);
        self.queue.push(event);
    }

    /// Pop the next event and move the clock to it. Returns `false` once the
    /// queue is empty.
    pub fn advance(&mut self) -> Result<bool, SimulationError> {
        if self.cancel.is_cancelled() {
            self.state = RunState::Cancelled;
            tracing::info!(time = self.clock, "simulation cancelled");
            return Err(SimulationError::Cancelled { time: self.clock });
        }
        let Some(event) = self.queue.pop() else {
            self.current = None;
            return Ok(false);
        };
        self.duration = event.time - self.clock;
        self.clock = event.time;
        self.current = Some(event);
        Ok(true)
    }

    /// Run the demand cycle for the time elapsed since the previous event.
    pub fn handle_demands(&mut self) -> Result<(), SimulationError> {
        if self.duration > 0.0 {
            tracing::trace!(time = self.clock, duration = self.duration, "demand cycle");
            let live: Vec<ElementId> = self.scenario.live_elements().collect();
            for id in live {
                self.element_demand_cycle(id)?;
            }
        }
        if let Some(EventKind::Mission(mission)) = self.current.as_ref().map(|e| &e.kind) {
            self.schedule_mission_demand(*mission)?;
        }
        Ok(())
    }

    fn element_demand_cycle(&mut self, id: ElementId) -> Result<(), SimulationError> {
        let location = self.scenario.location_of(id);
        let Some(element) = self.scenario.elements.get_mut(id) else {
            return Ok(());
        };
        let name = element.name.clone();
        let raw = element
            .generate_demands(self.duration)
            .map_err(|source| ScenarioError::Model {
                owner: name.clone(),
                source,
            })?;
        let mut demands = self
            .discretizer
            .discretize(raw, Some(id), location, &self.scenario.config);
        if self.options.items_repaired {
            let repairs = self
                .scenario
                .repair_demands(&self.windows, self.clock, id, &mut demands);
            self.log.repairs.extend(repairs);
        }
        if demands.is_empty() {
            return Ok(());
        }
        let event = Event {
            time: self.clock,
            priority: 0,
            location,
            name: format!("Demand Event for {name}"),
            kind: EventKind::Demand {
                element: Some(id),
                demands,
            },
        };
        if let Err(error) = self.execute_event(&event) {
            self.log.record(error);
        }
        Ok(())
    }

    fn schedule_mission_demand(&mut self, id: MissionId) -> Result<(), SimulationError> {
        let timing = self.scenario.mission_timing_in(id, &self.mission_order);
        let profile = timing.profile();
        let Some(mission) = self.scenario.missions.get_mut(id) else {
            return Ok(());
        };
        let name = mission.name.clone();
        let destination = mission.destination.map(Location::Node);
        let raw = mission
            .generate_demands(timing.duration, &profile)
            .map_err(|source| ScenarioError::Model {
                owner: name.clone(),
                source,
            })?;
        let demands: DemandSet =
            self.discretizer
                .discretize(raw, None, destination, &self.scenario.config);
        if demands.is_empty() {
            return Ok(());
        }
        let event = Event {
            time: self.clock + timing.transit_duration,
            priority: i32::MAX,
            location: destination,
            name: format!("Demand Event for {name}"),
            kind: EventKind::Demand {
                element: None,
                demands,
            },
        };
        self.schedule(event);
        Ok(())
    }

    /// Execute the current event, logging any failure.
    pub fn execute(&mut self) {
        let Some(event) = self.current.clone() else {
            return;
        };
        tracing::debug!(time = self.clock, event = %event, "executing event");
        if let Err(error) = self.execute_event(&event) {
            self.log.record(error);
        }
        self.events_executed += 1;
    }

    /// Bring the clock to `time` and run a final demand cycle without
    /// executing an event.
    pub(crate) fn settle_at(&mut self, time: f64) -> Result<(), SimulationError> {
        self.current = None;
        if time.is_finite() && time > self.clock {
            self.duration = time - self.clock;
            self.clock = time;
            self.handle_demands()?;
        }
        Ok(())
    }

    pub(crate) fn finish(&mut self) {
        self.state = RunState::Complete;
        tracing::info!(
            scenario = %self.scenario.name,
            time = self.clock,
            events = self.events_executed,
            unmet_demands = self.log.unsatisfied_demands.len(),
            spatial_errors = self.log.spatial_errors.len(),
            warnings = self.log.warnings.len(),
            "simulation complete"
        );
    }

    /// Run the whole scenario to completion.
    pub fn simulate(&mut self) -> Result<&SimLog, SimulationError> {
        self.initialize()?;
        while self.advance()? {
            self.handle_demands()?;
            self.execute();
        }
        self.finish();
        Ok(&self.log)
    }

    /// Summary of the finished run.
    pub fn report(&self) -> RunReport {
        RunReport::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::cos::ClassOfSupply;
    use crate::demand::Demand;
    use crate::element::{Element, ElementKind, State, StateType};
    use crate::mission::Mission;
    use crate::model::{DemandModel, RatedDemandModel};
    use crate::network::{Body, Node};
    use crate::resource::Resource;
    use tracing_test::traced_test;

    fn hungry_outpost() -> Scenario {
        let mut scenario = Scenario::new("Outpost", SimConfig::default());
        let base = scenario.network.add_node(Node::surface("Base", Body::Moon));
        let food = Resource::generic(ClassOfSupply::COS202);
        let hab = scenario.add_element(
            Element::new("Hab", ElementKind::Basic).with_state(
                State::new("Active", StateType::Active).with_model(DemandModel::Rated(
                    RatedDemandModel::new(vec![Demand::new(food, 2.0)].into()),
                )),
            ),
        );
        let mission = Mission::new("Deploy", 0.0)
            .with_event(
                Event::new(
                    "Create Hab",
                    0.0,
                    EventKind::Create {
                        container: None,
                        elements: vec![hab],
                    },
                )
                .at(base),
            )
            .with_event(
                Event::new(
                    "Check",
                    10.0,
                    EventKind::ReconfigureGroup {
                        elements: vec![hab],
                        state_type: StateType::Active,
                    },
                )
                .at(base),
            );
        scenario.add_mission(mission);
        scenario
    }

    #[test]
    fn full_run_logs_unmet_demand_without_aborting() {
        let mut sim = Simulator::new(hungry_outpost());
        let log = sim.simulate().unwrap();
        assert_eq!(log.unsatisfied_demands.len(), 1);
        let unmet = &log.unsatisfied_demands[0];
        assert_eq!(unmet.time, 10.0);
        assert_eq!(
            unmet
                .demands
                .amount_of(&Resource::generic(ClassOfSupply::COS202)),
            20.0
        );
        assert_eq!(sim.state(), RunState::Complete);
        assert_eq!(sim.clock(), 10.0);
    }

    #[test]
    fn source_scenario_is_untouched() {
        let scenario = hungry_outpost();
        let mut sim = Simulator::new(scenario);
        sim.simulate().unwrap();
        assert_eq!(sim.source().live_elements().count(), 0);
        assert_eq!(sim.scenario().live_elements().count(), 1);
    }

    #[test]
    fn rerun_starts_from_scratch() {
        let mut sim = Simulator::new(hungry_outpost());
        let first = sim.simulate().unwrap().clone();
        let second = sim.simulate().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_run_reports_clock() {
        let token = CancelToken::new();
        let mut sim = Simulator::new(hungry_outpost()).with_cancel_token(token.clone());
        sim.initialize().unwrap();
        assert!(sim.advance().unwrap());
        token.cancel();
        assert_eq!(sim.advance(), Err(SimulationError::Cancelled { time: 0.0 }));
        assert_eq!(sim.state(), RunState::Cancelled);
    }

    #[test]
    fn schedule_never_goes_back_in_time() {
        let mut sim = Simulator::new(hungry_outpost());
        sim.initialize().unwrap();
        while sim.advance().unwrap() {
            sim.handle_demands().unwrap();
            sim.execute();
            if sim.clock() > 0.0 {
                break;
            }
        }
        let clock = sim.clock();
        sim.schedule(Event::new(
            "Late",
            clock - 5.0,
            EventKind::Remove {
                elements: Vec::new(),
            },
        ));
        assert!(sim.next_event().unwrap().time >= clock);
    }

    #[test]
    #[traced_test]
    fn run_emits_lifecycle_logs() {
        let mut sim = Simulator::new(hungry_outpost());
        sim.simulate().unwrap();
        assert!(logs_contain("simulation initialized"));
        assert!(logs_contain("simulation complete"));
    }
}
