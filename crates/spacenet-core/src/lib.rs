//! SpaceNet Core -- discrete-event logistics simulation for space
//! exploration campaigns.
//!
//! A [`scenario::Scenario`] describes a transportation network of surface,
//! orbital and Lagrange nodes joined by space, flight and surface edges; the
//! elements (vehicles, habitats, containers, crew) that move over it; and
//! the missions whose events create, move, reconfigure and consume those
//! elements. The simulator plays the missions forward in time, generates
//! resource demand for every live element, and records where the plan runs
//! short.
//!
//! # Event Loop
//!
//! Each iteration of [`simulator::Simulator`] proceeds through:
//!
//! 1. **Advance** -- Pop the earliest event (by time, then priority, then
//!    scheduling order) and move the clock.
//! 2. **Demand** -- Every live element generates demand for the elapsed
//!    time in its current state; demand is discretized into whole items,
//!    optionally covered by in-mission repair, and drawn from inventory.
//! 3. **Execute** -- Apply the event. Transports schedule their arrival,
//!    burns consume propellant, missions schedule their event templates.
//!
//! Shortfalls and misplaced elements never abort a run. They are recorded
//! in the [`log::SimLog`] and the run continues.
//!
//! # Key Types
//!
//! - [`scenario::Scenario`] -- Arena of elements, network and missions.
//! - [`demand::DemandSet`] -- Mergeable set of resource demands.
//! - [`model::DemandModel`] -- Rated, timed impulse, crew consumables and
//!   sparing-by-mass demand generators.
//! - [`event::EventKind`] -- The closed set of simulated events.
//! - [`simulator::Simulator`] -- The shared event loop, plus the
//!   [`simulator::FastForward`], [`simulator::StateHistory`],
//!   [`simulator::SupplyAggregator`] and [`simulator::MoeCollector`]
//!   variants.
//! - [`config::SimConfig`] -- Precisions and scenario-wide switches.

pub mod config;
pub mod cos;
pub mod demand;
pub mod discretize;
pub mod element;
pub mod event;
pub mod id;
pub mod log;
pub mod mission;
pub mod model;
pub mod network;
pub mod queue;
pub mod repair;
pub mod resource;
pub mod scenario;
pub mod simulator;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
