//! Event execution.
//!
//! Each event kind is applied to the working scenario. A failure returns a
//! [`SimError`] and leaves whatever the event had already done in place;
//! the caller logs it and the run continues. Advisory conditions are
//! written straight to the warning log.

use super::Simulator;
use crate::cos::ClassOfSupply;
use crate::demand::{Demand, DemandSet};
use crate::element::{Element, ElementKind, StateType};
use crate::event::{BurnAction, BurnStageItem, Event, EventKind};
use crate::id::{EdgeId, ElementId, MissionId, NodeId};
use crate::log::{SimDemand, SimError, SimScavenge, SimSpatialError};
use crate::mission::exploration_eva_count;
use crate::network::{BurnType, Container, EdgeKind, Location};
use crate::resource::Resource;

/// Standard gravity, m/s².
const G0: f64 = 9.81;

/// Propellant needed to give `stack_mass` a velocity change of `delta_v`.
pub(crate) fn required_fuel_mass(stack_mass: f64, delta_v: f64, isp: f64) -> f64 {
    stack_mass * (1.0 - (-delta_v / (isp * G0)).exp())
}

/// Velocity change obtained by burning `fuel_mass` out of `stack_mass`.
pub(crate) fn achieved_delta_v(stack_mass: f64, isp: f64, fuel_mass: f64) -> f64 {
    if fuel_mass <= 0.0 || stack_mass <= fuel_mass {
        return 0.0;
    }
    isp * G0 * (stack_mass / (stack_mass - fuel_mass)).ln()
}

fn add_resource(element: &mut Element, resource: &Resource, amount: f64, config: &crate::config::SimConfig) -> bool {
    match &mut element.kind {
        ElementKind::ResourceContainer(c) => c.add(resource.clone(), amount, config),
        ElementKind::ResourceTank(t) => t.add(resource, amount, config),
        _ => false,
    }
}

fn remove_resource(element: &mut Element, resource: &Resource, amount: f64) -> bool {
    match &mut element.kind {
        ElementKind::ResourceContainer(c) => c.remove(resource, amount),
        ElementKind::ResourceTank(t) => t.remove(resource, amount),
        _ => false,
    }
}

impl Simulator {
    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn spatial(&self, event: &Event, message: impl Into<String>) -> SimError {
        SimError::Spatial(SimSpatialError {
            time: self.clock,
            event: event.name.clone(),
            event_type: event.event_type(),
            message: message.into(),
        })
    }

    fn warn(&mut self, event: &Event, message: impl Into<String>) {
        self.log.warn(self.clock, &event.name, message);
    }

    fn location_name(&self, location: Location) -> String {
        self.scenario.network.location_name(location)
    }

    fn event_location(&self, event: &Event) -> Result<Location, SimError> {
        event
            .location
            .ok_or_else(|| self.spatial(event, "No location defined."))
    }

    /// Fail unless `id` is placed at `location`.
    fn require_at(&self, event: &Event, id: ElementId, location: Location) -> Result<(), SimError> {
        match self.scenario.location_of(id) {
            None => Err(self.spatial(
                event,
                format!("{} was not found.", self.scenario.element_name(id)),
            )),
            Some(actual) if actual != location => Err(self.spatial(
                event,
                format!(
                    "{} is located at {} instead of {}.",
                    self.scenario.element_name(id),
                    self.location_name(actual),
                    self.location_name(location)
                ),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Resolve a target container, defaulting to the event location.
    fn target_container(&mut self, event: &Event, container: Option<Container>) -> Result<Container, SimError> {
        let container = match container {
            Some(container) => container,
            None => {
                let location = self.event_location(event)?;
                self.warn(
                    event,
                    format!("No container defined, defaulting to {}.", self.location_name(location)),
                );
                Container::Location(location)
            }
        };
        if let Container::Element(carrier) = container {
            if self.scenario.location_of(carrier).is_none() {
                return Err(self.spatial(
                    event,
                    format!("{} was not found.", self.scenario.element_name(carrier)),
                ));
            }
        }
        Ok(container)
    }

    fn set_state(&mut self, event: &Event, id: ElementId, state: usize) -> Result<(), SimError> {
        let Some(element) = self.scenario.elements.get_mut(id) else {
            return Err(self.spatial(event, format!("{id:?} was not found.")));
        };
        if state < element.states.len() {
            element.current_state = Some(state);
            tracing::trace!(element = %element.name, state, "reconfigured");
            Ok(())
        } else {
            let name = element.name.clone();
            Err(self.spatial(
                event,
                format!("Element {name} does not contain state {state}."),
            ))
        }
    }

    fn placed_edge(&self, event: &Event, edge: EdgeId, label: &str) -> Result<(NodeId, NodeId, EdgeKind), SimError> {
        self.scenario
            .network
            .edge(edge)
            .map(|e| (e.origin, e.destination, e.kind.clone()))
            .ok_or_else(|| self.spatial(event, format!("No {label} edge defined.")))
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    pub(crate) fn execute_event(&mut self, event: &Event) -> Result<(), SimError> {
        match &event.kind {
            EventKind::Mission(mission) => {
                self.execute_mission(event, *mission);
                Ok(())
            }
            EventKind::Demand { element, demands } => self.execute_demand(event, *element, demands),
            EventKind::Add { container, demands } => self.execute_add(event, *container, demands),
            EventKind::Remove { elements } => self.execute_remove(event, elements),
            EventKind::Move { container, elements } => self.execute_move(event, *container, elements),
            EventKind::Create { container, elements } => self.execute_create(event, *container, elements),
            EventKind::Reconfigure { element, state } => self.execute_reconfigure(event, *element, *state),
            EventKind::ReconfigureGroup {
                elements,
                state_type,
            } => self.execute_reconfigure_group(event, elements, *state_type),
            EventKind::Transfer {
                origin,
                destination,
                demands,
            } => self.execute_transfer(event, *origin, *destination, demands),
            EventKind::SpaceTransport {
                edge,
                elements,
                burn_sequences,
            } => self.execute_space_transport(event, *edge, elements, burn_sequences),
            EventKind::FlightTransport { edge, elements } => {
                self.execute_flight_transport(event, *edge, elements)
            }
            EventKind::SurfaceTransport {
                edge,
                vehicle,
                speed,
                duty_cycle,
                transport_state,
            } => self.execute_surface_transport(event, *edge, *vehicle, *speed, *duty_cycle, *transport_state),
            EventKind::Eva {
                vehicle,
                eva_hours,
                crew_states,
                demands,
            } => self.execute_eva(event, *vehicle, *eva_hours, crew_states, demands),
            EventKind::Exploration {
                vehicle,
                duration,
                eva_per_week,
                eva_hours,
                crew_states,
                demands,
            } => self.execute_exploration(
                event,
                *vehicle,
                *duration,
                *eva_per_week,
                *eva_hours,
                crew_states,
                demands,
            ),
            EventKind::Burn {
                elements,
                delta_v,
                burn_type,
                sequence,
            } => self.execute_burn(event, elements, *delta_v, *burn_type, sequence),
        }
    }

    // -----------------------------------------------------------------------
    // Mission and demand
    // -----------------------------------------------------------------------

    fn execute_mission(&mut self, event: &Event, id: MissionId) {
        let Some(mission) = self.scenario.missions.get(id) else {
            return;
        };
        let templates = mission.events.clone();
        tracing::info!(time = self.clock, mission = %mission.name, "commencing mission");
        if templates.is_empty() {
            self.warn(event, "No events defined.");
        }
        for mut template in templates {
            template.time += self.clock;
            self.schedule(template);
        }
    }

    fn execute_demand(
        &mut self,
        event: &Event,
        element: Option<ElementId>,
        demands: &DemandSet,
    ) -> Result<(), SimError> {
        let location = self.event_location(event)?;
        if let Some(id) = element {
            self.require_at(event, id, location)?;
        }
        let mut residual: DemandSet = demands
            .iter()
            .filter(|d| d.amount.abs() > 0.0)
            .cloned()
            .collect();
        if self.options.demands_satisfied {
            let mut scavenged = Vec::new();
            if let Some(id) = element {
                self.scenario.satisfy_demands(id, &mut residual, &mut scavenged);
                if let Some(Container::Element(carrier)) =
                    self.scenario.element(id).and_then(|e| e.container)
                {
                    self.scenario
                        .satisfy_demands(carrier, &mut residual, &mut scavenged);
                }
            }
            for top in self.scenario.network.contents(location).to_vec() {
                self.scenario.satisfy_demands(top, &mut residual, &mut scavenged);
            }
            for (source, item, amount) in scavenged {
                self.log.scavenges.push(SimScavenge {
                    time: self.clock,
                    item,
                    amount,
                    location: Some(location),
                    element: source,
                });
            }
            residual.clean(&self.scenario.config);
        }
        let mass = residual.total_mass(&self.scenario.config);
        if mass == 0.0 {
            return Ok(());
        }
        if mass > 0.0 && self.options.packing_demands_added {
            let config = &self.scenario.config;
            let packing: f64 = residual
                .iter()
                .filter(|d| d.mass(config) > 0.0 && d.resource.packing_factor > 0.0)
                .map(|d| d.amount * d.resource.packing_factor)
                .sum();
            residual.add(Demand::new(Resource::generic(ClassOfSupply::COS5), packing));
        }
        Err(SimError::Demand(SimDemand {
            time: self.clock,
            event: event.name.clone(),
            location: Some(location),
            element,
            demands: residual,
        }))
    }

    // -----------------------------------------------------------------------
    // Element placement
    // -----------------------------------------------------------------------

    fn execute_add(&mut self, event: &Event, container: ElementId, demands: &DemandSet) -> Result<(), SimError> {
        let location = self.event_location(event)?;
        self.require_at(event, container, location)?;
        if demands.is_empty() {
            self.warn(event, "No demands defined.");
            return Ok(());
        }
        let name = self.scenario.element_name(container);
        for demand in demands {
            let config = &self.scenario.config;
            let added = self
                .scenario
                .elements
                .get_mut(container)
                .is_some_and(|e| add_resource(e, &demand.resource, demand.amount, config));
            if !added {
                return Err(self.spatial(event, format!("{demand} could not be added to {name}.")));
            }
        }
        Ok(())
    }

    fn execute_remove(&mut self, event: &Event, elements: &[ElementId]) -> Result<(), SimError> {
        if elements.is_empty() {
            self.warn(event, "No elements defined.");
            return Ok(());
        }
        let location = self.event_location(event)?;
        for &id in elements {
            self.require_at(event, id, location)?;
            tracing::trace!(element = %self.scenario.element_name(id), "removing");
            self.scenario.detach(id);
            self.scenario.unregister_tree(id);
        }
        Ok(())
    }

    fn execute_move(
        &mut self,
        event: &Event,
        container: Option<Container>,
        elements: &[ElementId],
    ) -> Result<(), SimError> {
        let container = self.target_container(event, container)?;
        // Stages dropped in flight no longer arrive.
        let elements: Vec<ElementId> = match event.location {
            Some(Location::Edge(_)) => elements
                .iter()
                .copied()
                .filter(|id| !self.staged.contains(id))
                .collect(),
            _ => elements.to_vec(),
        };
        if elements.is_empty() {
            self.warn(event, "No elements defined.");
            return Ok(());
        }
        let location = self.event_location(event)?;
        for id in elements {
            self.require_at(event, id, location)?;
            if !self.scenario.add_to(container, id) {
                return Err(self.spatial(
                    event,
                    format!(
                        "{} could not be added to {}.",
                        self.scenario.element_name(id),
                        self.scenario.container_name(container)
                    ),
                ));
            }
        }
        Ok(())
    }

    fn execute_create(
        &mut self,
        event: &Event,
        container: Option<Container>,
        elements: &[ElementId],
    ) -> Result<(), SimError> {
        let container = self.target_container(event, container)?;
        if elements.is_empty() {
            self.warn(event, "No elements defined.");
        }
        for &id in elements {
            if let Some(location) = self.scenario.location_of(id) {
                return Err(self.spatial(
                    event,
                    format!(
                        "{} already exists at {}.",
                        self.scenario.element_name(id),
                        self.location_name(location)
                    ),
                ));
            }
            if !self.scenario.add_to(container, id) {
                return Err(self.spatial(
                    event,
                    format!(
                        "{} could not be added to {}.",
                        self.scenario.element_name(id),
                        self.scenario.container_name(container)
                    ),
                ));
            }
            for created in self.scenario.descendants(id) {
                self.staged.remove(&created);
            }
            self.scenario.register_tree(id);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // States and resources
    // -----------------------------------------------------------------------

    fn execute_reconfigure(&mut self, event: &Event, element: Option<ElementId>, state: usize) -> Result<(), SimError> {
        let Some(id) = element else {
            self.warn(event, "No element defined.");
            return Ok(());
        };
        let location = self.event_location(event)?;
        self.require_at(event, id, location)?;
        self.set_state(event, id, state)
    }

    fn execute_reconfigure_group(
        &mut self,
        event: &Event,
        elements: &[ElementId],
        state_type: StateType,
    ) -> Result<(), SimError> {
        if elements.is_empty() {
            self.warn(event, "No elements defined.");
            return Ok(());
        }
        let location = self.event_location(event)?;
        for &id in elements {
            let state = self.scenario.element(id).and_then(|e| e.state_of_type(state_type));
            self.require_at(event, id, location)?;
            match state {
                Some(state) => self.set_state(event, id, state)?,
                None => {
                    let name = self.scenario.element_name(id);
                    self.warn(event, format!("No {state_type:?} state for {name}."));
                }
            }
        }
        Ok(())
    }

    fn execute_transfer(
        &mut self,
        event: &Event,
        origin: ElementId,
        destination: ElementId,
        demands: &DemandSet,
    ) -> Result<(), SimError> {
        let origin_name = self.scenario.element_name(origin);
        let destination_name = self.scenario.element_name(destination);
        let Some(to) = self.scenario.location_of(destination) else {
            return Err(self.spatial(event, format!("{destination_name} was not found.")));
        };
        let Some(from) = self.scenario.location_of(origin) else {
            return Err(self.spatial(event, format!("{origin_name} was not found.")));
        };
        if from != to {
            return Err(self.spatial(
                event,
                format!(
                    "{destination_name} is located at {} instead of {}.",
                    self.location_name(to),
                    self.location_name(from)
                ),
            ));
        }
        if demands.is_empty() {
            self.warn(event, "No demands defined.");
            return Ok(());
        }
        for demand in demands {
            let removed = self
                .scenario
                .elements
                .get_mut(origin)
                .is_some_and(|e| remove_resource(e, &demand.resource, demand.amount));
            if !removed {
                return Err(self.spatial(
                    event,
                    format!("{demand} could not be removed from {origin_name}."),
                ));
            }
            let config = &self.scenario.config;
            let added = self
                .scenario
                .elements
                .get_mut(destination)
                .is_some_and(|e| add_resource(e, &demand.resource, demand.amount, config));
            if !added {
                let config = &self.scenario.config;
                if let Some(e) = self.scenario.elements.get_mut(origin) {
                    let _ = add_resource(e, &demand.resource, demand.amount, config);
                }
                return Err(self.spatial(
                    event,
                    format!("{demand} could not be added to {destination_name}."),
                ));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transports
    // -----------------------------------------------------------------------

    fn require_all_at(&mut self, event: &Event, elements: &[ElementId]) -> Result<Location, SimError> {
        if elements.is_empty() {
            self.warn(event, "No elements defined.");
        }
        let location = self.event_location(event)?;
        for &id in elements {
            self.require_at(event, id, location)?;
        }
        Ok(location)
    }

    /// Move the stack onto the edge now and schedule its arrival.
    fn depart(
        &mut self,
        event: &Event,
        edge: EdgeId,
        origin: NodeId,
        destination: NodeId,
        duration: f64,
        elements: &[ElementId],
    ) -> Result<(), SimError> {
        let departure = event
            .child(
                self.clock,
                event.priority,
                EventKind::Move {
                    container: Some(Location::Edge(edge).into()),
                    elements: elements.to_vec(),
                },
            )
            .at(origin);
        self.execute_event(&departure)?;
        let arrival = event
            .child(
                self.clock + duration,
                0,
                EventKind::Move {
                    container: Some(Location::Node(destination).into()),
                    elements: elements.to_vec(),
                },
            )
            .at(edge);
        self.schedule(arrival);
        Ok(())
    }

    fn execute_space_transport(
        &mut self,
        event: &Event,
        edge: EdgeId,
        elements: &[ElementId],
        burn_sequences: &[Vec<BurnStageItem>],
    ) -> Result<(), SimError> {
        if elements.is_empty() {
            self.warn(event, "No elements defined.");
        }
        let (origin, destination, kind) = self.placed_edge(event, edge, "space")?;
        let EdgeKind::Space { duration, burns } = kind else {
            return Err(self.spatial(event, "No space edge defined."));
        };
        let location = self.event_location(event)?;
        for &id in elements {
            self.require_at(event, id, location)?;
        }
        tracing::debug!(time = self.clock, event = %event.name, "commencing space transport");
        self.depart(event, edge, origin, destination, duration, elements)?;
        let count = burns.len() as i32;
        for (i, burn) in burns.iter().enumerate() {
            let scheduled = event
                .child(
                    self.clock + burn.time,
                    -count + i as i32,
                    EventKind::Burn {
                        elements: elements.to_vec(),
                        delta_v: burn.delta_v,
                        burn_type: burn.burn_type,
                        sequence: burn_sequences.get(i).cloned().unwrap_or_default(),
                    },
                )
                .at(edge);
            self.schedule(scheduled);
        }
        Ok(())
    }

    fn execute_flight_transport(&mut self, event: &Event, edge: EdgeId, elements: &[ElementId]) -> Result<(), SimError> {
        let (origin, destination, kind) = self.placed_edge(event, edge, "flight")?;
        let EdgeKind::Flight {
            duration,
            max_crew,
            max_cargo_mass,
        } = kind
        else {
            return Err(self.spatial(event, "No flight edge defined."));
        };
        self.require_all_at(event, elements)?;
        let mass: f64 = elements.iter().map(|id| self.scenario.total_mass(*id)).sum();
        let crew: u32 = elements.iter().map(|id| self.scenario.crew_count(*id)).sum();
        if mass > max_cargo_mass {
            return Err(self.spatial(
                event,
                format!("Flight cargo mass over capacity: {mass:.1}/{max_cargo_mass:.1} kg"),
            ));
        }
        if crew > max_crew {
            return Err(self.spatial(
                event,
                format!("Flight crew size over capacity: {crew}/{max_crew}"),
            ));
        }
        tracing::debug!(time = self.clock, event = %event.name, "commencing flight");
        self.depart(event, edge, origin, destination, duration, elements)
    }

    fn execute_surface_transport(
        &mut self,
        event: &Event,
        edge: EdgeId,
        vehicle: ElementId,
        speed: f64,
        duty_cycle: f64,
        transport_state: Option<usize>,
    ) -> Result<(), SimError> {
        let (origin, destination, kind) = self.placed_edge(event, edge, "surface")?;
        if !matches!(kind, EdgeKind::Surface { .. }) {
            return Err(self.spatial(event, "No surface edge defined."));
        }
        let location = self.event_location(event)?;
        self.require_at(event, vehicle, location)?;
        if speed <= 0.0 || duty_cycle <= 0.0 {
            return Err(self.spatial(event, "Infinite travel duration."));
        }
        let (start, end) = if location == Location::Node(destination) {
            (destination, origin)
        } else {
            (origin, destination)
        };
        let duration = self.scenario.surface_duration(edge, speed, duty_cycle);
        let previous = self.scenario.element(vehicle).and_then(|e| e.current_state);
        tracing::debug!(time = self.clock, event = %event.name, duration, "commencing surface transport");

        if let Some(state) = transport_state {
            let reconfigure = event
                .child(
                    self.clock,
                    event.priority,
                    EventKind::Reconfigure {
                        element: Some(vehicle),
                        state,
                    },
                )
                .at(start);
            self.execute_event(&reconfigure)?;
        }
        let departure = event.child(
            self.clock,
            event.priority,
            EventKind::Move {
                container: Some(Location::Edge(edge).into()),
                elements: vec![vehicle],
            },
        );
        self.execute_event(&departure)?;
        let arrival = event
            .child(
                self.clock + duration,
                -1,
                EventKind::Move {
                    container: Some(Location::Node(end).into()),
                    elements: vec![vehicle],
                },
            )
            .at(edge);
        self.schedule(arrival);
        if let Some(state) = previous {
            let restore = event
                .child(
                    self.clock + duration,
                    0,
                    EventKind::Reconfigure {
                        element: Some(vehicle),
                        state,
                    },
                )
                .at(end);
            self.schedule(restore);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Surface activity
    // -----------------------------------------------------------------------

    fn require_crew(
        &mut self,
        event: &Event,
        vehicle: ElementId,
        crew_states: &[(ElementId, Option<usize>)],
    ) -> Result<Location, SimError> {
        if crew_states.is_empty() {
            self.warn(event, "No crew members defined.");
        }
        if !self.scenario.elements.contains_key(vehicle) {
            return Err(self.spatial(event, "No crew habitat defined."));
        }
        let location = self.event_location(event)?;
        self.require_at(event, vehicle, location)?;
        for (crew, _) in crew_states {
            self.require_at(event, *crew, location)?;
        }
        Ok(location)
    }

    fn execute_eva(
        &mut self,
        event: &Event,
        vehicle: ElementId,
        eva_hours: f64,
        crew_states: &[(ElementId, Option<usize>)],
        demands: &DemandSet,
    ) -> Result<(), SimError> {
        let location = self.require_crew(event, vehicle, crew_states)?;
        tracing::debug!(time = self.clock, eva_hours, "commencing EVA");
        if !self.scenario.config.detailed_eva {
            return Ok(());
        }
        let end = self.clock + eva_hours / 24.0;
        let crew: Vec<ElementId> = crew_states.iter().map(|(c, _)| *c).collect();
        let mut restores = Vec::new();
        for &(member, state) in crew_states {
            let Some(state) = state else {
                continue;
            };
            if let Some(previous) = self.scenario.element(member).and_then(|e| e.current_state) {
                restores.push((member, previous));
            }
            let reconfigure = event.child(
                self.clock,
                event.priority,
                EventKind::Reconfigure {
                    element: Some(member),
                    state,
                },
            );
            self.schedule(reconfigure);
        }
        let egress = event.child(
            self.clock,
            event.priority,
            EventKind::Move {
                container: Some(location.into()),
                elements: crew.clone(),
            },
        );
        self.schedule(egress);
        let ingress = event.child(
            end,
            0,
            EventKind::Move {
                container: Some(Container::Element(vehicle)),
                elements: crew,
            },
        );
        self.schedule(ingress);
        for (member, state) in restores {
            let restore = event.child(
                end,
                0,
                EventKind::Reconfigure {
                    element: Some(member),
                    state,
                },
            );
            self.schedule(restore);
        }
        if !demands.is_empty() {
            let consumption = event.child(
                end,
                0,
                EventKind::Demand {
                    element: Some(vehicle),
                    demands: demands.clone(),
                },
            );
            self.schedule(consumption);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_exploration(
        &mut self,
        event: &Event,
        vehicle: ElementId,
        duration: f64,
        eva_per_week: f64,
        eva_hours: f64,
        crew_states: &[(ElementId, Option<usize>)],
        demands: &DemandSet,
    ) -> Result<(), SimError> {
        self.require_crew(event, vehicle, crew_states)?;
        let count = exploration_eva_count(duration, eva_per_week);
        let hours_between =
            (duration * 24.0 - eva_hours * f64::from(count)) / f64::from(count + 1);
        tracing::debug!(time = self.clock, duration, evas = count, "commencing exploration");
        if !self.scenario.config.detailed_eva {
            return Ok(());
        }
        for i in 0..count {
            let eva = event.child(
                self.clock + f64::from(i + 1) * hours_between / 24.0,
                0,
                EventKind::Eva {
                    vehicle,
                    eva_hours,
                    crew_states: crew_states.to_vec(),
                    demands: demands.clone(),
                },
            );
            self.schedule(eva);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Burns
    // -----------------------------------------------------------------------

    fn execute_burn(
        &mut self,
        event: &Event,
        elements: &[ElementId],
        delta_v: f64,
        burn_type: BurnType,
        sequence: &[BurnStageItem],
    ) -> Result<(), SimError> {
        let mut remaining = delta_v;
        let mut stack: Vec<ElementId> = elements
            .iter()
            .copied()
            .filter(|id| !self.staged.contains(id))
            .collect();
        for item in sequence {
            match item.action {
                BurnAction::Burn => {
                    if remaining <= 0.0 {
                        continue;
                    }
                    let stack_mass: f64 = stack.iter().map(|id| self.scenario.total_mass(*id)).sum();
                    let name = self.scenario.element_name(item.element);
                    let Some(propulsion) = self
                        .scenario
                        .elements
                        .get_mut(item.element)
                        .and_then(Element::propulsion_mut)
                    else {
                        return Err(self.spatial(event, format!("{name} is not a propulsive vehicle.")));
                    };
                    let isp = propulsion.isp(burn_type);
                    let Some(tank) = propulsion.tank_mut(burn_type) else {
                        continue;
                    };
                    let required = required_fuel_mass(stack_mass, remaining, isp);
                    if required > tank.amount {
                        let achieved = achieved_delta_v(stack_mass, isp, tank.amount);
                        remaining -= achieved;
                        tank.amount = 0.0;
                        tracing::debug!(vehicle = %name, achieved, remaining, "burn short of target");
                    } else {
                        tank.amount -= required;
                        remaining = 0.0;
                        tracing::debug!(vehicle = %name, fuel = required, "burn complete");
                    }
                }
                BurnAction::Stage => {
                    let stage = event.child(
                        self.clock,
                        event.priority,
                        EventKind::Remove {
                            elements: vec![item.element],
                        },
                    );
                    self.execute_event(&stage)?;
                    stack.retain(|id| *id != item.element);
                    self.staged.insert(item.element);
                }
            }
        }
        if remaining > 0.0 {
            return Err(self.spatial(
                event,
                format!("Insufficient delta-v achieved, - remaining delta-v: {remaining:.1} m/s."),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::element::{Carrier, Propulsion, ResourceContainer, ResourceTank, State};
    use crate::mission::Mission;
    use crate::network::{Body, Burn, Edge, Node};
    use crate::resource::Environment;
    use crate::scenario::Scenario;

    fn fuel() -> Resource {
        Resource::generic(ClassOfSupply::COS1)
    }

    #[test]
    fn rocket_equation_round_trips() {
        let fuel = required_fuel_mass(10_000.0, 1_000.0, 450.0);
        let dv = achieved_delta_v(10_000.0, 450.0, fuel);
        assert!((dv - 1_000.0).abs() < 1e-6);
        assert_eq!(achieved_delta_v(100.0, 450.0, 0.0), 0.0);
    }

    fn run(scenario: Scenario) -> Simulator {
        let mut sim = Simulator::new(scenario);
        sim.simulate().unwrap();
        sim
    }

    fn create(name: &str, elements: Vec<ElementId>, at: NodeId) -> Event {
        Event::new(
            name,
            0.0,
            EventKind::Create {
                container: None,
                elements,
            },
        )
        .at(at)
    }

    #[test]
    fn create_twice_is_a_spatial_error() {
        let mut scenario = Scenario::new("Twice", SimConfig::default());
        let base = scenario.network.add_node(Node::surface("Base", Body::Moon));
        let rock = scenario.add_element(Element::new("Rock", ElementKind::Basic));
        scenario.add_mission(
            Mission::new("M", 0.0)
                .with_event(create("First", vec![rock], base))
                .with_event(create("Second", vec![rock], base)),
        );
        let sim = run(scenario);
        let errors = &sim.log().spatial_errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Rock already exists at Base.");
        // Both creates default their container to the event location.
        assert_eq!(sim.log().warnings.len(), 2);
    }

    #[test]
    fn moving_a_missing_element_reports_not_found() {
        let mut scenario = Scenario::new("Missing", SimConfig::default());
        let base = scenario.network.add_node(Node::surface("Base", Body::Moon));
        let rock = scenario.add_element(Element::new("Rock", ElementKind::Basic));
        scenario.add_mission(Mission::new("M", 0.0).with_event(
            Event::new(
                "Move",
                1.0,
                EventKind::Move {
                    container: Some(Location::Node(base).into()),
                    elements: vec![rock],
                },
            )
            .at(base),
        ));
        let sim = run(scenario);
        assert_eq!(sim.log().spatial_errors[0].message, "Rock was not found.");
    }

    #[test]
    fn flight_checks_cargo_capacity() {
        let mut scenario = Scenario::new("Flight", SimConfig::default());
        let ksc = scenario.network.add_node(Node::surface("KSC", Body::Earth));
        let leo = scenario
            .network
            .add_node(Node::orbital("LEO", Body::Earth, 400.0, 400.0));
        let launch = scenario.network.add_edge(Edge::new(
            "Launch",
            ksc,
            leo,
            EdgeKind::Flight {
                duration: 1.0,
                max_crew: 2,
                max_cargo_mass: 500.0,
            },
        ));
        let payload = scenario.add_element(Element::new("Payload", ElementKind::Basic).with_mass(800.0));
        scenario.add_mission(
            Mission::new("M", 0.0)
                .with_event(create("Create", vec![payload], ksc))
                .with_event(
                    Event::new(
                        "Launch",
                        0.0,
                        EventKind::FlightTransport {
                            edge: launch,
                            elements: vec![payload],
                        },
                    )
                    .at(ksc),
                ),
        );
        let sim = run(scenario);
        assert_eq!(
            sim.log().spatial_errors[0].message,
            "Flight cargo mass over capacity: 800.0/500.0 kg"
        );
        assert_eq!(sim.scenario().location_of(payload), Some(Location::Node(ksc)));
    }

    #[test]
    fn transfer_rolls_back_when_destination_is_full() {
        let mut scenario = Scenario::new("Transfer", SimConfig::default());
        let base = scenario.network.add_node(Node::surface("Base", Body::Moon));
        let water = Resource::generic(ClassOfSupply::COS201);
        let full = scenario.add_element(Element::new(
            "Full",
            ElementKind::ResourceContainer(
                ResourceContainer::new(100.0, 1.0, Environment::Pressurized).with_stock(water.clone(), 50.0),
            ),
        ));
        let small = scenario.add_element(Element::new(
            "Small",
            ElementKind::ResourceContainer(ResourceContainer::new(10.0, 1.0, Environment::Pressurized)),
        ));
        scenario.add_mission(
            Mission::new("M", 0.0)
                .with_event(create("Create", vec![full, small], base))
                .with_event(
                    Event::new(
                        "Pour",
                        1.0,
                        EventKind::Transfer {
                            origin: full,
                            destination: small,
                            demands: vec![Demand::new(water.clone(), 20.0)].into(),
                        },
                    )
                    .at(base),
                ),
        );
        let sim = run(scenario);
        assert_eq!(sim.log().spatial_errors.len(), 1);
        let stock = sim
            .scenario()
            .element(full)
            .unwrap()
            .resource_container()
            .unwrap()
            .amount_of(&water);
        assert_eq!(stock, 50.0);
    }

    #[test]
    fn reconfigure_group_warns_on_missing_state() {
        let mut scenario = Scenario::new("States", SimConfig::default());
        let base = scenario.network.add_node(Node::surface("Base", Body::Moon));
        let hab = scenario.add_element(
            Element::new("Hab", ElementKind::Basic).with_state(State::new("On", StateType::Active)),
        );
        scenario.add_mission(
            Mission::new("M", 0.0)
                .with_event(create("Create", vec![hab], base))
                .with_event(
                    Event::new(
                        "Sleep",
                        1.0,
                        EventKind::ReconfigureGroup {
                            elements: vec![hab],
                            state_type: StateType::Dormant,
                        },
                    )
                    .at(base),
                ),
        );
        let sim = run(scenario);
        assert!(sim
            .log()
            .warnings
            .iter()
            .any(|w| w.message == "No Dormant state for Hab."));
        assert!(sim.log().spatial_errors.is_empty());
    }

    fn space_scenario(fuel_amount: f64, stage: bool) -> (Scenario, ElementId, ElementId, NodeId) {
        let mut scenario = Scenario::new("Burns", SimConfig::default());
        let leo = scenario
            .network
            .add_node(Node::orbital("LEO", Body::Earth, 400.0, 400.0));
        let llo = scenario
            .network
            .add_node(Node::orbital("LLO", Body::Moon, 100.0, 100.0));
        let tli = scenario.network.add_edge(Edge::new(
            "TLI",
            leo,
            llo,
            EdgeKind::Space {
                duration: 3.0,
                burns: vec![Burn {
                    time: 0.0,
                    burn_type: BurnType::Oms,
                    delta_v: 3_100.0,
                }],
            },
        ));
        let propulsion = Propulsion {
            oms_isp: 450.0,
            rcs_isp: 0.0,
            oms_tank: Some(ResourceTank::new(fuel(), fuel_amount, 50_000.0)),
            rcs_tank: None,
        };
        let stage_vehicle = scenario.add_element(
            Element::new(
                "EDS",
                ElementKind::PropulsiveVehicle(Carrier::new(0.0, Environment::Unpressurized, 0), propulsion),
            )
            .with_mass(10_000.0),
        );
        let payload = scenario.add_element(Element::new("Lander", ElementKind::Basic).with_mass(20_000.0));
        let mut sequence = vec![BurnStageItem::burn(stage_vehicle)];
        if stage {
            sequence.push(BurnStageItem::stage(stage_vehicle));
        }
        scenario.add_mission(
            Mission::new("M", 0.0)
                .with_event(create("Create", vec![stage_vehicle, payload], leo))
                .with_event(
                    Event::new(
                        "TLI",
                        1.0,
                        EventKind::SpaceTransport {
                            edge: tli,
                            elements: vec![stage_vehicle, payload],
                            burn_sequences: vec![sequence],
                        },
                    )
                    .at(leo),
                ),
        );
        (scenario, stage_vehicle, payload, llo)
    }

    #[test]
    fn staged_vehicle_does_not_arrive() {
        let (scenario, eds, lander, llo) = space_scenario(45_000.0, true);
        let sim = run(scenario);
        assert!(sim.log().spatial_errors.is_empty(), "{:?}", sim.log().spatial_errors);
        assert_eq!(sim.scenario().location_of(lander), Some(Location::Node(llo)));
        assert!(!sim.scenario().is_live(eds));
        assert!(sim.scenario().removed_elements().any(|e| e == eds));
    }

    #[test]
    fn short_tank_reports_remaining_delta_v() {
        let (scenario, eds, _, _) = space_scenario(1_000.0, false);
        let sim = run(scenario);
        let errors = &sim.log().spatial_errors;
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .message
            .starts_with("Insufficient delta-v achieved, - remaining delta-v:"));
        let tank = sim.scenario().element(eds).unwrap().propulsion().unwrap();
        assert_eq!(tank.oms_tank.as_ref().unwrap().amount, 0.0);
    }
}
