//! Single-day insertion reassignment heuristic.
//!
//! A myopic, single-pass cheapest-insertion pass over one day's tours: each
//! tour, taken in global start-time order, goes to whichever agent can
//! feasibly absorb it at the lowest travel-plus-wait cost. No backtracking
//! and no optimality guarantee; results are an estimate, O(events × agents)
//! per day. Days carry no state across each other, so the multi-day driver
//! optimizes them in parallel.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::matrix::{MatrixError, TravelMatrix};
use crate::model::{AgentId, EventId, PropertyId, TourEvent};
use crate::travel::{assignment_travel_minutes, count_trips};

/// Where one tour ended up after the heuristic pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub event: EventId,
    pub agent: AgentId,
    /// True when no agent could feasibly take the tour and it fell back to
    /// its originally assigned agent. The tour is kept, not dropped.
    pub fallback: bool,
}

/// Outcome of one day's optimization pass.
#[derive(Debug, Clone)]
pub struct DayPlan {
    pub date: i64,
    pub current_travel_minutes: f64,
    pub optimized_travel_minutes: f64,
    pub savings_minutes: f64,
    pub savings_pct: f64,
    pub current_trips: usize,
    pub optimized_trips: usize,
    pub trip_savings: i64,
    pub trip_savings_pct: f64,
    pub assignments: Vec<Assignment>,
    /// The day's events with only the agent field rebound.
    pub optimized_events: Vec<TourEvent>,
}

/// Multi-day roll-up of the per-day plans.
#[derive(Debug, Clone)]
pub struct OptimizationSummary {
    pub current_travel_minutes: f64,
    pub optimized_travel_minutes: f64,
    pub savings_minutes: f64,
    pub savings_pct: f64,
    pub current_trips: usize,
    pub optimized_trips: usize,
    pub trip_savings: i64,
    pub trip_savings_pct: f64,
    pub days: Vec<DayPlan>,
}

impl OptimizationSummary {
    /// All days' optimized events, in date order.
    pub fn optimized_events(&self) -> Vec<TourEvent> {
        self.days
            .iter()
            .flat_map(|day| day.optimized_events.iter().cloned())
            .collect()
    }
}

/// Mutable per-agent state during one day's pass. Reset each day.
#[derive(Debug, Clone, Default)]
struct AgentState {
    /// When the agent finishes their last committed tour, epoch seconds.
    free_at: Option<i64>,
    /// Last known physical location, if any escorted tour was committed.
    location: Option<PropertyId>,
}

/// Travel minutes and earliest arrival for a candidate agent taking a tour.
///
/// Virtual tours and agents with no prior location need no travel and can
/// "arrive" exactly at the tour's start.
fn candidate_arrival(
    state: &AgentState,
    event: &TourEvent,
    matrix: &TravelMatrix,
) -> Result<(f64, i64), MatrixError> {
    if !event.kind.is_escorted() {
        return Ok((0.0, event.start));
    }
    match (&state.location, state.free_at) {
        (Some(location), Some(free_at)) => {
            let travel = matrix.minutes(location, &event.property)?;
            Ok((travel, free_at + (travel * 60.0).round() as i64))
        }
        _ => Ok((0.0, event.start)),
    }
}

/// Commits a tour to an agent, advancing their free time and, for escorted
/// tours, their physical location.
fn commit(state: &mut AgentState, event: &TourEvent, matrix: &TravelMatrix) -> Result<(), MatrixError> {
    let duration = event.end - event.start;
    if !event.kind.is_escorted() {
        let begin = state.free_at.unwrap_or(event.start).max(event.start);
        state.free_at = Some(begin + duration);
        return Ok(());
    }

    let begin = match (&state.location, state.free_at) {
        (Some(location), Some(free_at)) => {
            let travel = matrix.minutes(location, &event.property)?;
            (free_at + (travel * 60.0).round() as i64).max(event.start)
        }
        _ => event.start,
    };
    state.free_at = Some(begin + duration);
    state.location = Some(event.property.clone());
    Ok(())
}

fn empty_plan(date: i64) -> DayPlan {
    DayPlan {
        date,
        current_travel_minutes: 0.0,
        optimized_travel_minutes: 0.0,
        savings_minutes: 0.0,
        savings_pct: 0.0,
        current_trips: 0,
        optimized_trips: 0,
        trip_savings: 0,
        trip_savings_pct: 0.0,
        assignments: Vec::new(),
        optimized_events: Vec::new(),
    }
}

/// Runs the insertion heuristic over one day's events.
///
/// `events` must all share one calendar date. The pass is strictly
/// sequential: each tour's assignment depends on every previously committed
/// agent state. Agents are enumerated in sorted-id order, so ties go to the
/// lowest agent id and repeated runs on the same input produce identical
/// assignments.
pub fn optimize_day(events: &[TourEvent], matrix: &TravelMatrix) -> Result<DayPlan, MatrixError> {
    let Some(first) = events.first() else {
        return Ok(empty_plan(0));
    };
    let date = first.date();

    let current_travel = assignment_travel_minutes(events, matrix)?;
    let current_trips = count_trips(events);

    // Deterministic candidate order: sorted agent ids for the day.
    let agents: Vec<AgentId> = events
        .iter()
        .map(|e| e.agent.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut state: HashMap<&AgentId, AgentState> =
        agents.iter().map(|a| (a, AgentState::default())).collect();

    // Global start-time order across all agents; a stable sort keeps the
    // input order for simultaneous tours.
    let mut order: Vec<&TourEvent> = events.iter().collect();
    order.sort_by_key(|e| e.start);

    let mut assignments = Vec::with_capacity(order.len());
    for event in order {
        let mut best: Option<(&AgentId, f64)> = None;
        for agent in &agents {
            let (travel, arrival) = candidate_arrival(&state[agent], event, matrix)?;
            if arrival > event.end {
                continue;
            }
            let wait = ((event.start - arrival) as f64 / 60.0).max(0.0);
            let cost = travel + wait;
            if best.is_none_or(|(_, incumbent)| cost < incumbent) {
                best = Some((agent, cost));
            }
        }

        let (winner, fallback) = match best {
            Some((agent, _)) => (agent, false),
            None => {
                // No agent can make it; keep the original assignment rather
                // than drop the tour, even though it may be infeasible too.
                warn!(
                    date,
                    event = %event.id,
                    agent = %event.agent,
                    "no feasible agent for tour, keeping original assignment"
                );
                (&event.agent, true)
            }
        };

        // The winner is always one of the day's agents; entry covers the
        // fallback path without a second lookup.
        let winner_state = state.entry(winner).or_default();
        commit(winner_state, event, matrix)?;
        assignments.push(Assignment {
            event: event.id.clone(),
            agent: winner.clone(),
            fallback,
        });
    }

    // Rebind agents on a copy of the day's events; everything else is
    // untouched.
    let reassigned: HashMap<&EventId, &AgentId> = assignments
        .iter()
        .map(|a| (&a.event, &a.agent))
        .collect();
    let optimized_events: Vec<TourEvent> = events
        .iter()
        .map(|e| match reassigned.get(&e.id) {
            Some(agent) => e.with_agent((*agent).clone()),
            None => e.clone(),
        })
        .collect();

    let optimized_travel = assignment_travel_minutes(&optimized_events, matrix)?;
    let optimized_trips = count_trips(&optimized_events);

    let savings = current_travel - optimized_travel;
    let trip_savings = current_trips as i64 - optimized_trips as i64;
    let plan = DayPlan {
        date,
        current_travel_minutes: current_travel,
        optimized_travel_minutes: optimized_travel,
        savings_minutes: savings,
        savings_pct: percentage(savings, current_travel),
        current_trips,
        optimized_trips,
        trip_savings,
        trip_savings_pct: percentage(trip_savings as f64, current_trips as f64),
        assignments,
        optimized_events,
    };
    debug!(
        date,
        savings_minutes = plan.savings_minutes,
        trip_savings = plan.trip_savings,
        "day optimized"
    );
    Ok(plan)
}

/// Optimizes every calendar date independently and rolls up the totals.
///
/// Dates share no state, so they run in parallel with identical results to
/// a sequential pass. A failed date aborts the whole run rather than
/// returning a partially reassigned schedule.
pub fn optimize(events: &[TourEvent], matrix: &TravelMatrix) -> Result<OptimizationSummary, MatrixError> {
    let mut by_date: BTreeMap<i64, Vec<TourEvent>> = BTreeMap::new();
    for event in events {
        by_date.entry(event.date()).or_default().push(event.clone());
    }

    // Vec keeps the date order stable through the parallel collect.
    let groups: Vec<Vec<TourEvent>> = by_date.into_values().collect();
    let days: Vec<DayPlan> = groups
        .into_par_iter()
        .map(|day_events| optimize_day(&day_events, matrix))
        .collect::<Result<_, _>>()?;

    let current_travel: f64 = days.iter().map(|d| d.current_travel_minutes).sum();
    let optimized_travel: f64 = days.iter().map(|d| d.optimized_travel_minutes).sum();
    let current_trips: usize = days.iter().map(|d| d.current_trips).sum();
    let optimized_trips: usize = days.iter().map(|d| d.optimized_trips).sum();
    let savings = current_travel - optimized_travel;
    let trip_savings = current_trips as i64 - optimized_trips as i64;

    Ok(OptimizationSummary {
        current_travel_minutes: current_travel,
        optimized_travel_minutes: optimized_travel,
        savings_minutes: savings,
        savings_pct: percentage(savings, current_travel),
        current_trips,
        optimized_trips,
        trip_savings,
        trip_savings_pct: percentage(trip_savings as f64, current_trips as f64),
        days,
    })
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}
