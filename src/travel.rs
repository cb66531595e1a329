//! Schedule timelines and travel aggregation.
//!
//! Walks each agent's day in start-time order and turns it into location
//! transitions priced by the travel matrix. Only escorted tours consume or
//! require a physical location; virtual tours neither require travel nor
//! move the agent. The same accumulation routine serves both the current
//! and the optimized assignment so before/after comparisons always agree.

use std::collections::BTreeMap;

use crate::matrix::{MatrixError, TravelMatrix};
use crate::model::{AgentDirectory, AgentId, PropertyId, TourEvent};

/// One property-to-property transition inside an agent's day.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelLeg {
    pub from: PropertyId,
    pub to: PropertyId,
    pub minutes: f64,
    /// Index into the agent-day's sorted event sequence of the tour that
    /// required this travel.
    pub event_index: usize,
    /// End of the immediately preceding event in the sequence, epoch seconds.
    pub prev_end: i64,
    /// Start of the tour requiring the travel, epoch seconds.
    pub next_start: i64,
}

impl TravelLeg {
    /// Scheduled slack between the previous event and this tour, in minutes.
    /// Negative when the events overlap.
    pub fn gap_minutes(&self) -> f64 {
        (self.next_start - self.prev_end) as f64 / 60.0
    }
}

/// Travel summary for one agent on one calendar day.
#[derive(Debug, Clone)]
pub struct AgentDayTravel {
    pub agent: AgentId,
    pub date: i64,
    pub total_tours: usize,
    pub escorted_tours: usize,
    pub virtual_tours: usize,
    pub legs: Vec<TravelLeg>,
    pub travel_minutes: f64,
    /// Where the agent physically ends the day, if any escorted tour ran.
    pub final_location: Option<PropertyId>,
}

/// System-wide travel analysis across all agents and days.
#[derive(Debug, Clone)]
pub struct TravelAnalysis {
    pub days: Vec<AgentDayTravel>,
    pub total_minutes: f64,
    pub total_legs: usize,
}

fn by_agent_day(events: &[TourEvent]) -> BTreeMap<(AgentId, i64), Vec<&TourEvent>> {
    let mut groups: BTreeMap<(AgentId, i64), Vec<&TourEvent>> = BTreeMap::new();
    for event in events {
        groups
            .entry((event.agent.clone(), event.date()))
            .or_default()
            .push(event);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|e| e.start);
    }
    groups
}

/// Builds the transition sequence for one agent-day.
///
/// `events` must all belong to one agent and day, sorted by start time.
/// Returns the legs plus the agent's final physical location. A transition
/// is recorded only when consecutive escorted tours sit at different
/// properties; the location still updates after every escorted tour.
pub fn day_timeline(
    events: &[&TourEvent],
    matrix: &TravelMatrix,
) -> Result<(Vec<TravelLeg>, Option<PropertyId>), MatrixError> {
    let mut legs = Vec::new();
    let mut location: Option<PropertyId> = None;

    for (i, event) in events.iter().enumerate() {
        if !event.kind.is_escorted() {
            continue;
        }
        if let Some(from) = &location {
            if *from != event.property {
                let minutes = matrix.minutes(from, &event.property)?;
                legs.push(TravelLeg {
                    from: from.clone(),
                    to: event.property.clone(),
                    minutes,
                    event_index: i,
                    // location is only set once an earlier event ran, so
                    // i > 0 here
                    prev_end: events[i - 1].end,
                    next_start: event.start,
                });
            }
        }
        location = Some(event.property.clone());
    }

    Ok((legs, location))
}

/// Runs the timeline builder over every (agent, date) group and aggregates
/// travel minutes and transition counts, per group and system-wide.
pub fn analyze_travel(
    events: &[TourEvent],
    matrix: &TravelMatrix,
) -> Result<TravelAnalysis, MatrixError> {
    let mut days = Vec::new();
    let mut total_minutes = 0.0;
    let mut total_legs = 0;

    for ((agent, date), group) in by_agent_day(events) {
        let (legs, final_location) = day_timeline(&group, matrix)?;
        let travel_minutes: f64 = legs.iter().map(|leg| leg.minutes).sum();
        let escorted = group.iter().filter(|e| e.kind.is_escorted()).count();

        total_minutes += travel_minutes;
        total_legs += legs.len();

        days.push(AgentDayTravel {
            agent,
            date,
            total_tours: group.len(),
            escorted_tours: escorted,
            virtual_tours: group.len() - escorted,
            legs,
            travel_minutes,
            final_location,
        });
    }

    Ok(TravelAnalysis {
        days,
        total_minutes,
        total_legs,
    })
}

/// Total travel minutes implied by an assignment.
///
/// Works for any event slice (a single day or the whole horizon) and is the
/// single source of truth for both the current and the optimized schedule.
pub fn assignment_travel_minutes(
    events: &[TourEvent],
    matrix: &TravelMatrix,
) -> Result<f64, MatrixError> {
    let mut total = 0.0;
    for group in by_agent_day(events).values() {
        let (legs, _) = day_timeline(group, matrix)?;
        total += legs.iter().map(|leg| leg.minutes).sum::<f64>();
    }
    Ok(total)
}

/// Counts trips: consecutive escorted tours by the same agent on the same
/// day at differing properties. A trip is a transition, not a minutes
/// amount, and counts even when the travel time is small.
pub fn count_trips(events: &[TourEvent]) -> usize {
    let mut trips = 0;
    for group in by_agent_day(events).values() {
        let mut last: Option<&PropertyId> = None;
        for event in group {
            if !event.kind.is_escorted() {
                continue;
            }
            if let Some(prev) = last {
                if *prev != event.property {
                    trips += 1;
                }
            }
            last = Some(&event.property);
        }
    }
    trips
}

/// Per-agent shift (agent-day) travel metrics.
#[derive(Debug, Clone)]
pub struct AgentShiftMetrics {
    pub agent: AgentId,
    pub agent_name: String,
    pub shifts: usize,
    pub travel_minutes: f64,
    pub avg_travel_per_shift: f64,
    pub total_tours: usize,
    pub escorted_tours: usize,
    pub virtual_tours: usize,
    pub total_legs: usize,
    pub avg_tours_per_shift: f64,
    pub travel_minutes_per_tour: f64,
    pub travel_minutes_per_escorted_tour: f64,
    /// Tours served per travel minute, scaled: `tours / (travel + 1) * 100`.
    pub efficiency_score: f64,
}

/// System-wide distribution of per-shift travel.
#[derive(Debug, Clone)]
pub struct SystemShiftStats {
    pub total_agents: usize,
    pub total_shifts: usize,
    pub avg_travel_per_shift: f64,
    pub median_travel_per_shift: f64,
    pub min_travel_per_shift: f64,
    pub max_travel_per_shift: f64,
    pub std_travel_per_shift: f64,
    pub avg_tours_per_shift: f64,
    pub avg_legs_per_shift: f64,
    pub avg_efficiency_score: f64,
}

#[derive(Debug, Clone)]
pub struct ShiftMetricsReport {
    pub agents: Vec<AgentShiftMetrics>,
    pub system: SystemShiftStats,
}

/// Rolls the travel analysis up to per-agent shift metrics plus
/// system-wide distribution statistics.
pub fn shift_metrics(analysis: &TravelAnalysis, directory: &AgentDirectory) -> ShiftMetricsReport {
    let mut per_agent: BTreeMap<AgentId, Vec<&AgentDayTravel>> = BTreeMap::new();
    for day in &analysis.days {
        per_agent.entry(day.agent.clone()).or_default().push(day);
    }

    let mut agents = Vec::with_capacity(per_agent.len());
    for (agent, days) in per_agent {
        let shifts = days.len();
        let travel_minutes: f64 = days.iter().map(|d| d.travel_minutes).sum();
        let total_tours: usize = days.iter().map(|d| d.total_tours).sum();
        let escorted_tours: usize = days.iter().map(|d| d.escorted_tours).sum();
        let virtual_tours: usize = days.iter().map(|d| d.virtual_tours).sum();
        let total_legs: usize = days.iter().map(|d| d.legs.len()).sum();

        agents.push(AgentShiftMetrics {
            agent_name: directory.name_of(&agent).to_string(),
            agent,
            shifts,
            travel_minutes,
            avg_travel_per_shift: travel_minutes / shifts as f64,
            total_tours,
            escorted_tours,
            virtual_tours,
            total_legs,
            avg_tours_per_shift: total_tours as f64 / shifts as f64,
            travel_minutes_per_tour: if total_tours > 0 {
                travel_minutes / total_tours as f64
            } else {
                0.0
            },
            travel_minutes_per_escorted_tour: if escorted_tours > 0 {
                travel_minutes / escorted_tours as f64
            } else {
                0.0
            },
            efficiency_score: total_tours as f64 / (travel_minutes + 1.0) * 100.0,
        });
    }

    let per_shift: Vec<f64> = agents.iter().map(|a| a.avg_travel_per_shift).collect();
    let total_shifts: usize = agents.iter().map(|a| a.shifts).sum();
    let system = SystemShiftStats {
        total_agents: agents.len(),
        total_shifts,
        avg_travel_per_shift: mean(&per_shift),
        median_travel_per_shift: median(&per_shift),
        min_travel_per_shift: per_shift
            .iter()
            .copied()
            .min_by(f64::total_cmp)
            .unwrap_or(0.0),
        max_travel_per_shift: per_shift
            .iter()
            .copied()
            .max_by(f64::total_cmp)
            .unwrap_or(0.0),
        std_travel_per_shift: std_dev(&per_shift),
        avg_tours_per_shift: mean(&agents.iter().map(|a| a.avg_tours_per_shift).collect::<Vec<_>>()),
        avg_legs_per_shift: if total_shifts > 0 {
            agents.iter().map(|a| a.total_legs).sum::<usize>() as f64 / total_shifts as f64
        } else {
            0.0
        },
        avg_efficiency_score: mean(&agents.iter().map(|a| a.efficiency_score).collect::<Vec<_>>()),
    };

    ShiftMetricsReport { agents, system }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
