//! Lateness risk and impossible-schedule analysis.
//!
//! Runs against the original, pre-optimization assignment using the same
//! travel matrix as the optimizer. Two separate tests share the timing
//! model: a soft lateness classification (on-time / risky / late) and a
//! stricter buffer-inclusive conflict scan that flags physically
//! impossible transitions.

use std::collections::{BTreeMap, BTreeSet};

use crate::matrix::{MatrixError, TravelMatrix};
use crate::model::{AgentDirectory, AgentId, PropertyDirectory, PropertyId, TourEvent};
use crate::travel::mean;

/// Safety margin for the "risky" classification, in minutes.
pub const RISK_MARGIN_MINUTES: f64 = 5.0;

/// Default buffer for the impossible-schedule scan, in minutes.
pub const DEFAULT_CONFLICT_BUFFER_MINUTES: f64 = 5.0;

/// Classification of one back-to-back transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    OnTime,
    /// Makeable, but with less than the safety margin to spare.
    Risky,
    /// The agent cannot arrive before the next tour starts.
    Late,
}

impl Severity {
    /// Classifies lateness = required − available minutes.
    pub fn classify(lateness_minutes: f64) -> Self {
        if lateness_minutes > 0.0 {
            Severity::Late
        } else if lateness_minutes > -RISK_MARGIN_MINUTES {
            Severity::Risky
        } else {
            Severity::OnTime
        }
    }
}

/// One analyzed transition between back-to-back escorted tours.
#[derive(Debug, Clone)]
pub struct LatenessIncident {
    pub agent: AgentId,
    pub agent_name: String,
    pub date: i64,
    pub from_property: PropertyId,
    pub from_property_name: String,
    pub to_property: PropertyId,
    pub to_property_name: String,
    /// End of the earlier tour, epoch seconds.
    pub current_end: i64,
    /// Start of the later tour, epoch seconds.
    pub next_start: i64,
    /// Gap between the tours in minutes; negative when they overlap.
    pub available_minutes: f64,
    pub required_minutes: f64,
    /// required − available; positive means the agent arrives late.
    pub lateness_minutes: f64,
    pub severity: Severity,
}

/// Per-agent transition counts and lateness statistics.
#[derive(Debug, Clone)]
pub struct AgentLatenessSummary {
    pub agent: AgentId,
    pub agent_name: String,
    pub transitions: usize,
    pub late: usize,
    pub risky: usize,
    pub on_time: usize,
    pub lateness_rate: f64,
    /// (late + risky) / transitions.
    pub risk_rate: f64,
    pub total_lateness_minutes: f64,
    pub avg_lateness_minutes: f64,
    pub max_lateness_minutes: f64,
    pub has_issues: bool,
}

/// Per-date incident roll-up.
#[derive(Debug, Clone)]
pub struct DailyLatenessStats {
    pub date: i64,
    pub late: usize,
    pub risky: usize,
    /// Sum of positive lateness only.
    pub total_lateness_minutes: f64,
    pub agents_affected: usize,
}

/// System-wide lateness statistics.
#[derive(Debug, Clone)]
pub struct SystemLatenessStats {
    pub total_agents: usize,
    pub agents_with_late_incidents: usize,
    pub agents_with_any_issues: usize,
    pub late: usize,
    pub risky: usize,
    pub transitions: usize,
    pub lateness_rate: f64,
    pub risk_rate: f64,
    /// Mean of the per-agent average lateness per incident.
    pub avg_lateness_per_incident: f64,
}

#[derive(Debug, Clone)]
pub struct LatenessReport {
    pub incidents: Vec<LatenessIncident>,
    pub agents: Vec<AgentLatenessSummary>,
    pub daily: Vec<DailyLatenessStats>,
    pub system: SystemLatenessStats,
}

/// A transition that stays impossible even with the safety buffer added.
#[derive(Debug, Clone)]
pub struct ScheduleConflict {
    pub agent: AgentId,
    pub date: i64,
    /// How many minutes short the agent falls, buffer included.
    pub severity_minutes: f64,
    pub available_minutes: f64,
    /// Travel time plus buffer.
    pub required_minutes: f64,
    pub current_end: i64,
    pub next_start: i64,
}

/// Consecutive event pairs in one agent's full schedule that require
/// travel: both escorted, same date, different properties. Pairs must be
/// strictly adjacent; an intervening virtual tour breaks the pair.
fn travel_pairs(events: &[TourEvent]) -> BTreeMap<AgentId, Vec<(&TourEvent, &TourEvent)>> {
    let mut by_agent: BTreeMap<AgentId, Vec<&TourEvent>> = BTreeMap::new();
    for event in events {
        by_agent.entry(event.agent.clone()).or_default().push(event);
    }

    let mut pairs = BTreeMap::new();
    for (agent, mut schedule) in by_agent {
        schedule.sort_by_key(|e| e.start);
        let agent_pairs: Vec<(&TourEvent, &TourEvent)> = schedule
            .windows(2)
            .filter_map(|w| {
                let (current, next) = (w[0], w[1]);
                let needs_travel = current.kind.is_escorted()
                    && next.kind.is_escorted()
                    && current.date() == next.date()
                    && current.property != next.property;
                needs_travel.then_some((current, next))
            })
            .collect();
        pairs.insert(agent, agent_pairs);
    }
    pairs
}

fn available_minutes(current: &TourEvent, next: &TourEvent) -> f64 {
    (next.start - current.end) as f64 / 60.0
}

/// Classifies every travel transition in the original assignment and
/// aggregates per agent, per date, and system-wide.
pub fn analyze_lateness(
    events: &[TourEvent],
    matrix: &TravelMatrix,
    agents: &AgentDirectory,
    properties: &PropertyDirectory,
) -> Result<LatenessReport, MatrixError> {
    let mut incidents = Vec::new();
    let mut summaries = Vec::new();

    for (agent, pairs) in travel_pairs(events) {
        let agent_name = agents.name_of(&agent).to_string();
        let mut late = 0;
        let mut risky = 0;
        let mut total_lateness = 0.0;
        let mut max_lateness = 0.0_f64;

        for (current, next) in &pairs {
            let available = available_minutes(current, next);
            let required = matrix.minutes(&current.property, &next.property)?;
            let lateness = required - available;
            let severity = Severity::classify(lateness);

            match severity {
                Severity::Late => {
                    late += 1;
                    total_lateness += lateness;
                    max_lateness = max_lateness.max(lateness);
                }
                Severity::Risky => risky += 1,
                Severity::OnTime => {}
            }

            incidents.push(LatenessIncident {
                agent: agent.clone(),
                agent_name: agent_name.clone(),
                date: current.date(),
                from_property: current.property.clone(),
                from_property_name: properties.name_of(&current.property).to_string(),
                to_property: next.property.clone(),
                to_property_name: properties.name_of(&next.property).to_string(),
                current_end: current.end,
                next_start: next.start,
                available_minutes: available,
                required_minutes: required,
                lateness_minutes: lateness,
                severity,
            });
        }

        let transitions = pairs.len();
        summaries.push(AgentLatenessSummary {
            agent,
            agent_name,
            transitions,
            late,
            risky,
            on_time: transitions - late - risky,
            lateness_rate: rate(late, transitions),
            risk_rate: rate(late + risky, transitions),
            total_lateness_minutes: total_lateness,
            avg_lateness_minutes: if late > 0 {
                total_lateness / late as f64
            } else {
                0.0
            },
            max_lateness_minutes: max_lateness,
            has_issues: late > 0 || risky > 0,
        });
    }

    let daily = daily_stats(&incidents);
    let system = system_stats(&summaries);

    Ok(LatenessReport {
        incidents,
        agents: summaries,
        daily,
        system,
    })
}

fn daily_stats(incidents: &[LatenessIncident]) -> Vec<DailyLatenessStats> {
    let mut by_date: BTreeMap<i64, (usize, usize, f64, BTreeSet<&AgentId>)> = BTreeMap::new();
    for incident in incidents {
        if incident.severity == Severity::OnTime {
            continue;
        }
        let entry = by_date.entry(incident.date).or_default();
        entry.3.insert(&incident.agent);
        match incident.severity {
            Severity::Late => {
                entry.0 += 1;
                entry.2 += incident.lateness_minutes;
            }
            Severity::Risky => entry.1 += 1,
            Severity::OnTime => {}
        }
    }

    by_date
        .into_iter()
        .map(|(date, (late, risky, total, agents))| DailyLatenessStats {
            date,
            late,
            risky,
            total_lateness_minutes: total,
            agents_affected: agents.len(),
        })
        .collect()
}

fn system_stats(summaries: &[AgentLatenessSummary]) -> SystemLatenessStats {
    let late: usize = summaries.iter().map(|a| a.late).sum();
    let risky: usize = summaries.iter().map(|a| a.risky).sum();
    let transitions: usize = summaries.iter().map(|a| a.transitions).sum();
    let per_agent_avgs: Vec<f64> = summaries.iter().map(|a| a.avg_lateness_minutes).collect();

    SystemLatenessStats {
        total_agents: summaries.len(),
        agents_with_late_incidents: summaries.iter().filter(|a| a.late > 0).count(),
        agents_with_any_issues: summaries.iter().filter(|a| a.has_issues).count(),
        late,
        risky,
        transitions,
        lateness_rate: rate(late, transitions),
        risk_rate: rate(late + risky, transitions),
        avg_lateness_per_incident: mean(&per_agent_avgs),
    }
}

/// Flags transitions that are physically impossible once `buffer_minutes`
/// is added to the travel time: `available < required + buffer`.
///
/// Stricter than, and independent of, the lateness classification: with a
/// zero buffer every conflict is also classified late.
pub fn find_impossible_schedules(
    events: &[TourEvent],
    matrix: &TravelMatrix,
    buffer_minutes: f64,
) -> Result<Vec<ScheduleConflict>, MatrixError> {
    let mut conflicts = Vec::new();

    for (agent, pairs) in travel_pairs(events) {
        for (current, next) in pairs {
            let available = available_minutes(current, next);
            let required = matrix.minutes(&current.property, &next.property)? + buffer_minutes;
            if available < required {
                conflicts.push(ScheduleConflict {
                    agent: agent.clone(),
                    date: current.date(),
                    severity_minutes: required - available,
                    available_minutes: available,
                    required_minutes: required,
                    current_end: current.end,
                    next_start: next.start,
                });
            }
        }
    }

    Ok(conflicts)
}

fn rate(count: usize, total: usize) -> f64 {
    if total > 0 {
        count as f64 / total as f64
    } else {
        0.0
    }
}
