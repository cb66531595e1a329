//! Agent-to-property concentration metrics.
//!
//! Downstream consumer of the optimizer: measures how specialized each
//! agent is to particular properties and how that shifts between the
//! original and the optimized assignment. Statistical aggregation only, no
//! scheduling logic.

use std::collections::BTreeMap;

use crate::model::{AgentDirectory, AgentId, PropertyDirectory, PropertyId, TourEvent};
use crate::travel::{mean, median};

/// Concentration profile for one agent over an event set.
#[derive(Debug, Clone)]
pub struct AgentSpecialization {
    pub agent: AgentId,
    pub agent_name: String,
    pub total_tours: usize,
    pub unique_properties: usize,
    /// Herfindahl-Hirschman index over property shares; 1/n when evenly
    /// spread, 1.0 when fully specialized.
    pub hhi: f64,
    pub top_property: Option<PropertyId>,
    pub top_property_name: String,
    /// Share of tours at the agent's most frequent property.
    pub top_property_share: f64,
    /// Share of tours at the agent's three most frequent properties.
    pub top3_share: f64,
    /// Shannon entropy over property shares; higher means more diverse.
    pub shannon_diversity: f64,
    /// Gini coefficient over per-property tour counts.
    pub gini: f64,
    /// Number of properties covering 80% of the agent's tours.
    pub properties_for_80_pct: usize,
    pub escorted_share: f64,
    pub virtual_share: f64,
    /// Composite 0–100 score; 100 means fully specialized to one property.
    pub score: f64,
}

/// How one property's tours are spread across agents.
#[derive(Debug, Clone)]
pub struct PropertyCoverage {
    pub property: PropertyId,
    pub property_name: String,
    pub total_tours: usize,
    pub unique_agents: usize,
    pub primary_agent: Option<AgentId>,
    pub primary_agent_share: f64,
    pub agent_distribution_gini: f64,
    pub single_agent: bool,
    /// Primary agent handles more than 80% of the property's tours.
    pub highly_concentrated: bool,
}

/// Per-agent score movement between two assignments.
#[derive(Debug, Clone)]
pub struct SpecializationDelta {
    pub agent: AgentId,
    pub agent_name: String,
    pub score_before: f64,
    pub score_after: f64,
    pub change: f64,
}

/// Full before/after comparison.
#[derive(Debug, Clone)]
pub struct SpecializationComparison {
    pub before: Vec<AgentSpecialization>,
    pub after: Vec<AgentSpecialization>,
    pub before_coverage: Vec<PropertyCoverage>,
    pub after_coverage: Vec<PropertyCoverage>,
    pub deltas: Vec<SpecializationDelta>,
    pub avg_score_change: f64,
    pub median_score_change: f64,
    pub agents_more_specialized: usize,
    pub agents_less_specialized: usize,
    pub single_agent_property_change: i64,
    pub concentrated_property_change: i64,
}

/// Tour counts per key, sorted by count descending then key ascending so
/// ties resolve deterministically.
fn ranked_counts<K: Ord>(items: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Gini coefficient over a count distribution. 0 = perfectly equal,
/// approaching 1 = maximum inequality.
fn gini(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mut cumulative = 0.0;
    let mut cumulative_sum = 0.0;
    for value in &sorted {
        cumulative += value;
        cumulative_sum += cumulative;
    }
    if cumulative <= 0.0 {
        return 0.0;
    }
    (n + 1.0 - 2.0 * cumulative_sum / cumulative) / n
}

/// Composite specialization score combining concentration, top-property
/// share, and a diversity penalty, capped at 100.
fn composite_score(hhi: f64, top_share: f64, unique_properties: usize, total_tours: usize) -> f64 {
    let diversity_penalty = if total_tours > 0 {
        (100.0 - (unique_properties.saturating_sub(1)) as f64 * 10.0).max(0.0)
    } else {
        0.0
    };
    let score = hhi * 100.0 * 0.4 + top_share * 100.0 * 0.4 + diversity_penalty * 0.2;
    score.min(100.0)
}

/// Number of leading shares whose cumulative sum stays within 80%, plus
/// one for the share that crosses it.
fn properties_for_80_pct(ranked: &[(PropertyId, usize)], total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let mut cumulative = 0.0;
    let mut within = 0;
    for (_, count) in ranked {
        cumulative += *count as f64 / total as f64;
        if cumulative <= 0.8 {
            within += 1;
        } else {
            break;
        }
    }
    (within + 1).min(ranked.len())
}

/// Computes the specialization profile for every agent in the event set.
pub fn agent_specialization(
    events: &[TourEvent],
    agents: &AgentDirectory,
    properties: &PropertyDirectory,
) -> Vec<AgentSpecialization> {
    let mut by_agent: BTreeMap<AgentId, Vec<&TourEvent>> = BTreeMap::new();
    for event in events {
        by_agent.entry(event.agent.clone()).or_default().push(event);
    }

    let mut profiles = Vec::with_capacity(by_agent.len());
    for (agent, tours) in by_agent {
        let total = tours.len();
        let ranked = ranked_counts(tours.iter().map(|e| e.property.clone()));
        let shares: Vec<f64> = ranked.iter().map(|(_, c)| *c as f64 / total as f64).collect();

        let hhi: f64 = shares.iter().map(|s| s * s).sum();
        let shannon: f64 = -shares
            .iter()
            .filter(|&&s| s > 0.0)
            .map(|s| s * s.ln())
            .sum::<f64>();
        let top_share = shares.first().copied().unwrap_or(0.0);
        let top3_share: f64 = shares.iter().take(3).sum();
        let top_property = ranked.first().map(|(id, _)| id.clone());
        let escorted = tours.iter().filter(|e| e.kind.is_escorted()).count();
        let counts: Vec<usize> = ranked.iter().map(|(_, c)| *c).collect();

        profiles.push(AgentSpecialization {
            agent_name: agents.name_of(&agent).to_string(),
            agent,
            total_tours: total,
            unique_properties: ranked.len(),
            hhi,
            top_property_name: top_property
                .as_ref()
                .map(|id| properties.name_of(id).to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            top_property,
            top_property_share: top_share,
            top3_share,
            shannon_diversity: shannon,
            gini: gini(&counts),
            properties_for_80_pct: properties_for_80_pct(&ranked, total),
            escorted_share: if total > 0 {
                escorted as f64 / total as f64
            } else {
                0.0
            },
            virtual_share: if total > 0 {
                (total - escorted) as f64 / total as f64
            } else {
                0.0
            },
            score: composite_score(hhi, top_share, ranked.len(), total),
        });
    }
    profiles
}

/// Per-property agent coverage for every property appearing in the events.
pub fn property_coverage(
    events: &[TourEvent],
    properties: &PropertyDirectory,
) -> Vec<PropertyCoverage> {
    let mut by_property: BTreeMap<PropertyId, Vec<&TourEvent>> = BTreeMap::new();
    for event in events {
        by_property
            .entry(event.property.clone())
            .or_default()
            .push(event);
    }

    let mut coverage = Vec::with_capacity(by_property.len());
    for (property, tours) in by_property {
        let total = tours.len();
        let ranked = ranked_counts(tours.iter().map(|e| e.agent.clone()));
        let primary_share = ranked
            .first()
            .map(|(_, c)| *c as f64 / total as f64)
            .unwrap_or(0.0);
        let counts: Vec<usize> = ranked.iter().map(|(_, c)| *c).collect();

        coverage.push(PropertyCoverage {
            property_name: properties.name_of(&property).to_string(),
            property,
            total_tours: total,
            unique_agents: ranked.len(),
            primary_agent: ranked.first().map(|(id, _)| id.clone()),
            primary_agent_share: primary_share,
            agent_distribution_gini: gini(&counts),
            single_agent: ranked.len() == 1,
            highly_concentrated: primary_share > 0.8,
        });
    }
    coverage
}

/// Compares specialization before and after optimization.
pub fn compare_specialization(
    original: &[TourEvent],
    optimized: &[TourEvent],
    agents: &AgentDirectory,
    properties: &PropertyDirectory,
) -> SpecializationComparison {
    let before = agent_specialization(original, agents, properties);
    let after = agent_specialization(optimized, agents, properties);
    let before_coverage = property_coverage(original, properties);
    let after_coverage = property_coverage(optimized, properties);

    let after_scores: BTreeMap<&AgentId, f64> =
        after.iter().map(|a| (&a.agent, a.score)).collect();
    let deltas: Vec<SpecializationDelta> = before
        .iter()
        .map(|b| {
            let score_after = after_scores.get(&b.agent).copied().unwrap_or(0.0);
            SpecializationDelta {
                agent: b.agent.clone(),
                agent_name: b.agent_name.clone(),
                score_before: b.score,
                score_after,
                change: score_after - b.score,
            }
        })
        .collect();

    let changes: Vec<f64> = deltas.iter().map(|d| d.change).collect();
    let single_before = before_coverage.iter().filter(|p| p.single_agent).count() as i64;
    let single_after = after_coverage.iter().filter(|p| p.single_agent).count() as i64;
    let concentrated_before = before_coverage
        .iter()
        .filter(|p| p.highly_concentrated)
        .count() as i64;
    let concentrated_after = after_coverage
        .iter()
        .filter(|p| p.highly_concentrated)
        .count() as i64;

    SpecializationComparison {
        avg_score_change: mean(&changes),
        median_score_change: median(&changes),
        agents_more_specialized: deltas.iter().filter(|d| d.change > 0.0).count(),
        agents_less_specialized: deltas.iter().filter(|d| d.change < 0.0).count(),
        single_agent_property_change: single_after - single_before,
        concentrated_property_change: concentrated_after - concentrated_before,
        before,
        after,
        before_coverage,
        after_coverage,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini_equal_and_skewed() {
        assert_eq!(gini(&[]), 0.0);
        assert!(gini(&[3, 3, 3]).abs() < 1e-9);
        // [1, 3]: sorted cumsums 1, 4 -> (3 - 2*5/4) / 2 = 0.25
        assert!((gini(&[1, 3]) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_composite_score_single_property() {
        // Fully specialized: hhi 1, share 1, one property
        assert_eq!(composite_score(1.0, 1.0, 1, 10), 100.0);
    }

    #[test]
    fn test_composite_score_even_split() {
        // Two properties evenly: 0.4*50 + 0.4*50 + 0.2*90 = 58
        let score = composite_score(0.5, 0.5, 2, 10);
        assert!((score - 58.0).abs() < 1e-9);
    }

    #[test]
    fn test_properties_for_80_pct() {
        let ranked = vec![
            (PropertyId::from("a"), 8),
            (PropertyId::from("b"), 1),
            (PropertyId::from("c"), 1),
        ];
        // Leading share is exactly 0.8, so the crossing share is the second.
        assert_eq!(properties_for_80_pct(&ranked, 10), 2);
        assert_eq!(properties_for_80_pct(&[], 0), 0);

        let dominant = vec![(PropertyId::from("a"), 9), (PropertyId::from("b"), 1)];
        assert_eq!(properties_for_80_pct(&dominant, 10), 1);
    }
}
