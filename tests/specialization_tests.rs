//! Agent specialization and property coverage tests.

mod fixtures;

use fixtures::{agent_directory, at, property_directory, tour};
use tour_planner::model::{AgentId, PropertyId};
use tour_planner::specialization::{
    agent_specialization, compare_specialization, property_coverage,
};

#[test]
fn fully_specialized_agent_scores_one_hundred() {
    let agents = agent_directory(&[("a1", "Ada")]);
    let properties = property_directory(&[("A", "Aspen Court")]);
    let events: Vec<_> = (0..5)
        .map(|i| {
            tour(&format!("t{i}"))
                .property("A")
                .window(at(i, 9, 0), at(i, 9, 30))
                .build()
        })
        .collect();

    let profiles = agent_specialization(&events, &agents, &properties);
    assert_eq!(profiles.len(), 1);
    let ada = &profiles[0];
    assert_eq!(ada.agent_name, "Ada");
    assert_eq!(ada.total_tours, 5);
    assert_eq!(ada.unique_properties, 1);
    assert!((ada.hhi - 1.0).abs() < 1e-9);
    assert_eq!(ada.top_property, Some(PropertyId::from("A")));
    assert_eq!(ada.top_property_name, "Aspen Court");
    assert_eq!(ada.top_property_share, 1.0);
    assert_eq!(ada.shannon_diversity, 0.0);
    assert_eq!(ada.gini, 0.0);
    assert_eq!(ada.properties_for_80_pct, 1);
    assert_eq!(ada.score, 100.0);
    assert_eq!(ada.escorted_share, 1.0);
}

#[test]
fn even_split_lowers_concentration() {
    let agents = agent_directory(&[("a1", "Ada")]);
    let properties = property_directory(&[("A", "Aspen"), ("B", "Birch")]);
    let events: Vec<_> = (0..4)
        .map(|i| {
            tour(&format!("t{i}"))
                .property(if i % 2 == 0 { "A" } else { "B" })
                .window(at(i, 9, 0), at(i, 9, 30))
                .build()
        })
        .collect();

    let profiles = agent_specialization(&events, &agents, &properties);
    let ada = &profiles[0];
    assert_eq!(ada.unique_properties, 2);
    assert!((ada.hhi - 0.5).abs() < 1e-9);
    assert_eq!(ada.top_property_share, 0.5);
    assert!((ada.shannon_diversity - 2.0_f64.ln()).abs() < 1e-9);
    assert!((ada.score - 58.0).abs() < 1e-9);
    // Tie on counts resolves to the lower property id.
    assert_eq!(ada.top_property, Some(PropertyId::from("A")));
}

#[test]
fn mixed_tour_kinds_report_shares() {
    let agents = agent_directory(&[("a1", "Ada")]);
    let properties = property_directory(&[("A", "Aspen")]);
    let events = vec![
        tour("t1").property("A").window(at(0, 9, 0), at(0, 9, 30)).build(),
        tour("t2").property("A").window(at(0, 10, 0), at(0, 10, 30)).virtual_tour().build(),
        tour("t3").property("A").window(at(0, 11, 0), at(0, 11, 30)).virtual_tour().build(),
        tour("t4").property("A").window(at(0, 12, 0), at(0, 12, 30)).virtual_tour().build(),
    ];

    let profiles = agent_specialization(&events, &agents, &properties);
    assert_eq!(profiles[0].escorted_share, 0.25);
    assert_eq!(profiles[0].virtual_share, 0.75);
}

#[test]
fn property_coverage_flags_concentration() {
    let properties = property_directory(&[("A", "Aspen"), ("B", "Birch")]);
    let mut events = vec![
        // Property A: a1 handles 9 of 10 tours.
        tour("s").property("A").agent("a2").window(at(0, 8, 0), at(0, 8, 30)).build(),
    ];
    for i in 0..9 {
        events.push(
            tour(&format!("t{i}"))
                .property("A")
                .agent("a1")
                .window(at(i, 9, 0), at(i, 9, 30))
                .build(),
        );
    }
    // Property B: only a2.
    events.push(tour("u").property("B").agent("a2").window(at(0, 10, 0), at(0, 10, 30)).build());

    let coverage = property_coverage(&events, &properties);
    assert_eq!(coverage.len(), 2);

    let a = coverage.iter().find(|c| c.property == PropertyId::from("A")).unwrap();
    assert_eq!(a.property_name, "Aspen");
    assert_eq!(a.total_tours, 10);
    assert_eq!(a.unique_agents, 2);
    assert_eq!(a.primary_agent, Some(AgentId::from("a1")));
    assert_eq!(a.primary_agent_share, 0.9);
    assert!(a.highly_concentrated);
    assert!(!a.single_agent);

    let b = coverage.iter().find(|c| c.property == PropertyId::from("B")).unwrap();
    assert!(b.single_agent);
    assert!(b.highly_concentrated);
    assert_eq!(b.primary_agent_share, 1.0);
}

#[test]
fn comparison_tracks_score_movement() {
    let agents = agent_directory(&[("a1", "Ada"), ("a2", "Ben")]);
    let properties = property_directory(&[("A", "Aspen"), ("B", "Birch")]);

    // Before: both agents split across both properties.
    let original = vec![
        tour("t1").agent("a1").property("A").window(at(0, 9, 0), at(0, 9, 30)).build(),
        tour("t2").agent("a1").property("B").window(at(0, 10, 0), at(0, 10, 30)).build(),
        tour("t3").agent("a2").property("A").window(at(0, 11, 0), at(0, 11, 30)).build(),
        tour("t4").agent("a2").property("B").window(at(0, 12, 0), at(0, 12, 30)).build(),
    ];
    // After: each agent consolidated onto one property.
    let optimized = vec![
        original[0].with_agent(AgentId::from("a1")),
        original[1].with_agent(AgentId::from("a2")),
        original[2].with_agent(AgentId::from("a1")),
        original[3].with_agent(AgentId::from("a2")),
    ];

    let comparison = compare_specialization(&original, &optimized, &agents, &properties);
    assert_eq!(comparison.deltas.len(), 2);
    for delta in &comparison.deltas {
        assert!((delta.score_before - 58.0).abs() < 1e-9);
        assert_eq!(delta.score_after, 100.0);
        assert!(delta.change > 0.0);
    }
    assert_eq!(comparison.agents_more_specialized, 2);
    assert_eq!(comparison.agents_less_specialized, 0);
    assert!((comparison.avg_score_change - 42.0).abs() < 1e-9);
    assert!((comparison.median_score_change - 42.0).abs() < 1e-9);
    // Both properties became single-agent and highly concentrated.
    assert_eq!(comparison.single_agent_property_change, 2);
    assert_eq!(comparison.concentrated_property_change, 2);
}
