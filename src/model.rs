//! Core domain types for tour schedules.
//!
//! Events arrive from external loaders already normalized; this module only
//! defines the shapes the analysis and optimization layers agree on, plus
//! the up-front validation the heuristic relies on.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::TravelMatrix;

const SECONDS_PER_DAY: i64 = 86_400;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a single scheduled tour event.
    EventId
);
string_id!(
    /// Stable identifier of a leasing agent.
    AgentId
);
string_id!(
    /// Stable identifier of a property.
    PropertyId
);

/// How a tour is conducted.
///
/// Escorted tours require the agent to be physically present at the
/// property; virtual tours consume agent time but never move the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TourKind {
    #[serde(rename = "ESCORTED")]
    Escorted,
    #[serde(rename = "VIRTUAL_TOUR")]
    Virtual,
}

impl TourKind {
    pub fn is_escorted(self) -> bool {
        matches!(self, TourKind::Escorted)
    }
}

/// One scheduled appointment.
///
/// Timestamps are epoch seconds with `end >= start`. Events are immutable
/// once loaded; the optimizer produces new events with only the agent field
/// rebound via [`TourEvent::with_agent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourEvent {
    pub id: EventId,
    pub property: PropertyId,
    pub agent: AgentId,
    /// Start timestamp, epoch seconds.
    pub start: i64,
    /// End timestamp, epoch seconds.
    pub end: i64,
    pub kind: TourKind,
}

impl TourEvent {
    /// Calendar day derived from the start timestamp (days since epoch).
    pub fn date(&self) -> i64 {
        self.start.div_euclid(SECONDS_PER_DAY)
    }

    pub fn duration_minutes(&self) -> f64 {
        (self.end - self.start) as f64 / 60.0
    }

    /// Copy of this event with the agent rebound. The temporal and property
    /// fields never change.
    pub fn with_agent(&self, agent: AgentId) -> TourEvent {
        TourEvent {
            agent,
            ..self.clone()
        }
    }
}

/// Agent id to display-name lookup, used for report labeling only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentDirectory {
    names: HashMap<AgentId, String>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: AgentId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn name_of(&self, id: &AgentId) -> &str {
        self.names.get(id).map(String::as_str).unwrap_or("Unknown")
    }
}

/// Property id to display-name lookup, used for report labeling only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDirectory {
    names: HashMap<PropertyId, String>,
}

impl PropertyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PropertyId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn name_of(&self, id: &PropertyId) -> &str {
        self.names.get(id).map(String::as_str).unwrap_or("Unknown")
    }
}

/// Input defects that must be rejected before any analysis runs.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("event {id} ends before it starts ({end} < {start})")]
    InvertedWindow { id: EventId, start: i64, end: i64 },
    #[error("event {id} references property {property} missing from the travel matrix")]
    UnknownProperty { id: EventId, property: PropertyId },
}

/// Validates the event collection against the travel matrix.
///
/// The optimizer and analyzers assume clean input; callers run this once
/// after loading and before anything else. Fails on the first defect.
pub fn validate_events(events: &[TourEvent], matrix: &TravelMatrix) -> Result<(), ModelError> {
    for event in events {
        if event.end < event.start {
            return Err(ModelError::InvertedWindow {
                id: event.id.clone(),
                start: event.start,
                end: event.end,
            });
        }
        if !matrix.contains(&event.property) {
            return Err(ModelError::UnknownProperty {
                id: event.id.clone(),
                property: event.property.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::TravelMatrix;

    fn event(id: &str, property: &str, start: i64, end: i64) -> TourEvent {
        TourEvent {
            id: EventId::from(id),
            property: PropertyId::from(property),
            agent: AgentId::from("a1"),
            start,
            end,
            kind: TourKind::Escorted,
        }
    }

    #[test]
    fn test_date_derived_from_start() {
        let e = event("e1", "p1", 3 * 86_400 + 9 * 3600, 3 * 86_400 + 10 * 3600);
        assert_eq!(e.date(), 3);
    }

    #[test]
    fn test_with_agent_rebinds_only_agent() {
        let e = event("e1", "p1", 100, 1900);
        let rebound = e.with_agent(AgentId::from("a2"));
        assert_eq!(rebound.agent, AgentId::from("a2"));
        assert_eq!(rebound.id, e.id);
        assert_eq!(rebound.property, e.property);
        assert_eq!(rebound.start, e.start);
        assert_eq!(rebound.end, e.end);
        assert_eq!(e.duration_minutes(), 30.0);
    }

    #[test]
    fn test_tour_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&TourKind::Escorted).unwrap(),
            "\"ESCORTED\""
        );
        assert_eq!(
            serde_json::from_str::<TourKind>("\"VIRTUAL_TOUR\"").unwrap(),
            TourKind::Virtual
        );
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let matrix = TravelMatrix::from_entries(
            vec![PropertyId::from("p1")],
            vec![0.0],
        )
        .unwrap();
        let bad = event("e1", "p1", 2000, 1000);
        assert!(matches!(
            validate_events(&[bad], &matrix),
            Err(ModelError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_property() {
        let matrix = TravelMatrix::from_entries(
            vec![PropertyId::from("p1")],
            vec![0.0],
        )
        .unwrap();
        let bad = event("e1", "p9", 100, 200);
        assert!(matches!(
            validate_events(&[bad], &matrix),
            Err(ModelError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_clean_events() {
        let matrix = TravelMatrix::from_entries(
            vec![PropertyId::from("p1")],
            vec![0.0],
        )
        .unwrap();
        let ok = event("e1", "p1", 100, 200);
        assert!(validate_events(&[ok], &matrix).is_ok());
    }
}
