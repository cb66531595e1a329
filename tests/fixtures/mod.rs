//! Test fixtures for tour-planner.
//!
//! Provides:
//! - Builders for tour events and travel matrices
//! - Real Columbus, OH property coordinates for pipeline tests

#![allow(dead_code)]

pub mod columbus_properties;

use tour_planner::matrix::TravelMatrix;
use tour_planner::model::{
    AgentDirectory, AgentId, EventId, PropertyDirectory, PropertyId, TourEvent, TourKind,
};

/// Epoch seconds for `hour:minute` on a given day (days since epoch).
pub fn at(day: i64, hour: i64, minute: i64) -> i64 {
    day * 86_400 + hour * 3_600 + minute * 60
}

/// Builder for tour events with sensible defaults.
#[derive(Clone, Debug)]
pub struct TourBuilder {
    id: String,
    property: String,
    agent: String,
    start: i64,
    end: i64,
    kind: TourKind,
}

impl TourBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            property: "p1".to_string(),
            agent: "a1".to_string(),
            start: at(0, 9, 0),
            end: at(0, 9, 30),
            kind: TourKind::Escorted,
        }
    }

    pub fn agent(mut self, agent: &str) -> Self {
        self.agent = agent.to_string();
        self
    }

    pub fn property(mut self, property: &str) -> Self {
        self.property = property.to_string();
        self
    }

    pub fn window(mut self, start: i64, end: i64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn virtual_tour(mut self) -> Self {
        self.kind = TourKind::Virtual;
        self
    }

    pub fn build(self) -> TourEvent {
        TourEvent {
            id: EventId::new(self.id),
            property: PropertyId::new(self.property),
            agent: AgentId::new(self.agent),
            start: self.start,
            end: self.end,
            kind: self.kind,
        }
    }
}

pub fn tour(id: &str) -> TourBuilder {
    TourBuilder::new(id)
}

/// Matrix with the given minutes between every pair of distinct properties
/// and a zero diagonal.
pub fn uniform_matrix(ids: &[&str], minutes: f64) -> TravelMatrix {
    let n = ids.len();
    let mut data = vec![minutes; n * n];
    for i in 0..n {
        data[i * n + i] = 0.0;
    }
    TravelMatrix::from_entries(ids.iter().map(|id| PropertyId::from(*id)).collect(), data)
        .expect("square grid")
}

/// Matrix from an explicit row-major grid.
pub fn matrix_from(ids: &[&str], data: &[f64]) -> TravelMatrix {
    TravelMatrix::from_entries(
        ids.iter().map(|id| PropertyId::from(*id)).collect(),
        data.to_vec(),
    )
    .expect("square grid")
}

pub fn agent_directory(entries: &[(&str, &str)]) -> AgentDirectory {
    let mut directory = AgentDirectory::new();
    for (id, name) in entries {
        directory.insert(AgentId::from(*id), *name);
    }
    directory
}

pub fn property_directory(entries: &[(&str, &str)]) -> PropertyDirectory {
    let mut directory = PropertyDirectory::new();
    for (id, name) in entries {
        directory.insert(PropertyId::from(*id), *name);
    }
    directory
}
