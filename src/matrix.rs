//! Travel-time estimation and the property-to-property minutes matrix.
//!
//! Travel costs are computed once per property pair and cached in a dense
//! matrix; downstream components only ever look them up. Two providers are
//! available: a great-circle estimator (always available, ignores roads)
//! and an OSRM-style table service client.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::model::PropertyId;

/// Average urban driving speed assumption for time estimation.
const DEFAULT_SPEED_MPH: f64 = 25.0;

/// Fixed per-trip overhead (parking, walking in) in minutes.
const DEFAULT_OVERHEAD_MINUTES: f64 = 2.0;

/// Minimum duration of any trip between distinct properties, in minutes.
const DEFAULT_FLOOR_MINUTES: f64 = 5.0;

/// Earth radius in miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Produces an n×n travel-time grid, in minutes, for a list of coordinates.
///
/// The grid is indexed by the provided location order and has a zero
/// diagonal. Implementations need not be symmetric.
pub trait TravelTimeProvider {
    fn minutes_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<f64>>;
}

/// Great-circle travel-time estimator.
///
/// Estimates driving time from straight-line distance at an assumed average
/// speed, plus a fixed per-trip overhead, floored at a minimum trip
/// duration. Crude but always available; distinct properties never cost
/// less than the floor.
#[derive(Debug, Clone)]
pub struct GreatCircleEstimator {
    /// Assumed average driving speed in mph.
    pub speed_mph: f64,
    /// Fixed overhead added to every trip, in minutes.
    pub overhead_minutes: f64,
    /// Minimum minutes for any trip between distinct locations.
    pub floor_minutes: f64,
}

impl Default for GreatCircleEstimator {
    fn default() -> Self {
        Self {
            speed_mph: DEFAULT_SPEED_MPH,
            overhead_minutes: DEFAULT_OVERHEAD_MINUTES,
            floor_minutes: DEFAULT_FLOOR_MINUTES,
        }
    }
}

impl GreatCircleEstimator {
    pub fn new(speed_mph: f64, overhead_minutes: f64, floor_minutes: f64) -> Self {
        Self {
            speed_mph,
            overhead_minutes,
            floor_minutes,
        }
    }

    /// Great-circle distance between two (lat, lng) points in miles.
    fn great_circle_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_MILES * c
    }

    /// Estimated minutes for one trip between distinct locations.
    fn trip_minutes(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        let miles = Self::great_circle_miles(from, to);
        let minutes = (miles / self.speed_mph) * 60.0 + self.overhead_minutes;
        minutes.max(self.floor_minutes)
    }
}

impl TravelTimeProvider for GreatCircleEstimator {
    fn minutes_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<f64>> {
        let n = locations.len();
        let mut grid = vec![vec![0.0; n]; n];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                if i != j {
                    grid[i][j] = self.trip_minutes(*from, *to);
                }
            }
        }

        grid
    }
}

#[derive(Debug, Clone)]
pub struct TableServiceConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for TableServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

/// HTTP client for an OSRM-style `/table` travel-time service.
///
/// Returns an empty grid when the service is unreachable so callers can
/// fall back to [`GreatCircleEstimator`].
#[derive(Debug, Clone)]
pub struct TableServiceClient {
    config: TableServiceConfig,
    client: reqwest::blocking::Client,
}

impl TableServiceClient {
    pub fn new(config: TableServiceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl TravelTimeProvider for TableServiceClient {
    fn minutes_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<f64>> {
        if locations.is_empty() {
            return Vec::new();
        }

        let coords = locations
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration",
            self.config.base_url, self.config.profile, coords
        );

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<TableResponse>());

        match response {
            Ok(body) => body
                .durations
                .unwrap_or_default()
                .into_iter()
                .map(|row| row.into_iter().map(|seconds| seconds / 60.0).collect())
                .collect(),
            Err(err) => {
                warn!(error = %err, "table service request failed, returning empty grid");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    durations: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("property {0} is not present in the travel matrix")]
    UnknownProperty(PropertyId),
    #[error("provider returned a grid of {got} rows for {expected} locations")]
    ShapeMismatch { expected: usize, got: usize },
}

/// Dense property-to-property travel-time matrix, in minutes.
///
/// Row-major storage with an id-to-index map. The diagonal is exactly zero.
/// Lookups are directional (from → to); symmetry is not assumed. A lookup
/// on an unknown property id is a configuration error, never silently
/// defaulted.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    ids: Vec<PropertyId>,
    index: HashMap<PropertyId, usize>,
    data: Vec<f64>,
}

impl TravelMatrix {
    /// Builds the matrix once from property coordinates using a provider.
    pub fn build<P: TravelTimeProvider>(
        properties: &[(PropertyId, (f64, f64))],
        provider: &P,
    ) -> Result<Self, MatrixError> {
        let locations: Vec<(f64, f64)> = properties.iter().map(|(_, c)| *c).collect();
        let grid = provider.minutes_for(&locations);
        if grid.len() != properties.len() {
            return Err(MatrixError::ShapeMismatch {
                expected: properties.len(),
                got: grid.len(),
            });
        }

        let mut data = Vec::with_capacity(properties.len() * properties.len());
        for row in &grid {
            if row.len() != properties.len() {
                return Err(MatrixError::ShapeMismatch {
                    expected: properties.len(),
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        let ids: Vec<PropertyId> = properties.iter().map(|(id, _)| id.clone()).collect();
        Ok(Self::from_parts(ids, data))
    }

    /// Creates a matrix from an explicit row-major grid of minutes.
    ///
    /// Fails unless `data.len() == ids.len() * ids.len()`.
    pub fn from_entries(ids: Vec<PropertyId>, data: Vec<f64>) -> Result<Self, MatrixError> {
        if data.len() != ids.len() * ids.len() {
            return Err(MatrixError::ShapeMismatch {
                expected: ids.len() * ids.len(),
                got: data.len(),
            });
        }
        Ok(Self::from_parts(ids, data))
    }

    fn from_parts(ids: Vec<PropertyId>, data: Vec<f64>) -> Self {
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self { ids, index, data }
    }

    /// Directional travel time in minutes from one property to another.
    pub fn minutes(&self, from: &PropertyId, to: &PropertyId) -> Result<f64, MatrixError> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        Ok(self.data[from_idx * self.ids.len() + to_idx])
    }

    fn index_of(&self, id: &PropertyId) -> Result<usize, MatrixError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| MatrixError::UnknownProperty(id.clone()))
    }

    pub fn contains(&self, id: &PropertyId) -> bool {
        self.index.contains_key(id)
    }

    pub fn property_ids(&self) -> &[PropertyId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `true` if every pair agrees within `tol` both directions.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        let n = self.ids.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if (self.data[i * n + j] - self.data[j * n + i]).abs() > tol {
                    return false;
                }
            }
        }
        true
    }
}
