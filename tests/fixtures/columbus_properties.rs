//! Real Columbus, OH locations for realistic pipeline tests.

/// (lat, lng)
pub type Location = (f64, f64);

/// Downtown Columbus.
pub const DOWNTOWN: Location = (39.9612, -82.9988);

/// Short North Arts District.
pub const SHORT_NORTH: Location = (39.9773, -83.0038);

/// German Village.
pub const GERMAN_VILLAGE: Location = (39.9431, -82.9965);

/// Easton Town Center area.
pub const EASTON: Location = (40.0506, -82.9150);

/// Upper Arlington.
pub const UPPER_ARLINGTON: Location = (40.0103, -83.0713);

/// Property id, display name, and coordinates used by the pipeline tests.
pub fn portfolio() -> Vec<(&'static str, &'static str, Location)> {
    vec![
        ("P-100", "Capitol Square Flats", DOWNTOWN),
        ("P-200", "Short North Lofts", SHORT_NORTH),
        ("P-300", "Village Brick Row", GERMAN_VILLAGE),
        ("P-400", "Easton Commons", EASTON),
        ("P-500", "Arlington Heights", UPPER_ARLINGTON),
    ]
}
