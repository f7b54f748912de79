//! Small domain value types shared across ingestion and serving.

/// Travel direction of a trip.
///
/// The feed encodes this as `direction_id`: 0 for northbound, 1 for
/// southbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
}

impl Direction {
    /// Infer a trip's direction from feed data.
    ///
    /// Fallback order: the explicit `direction_id` field if present, then a
    /// directional marker substring in the trip id (`..S` means southbound,
    /// `..N` northbound), then northbound as the default.
    ///
    /// The marker convention is specific to the upstream feed's trip id
    /// format and will silently stop matching if that format changes.
    pub fn infer(explicit: Option<u32>, trip_id: &str) -> Self {
        match explicit {
            Some(id) => Self::from_id(id),
            None => {
                if trip_id.contains("..S") {
                    Direction::South
                } else if trip_id.contains("..N") {
                    Direction::North
                } else {
                    Direction::North
                }
            }
        }
    }

    /// Convert a raw `direction_id` value. Anything nonzero is southbound.
    pub fn from_id(id: u32) -> Self {
        if id == 0 {
            Direction::North
        } else {
            Direction::South
        }
    }

    /// The numeric `direction_id` representation.
    pub fn as_id(self) -> i64 {
        match self {
            Direction::North => 0,
            Direction::South => 1,
        }
    }
}

/// Strip the platform-direction suffix from a stop id.
///
/// Feed stop ids often carry a trailing `N` or `S` naming the platform
/// (e.g. `R17N` is the northbound platform of station `R17`). The suffix is
/// only stripped from ids longer than 3 characters so short station codes
/// that happen to end in N or S are left alone.
pub fn base_stop_id(stop_id: &str) -> &str {
    if stop_id.len() > 3 && (stop_id.ends_with('N') || stop_id.ends_with('S')) {
        &stop_id[..stop_id.len() - 1]
    } else {
        stop_id
    }
}
