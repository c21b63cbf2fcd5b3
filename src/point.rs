// MIT License - Copyright (c) 2026 Peter Wright
// Point status records

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{FacpError, Result};

/// Point addressing family, derived from the first character of the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointType {
    /// 'A' - Analog (addressable) point
    Analog,
    /// 'P' - Digital (pseudo) point
    Digital,
    /// 'M' - MAPNET point
    Mapnet,
    /// Anything else - physical I/O (zones, relays, signals)
    Physical,
}

impl PointType {
    pub fn from_point_id(point_id: &str) -> Self {
        match point_id.chars().next() {
            Some('A') => Self::Analog,
            Some('P') => Self::Digital,
            Some('M') => Self::Mapnet,
            _ => Self::Physical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analog => "Analog",
            Self::Digital => "Digital",
            Self::Mapnet => "Mapnet",
            Self::Physical => "Physical",
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition category, derived from the first character of the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateType {
    /// 'C'
    Control,
    /// 'T'
    Trouble,
    /// 'U'
    Utility,
    /// 'F'
    Fire,
    /// 'S'
    Supervisory,
    /// 'P'
    Priority2,
    Unknown,
}

impl StateType {
    pub fn from_char(c: char) -> Self {
        match c {
            'C' => Self::Control,
            'T' => Self::Trouble,
            'U' => Self::Utility,
            'F' => Self::Fire,
            'S' => Self::Supervisory,
            'P' => Self::Priority2,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "Control",
            Self::Trouble => "Trouble",
            Self::Utility => "Utility",
            Self::Fire => "Fire",
            Self::Supervisory => "Supervisory",
            Self::Priority2 => "Priority2",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted row of the point list, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPoint {
    pub point_id: String,
    pub status_code: String,
}

impl RawPoint {
    /// Split a point-list row on whitespace into id and status code.
    ///
    /// Extra tokens after the status code are ignored. Rows with fewer
    /// than two tokens are rejected.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(point_id), Some(status_code)) => Ok(Self {
                point_id: point_id.to_string(),
                status_code: status_code.to_string(),
            }),
            _ => Err(FacpError::MalformedLine {
                line: line.to_string(),
            }),
        }
    }
}

/// Interpreted status of a single point at one poll.
///
/// The 3-character status code reads as `<state><active><ack>`: e.g. `F1-`
/// is an active, acknowledged fire condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointStatus {
    pub point_id: String,
    pub status_code: String,
    pub point_type: PointType,
    pub state_type: StateType,
    pub is_active: bool,
    pub is_acknowledged: bool,
    pub observed_at: DateTime<Utc>,
}

impl PointStatus {
    /// Build a status record from a point id and its status code.
    ///
    /// Fails with [`FacpError::MalformedLine`] if the code is shorter than
    /// three characters.
    pub fn new(point_id: &str, status_code: &str, observed_at: DateTime<Utc>) -> Result<Self> {
        let mut chars = status_code.chars();
        let (Some(state), Some(active), Some(ack)) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(FacpError::MalformedLine {
                line: format!("{} {}", point_id, status_code),
            });
        };

        Ok(Self {
            point_id: point_id.to_string(),
            status_code: status_code.to_string(),
            point_type: PointType::from_point_id(point_id),
            state_type: StateType::from_char(state),
            is_active: active == '1',
            is_acknowledged: ack == '-',
            observed_at,
        })
    }

    pub fn from_raw(raw: &RawPoint, observed_at: DateTime<Utc>) -> Result<Self> {
        Self::new(&raw.point_id, &raw.status_code, observed_at)
    }
}
