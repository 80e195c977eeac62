//! Track geometry: lanes, positions, segments and board coordinates.
//!
//! The oval has 96 positions per lane. Position 96 is the start grid, just
//! behind the start/finish line; moving from 96 to 1 crosses the line.
//! Four lanes run side by side, lane 1 innermost.
//!
//! ## Layout (lane 1)
//!
//! | Positions  | Segment          |
//! |------------|------------------|
//! | 96, 1-5    | right straight   |
//! | 6-19       | first corner     |
//! | 20-29      | top straight     |
//! | 30-43      | second corner    |
//! | 44-53      | left straight    |
//! | 54-67      | third corner     |
//! | 68-77      | bottom straight  |
//! | 78-91      | fourth corner    |
//! | 92-95      | final straight   |
//!
//! Each lane further out is offset by [`LANE_SPACING`]: straights shift
//! sideways, corners widen their radius.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Positions per lap.
pub const TRACK_POSITIONS: u8 = 96;
/// Number of lanes.
pub const LANES: u8 = 4;
/// Start grid position.
pub const START_POSITION: u8 = 96;
/// Highest position a coin may be placed on; 93-96 are the start/finish
/// and pit buffer.
pub const LAST_COIN_POSITION: u8 = 92;
/// Spaces after the line that stay clear of coins in occupied starting lanes.
pub const START_BUFFER: u8 = 6;
/// Bays in the pit.
pub const PIT_BAYS: u8 = 4;
/// Cells in the pit lane.
pub const PIT_LANE_CELLS: u8 = 5;
/// Distance between neighbouring lanes.
pub const LANE_SPACING: f64 = 1.0;

const INNER_STRAIGHT_DISTANCE: f64 = 14.4174;
const INNER_CORNER_RADIUS: f64 = 9.4174;
const CORNER_CENTRE: f64 = 5.0;
const CORNER_SPACES: u8 = 14;

const PIT_BAY_COORDINATES: [Coordinates; PIT_BAYS as usize] = [
    Coordinates { x: 12.0, y: 0.7 },
    Coordinates { x: 12.0, y: 1.9 },
    Coordinates { x: 12.0, y: 3.1 },
    Coordinates { x: 12.0, y: 4.3 },
];

const PIT_LANE_COORDINATES: [Coordinates; PIT_LANE_CELLS as usize] = [
    Coordinates { x: 13.4174, y: 0.5 },
    Coordinates { x: 13.4174, y: 1.5 },
    Coordinates { x: 13.4174, y: 2.5 },
    Coordinates { x: 13.4174, y: 3.5 },
    Coordinates { x: 13.4174, y: 4.5 },
];

/// A lane number, always 1..=4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Lane(u8);

impl Lane {
    /// All lanes, innermost first.
    pub const ALL: [Lane; LANES as usize] = [Lane(1), Lane(2), Lane(3), Lane(4)];

    /// Create a lane, or `None` outside 1..=4.
    #[must_use]
    pub const fn new(n: u8) -> Option<Self> {
        if n >= 1 && n <= LANES {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Lane number (1..=4).
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Lane `delta` lanes away, or `None` if that falls off the track.
    #[must_use]
    pub fn offset(self, delta: i8) -> Option<Self> {
        let n = self.0 as i16 + delta as i16;
        u8::try_from(n).ok().and_then(Self::new)
    }
}

impl TryFrom<u8> for Lane {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Lane::new(value).ok_or_else(|| format!("lane must be 1-{LANES}, got {value}"))
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> Self {
        lane.0
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lane {}", self.0)
    }
}

/// Board coordinates in track units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// A main-track cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Spot {
    pub position: u8,
    pub lane: Lane,
}

impl Spot {
    #[must_use]
    pub const fn new(position: u8, lane: Lane) -> Self {
        Self { position, lane }
    }

    /// Board coordinates of this cell.
    #[must_use]
    pub fn coordinates(self) -> Option<Coordinates> {
        coordinates(self.position, self.lane)
    }
}

/// Named stretch of the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Segment {
    RightStraight,
    FirstCorner,
    TopStraight,
    SecondCorner,
    LeftStraight,
    ThirdCorner,
    BottomStraight,
    FourthCorner,
    FinalStraight,
}

impl Segment {
    /// Segment containing `position`. Positions outside 1..=96 have none.
    #[must_use]
    pub fn of(position: u8) -> Option<Self> {
        let segment = match position {
            1..=5 | 96 => Segment::RightStraight,
            6..=19 => Segment::FirstCorner,
            20..=29 => Segment::TopStraight,
            30..=43 => Segment::SecondCorner,
            44..=53 => Segment::LeftStraight,
            54..=67 => Segment::ThirdCorner,
            68..=77 => Segment::BottomStraight,
            78..=91 => Segment::FourthCorner,
            92..=95 => Segment::FinalStraight,
            _ => return None,
        };
        Some(segment)
    }

    /// True for the four corners.
    #[must_use]
    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Segment::FirstCorner | Segment::SecondCorner | Segment::ThirdCorner | Segment::FourthCorner
        )
    }
}

/// True for a valid main-track position.
#[must_use]
pub fn is_track_position(position: u8) -> bool {
    (1..=TRACK_POSITIONS).contains(&position)
}

/// Position one step forward, wrapping 96 to 1.
#[must_use]
pub fn next_position(position: u8) -> u8 {
    if position >= TRACK_POSITIONS {
        1
    } else {
        position + 1
    }
}

/// Position one step back, wrapping 1 to 96.
#[must_use]
pub fn previous_position(position: u8) -> u8 {
    if position <= 1 {
        TRACK_POSITIONS
    } else {
        position - 1
    }
}

/// Board coordinates of a main-track cell.
///
/// Returns `None` for positions outside 1..=96.
#[must_use]
pub fn coordinates(position: u8, lane: Lane) -> Option<Coordinates> {
    let segment = Segment::of(position)?;
    let offset = (lane.number() - 1) as f64 * LANE_SPACING;
    let straight = INNER_STRAIGHT_DISTANCE + offset;
    let p = position as f64;

    let coords = match segment {
        Segment::RightStraight if position == START_POSITION => Coordinates { x: straight, y: -0.5 },
        Segment::RightStraight => Coordinates { x: straight, y: p - 0.5 },
        Segment::TopStraight => Coordinates { x: 4.5 - (p - 20.0), y: straight },
        Segment::LeftStraight => Coordinates { x: -straight, y: 4.5 - (p - 44.0) },
        Segment::BottomStraight => Coordinates { x: -4.5 + (p - 68.0), y: -straight },
        Segment::FinalStraight => Coordinates { x: straight, y: p - 96.0 - 0.5 },
        Segment::FirstCorner => corner(position - 6, 0, CORNER_CENTRE, CORNER_CENTRE, offset),
        Segment::SecondCorner => corner(position - 30, 1, -CORNER_CENTRE, CORNER_CENTRE, offset),
        Segment::ThirdCorner => corner(position - 54, 2, -CORNER_CENTRE, -CORNER_CENTRE, offset),
        Segment::FourthCorner => corner(position - 78, 3, CORNER_CENTRE, -CORNER_CENTRE, offset),
    };
    Some(coords)
}

fn corner(step: u8, quadrant: u8, cx: f64, cy: f64, offset: f64) -> Coordinates {
    let radius = INNER_CORNER_RADIUS + offset;
    let sweep = FRAC_PI_2 / CORNER_SPACES as f64;
    let angle = quadrant as f64 * FRAC_PI_2 + (step as f64 + 0.5) * sweep;
    Coordinates {
        x: cx + radius * angle.cos(),
        y: cy + radius * angle.sin(),
    }
}

/// Coordinates of a pit bay (1..=4).
#[must_use]
pub fn pit_coordinates(bay: u8) -> Option<Coordinates> {
    PIT_BAY_COORDINATES.get(bay.checked_sub(1)? as usize).copied()
}

/// Coordinates of a pit-lane cell (1..=5).
#[must_use]
pub fn pit_lane_coordinates(cell: u8) -> Option<Coordinates> {
    PIT_LANE_COORDINATES.get(cell.checked_sub(1)? as usize).copied()
}
