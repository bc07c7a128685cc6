//! Core types for the intersection simulation
//!
//! Ids, headings, and the small amount of planar geometry every component
//! shares. Positions live on the ground plane: `x` grows east, `z` grows north.

use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for traffic light ids (index into the simulation's lights)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightId(pub usize);

/// A wrapper type for stop gate ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GateId(pub usize);

/// A wrapper type for vehicle ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub SimId);

/// A wrapper type for pedestrian ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PedestrianId(pub SimId);

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0 .0)
    }
}

impl fmt::Display for PedestrianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 .0)
    }
}

/// The traffic stream a light governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::NorthSouth => Axis::EastWest,
            Axis::EastWest => Axis::NorthSouth,
        }
    }

    /// Stable index for per-axis counters
    pub fn index(self) -> usize {
        match self {
            Axis::NorthSouth => 0,
            Axis::EastWest => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::NorthSouth => write!(f, "NS"),
            Axis::EastWest => write!(f, "EW"),
        }
    }
}

/// Direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    North,
    South,
    East,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::South, Heading::East, Heading::West];

    pub fn axis(self) -> Axis {
        match self {
            Heading::North | Heading::South => Axis::NorthSouth,
            Heading::East | Heading::West => Axis::EastWest,
        }
    }

    /// Unit vector of travel as (dx, dz)
    pub fn unit(self) -> (f32, f32) {
        match self {
            Heading::North => (0.0, 1.0),
            Heading::South => (0.0, -1.0),
            Heading::East => (1.0, 0.0),
            Heading::West => (-1.0, 0.0),
        }
    }

    /// Unit vector pointing to the driver's right, as (dx, dz)
    pub fn right(self) -> (f32, f32) {
        match self {
            Heading::North => (1.0, 0.0),
            Heading::South => (-1.0, 0.0),
            Heading::East => (0.0, -1.0),
            Heading::West => (0.0, 1.0),
        }
    }

    /// Distance travelled along this heading to reach `position` from the origin
    pub fn along(self, position: Position) -> f32 {
        let (dx, dz) = self.unit();
        position.x * dx + position.z * dz
    }

    pub fn arrow(self) -> char {
        match self {
            Heading::North => '^',
            Heading::South => 'v',
            Heading::East => '>',
            Heading::West => '<',
        }
    }
}

/// A 2D position on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Move `amount` along `heading`
    pub fn offset(&self, heading: Heading, amount: f32) -> Position {
        let (dx, dz) = heading.unit();
        Position::new(self.x + dx * amount, self.z + dz * amount)
    }

    /// Step toward `target` by at most `step`. Returns the new position and
    /// whether the target was reached.
    pub fn step_toward(&self, target: &Position, step: f32) -> (Position, bool) {
        let distance = self.distance(target);
        if distance <= step {
            return (*target, true);
        }
        let t = step / distance;
        let moved = Position::new(
            self.x + (target.x - self.x) * t,
            self.z + (target.z - self.z) * t,
        );
        (moved, false)
    }
}

/// An axis-aligned rectangle on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Position,
    /// Extent along x
    pub width: f32,
    /// Extent along z
    pub depth: f32,
}

impl Rect {
    pub fn new(center: Position, width: f32, depth: f32) -> Self {
        Self {
            center,
            width,
            depth,
        }
    }

    pub fn from_bounds(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            center: Position::new((min_x + max_x) / 2.0, (min_z + max_z) / 2.0),
            width: max_x - min_x,
            depth: max_z - min_z,
        }
    }

    /// A rectangle starting at `origin` and reaching `length` along `heading`,
    /// `width` wide across it
    pub fn ahead_of(origin: Position, heading: Heading, length: f32, width: f32) -> Self {
        let center = origin.offset(heading, length / 2.0);
        match heading.axis() {
            Axis::NorthSouth => Rect::new(center, width, length),
            Axis::EastWest => Rect::new(center, length, width),
        }
    }

    pub fn min_x(&self) -> f32 {
        self.center.x - self.width / 2.0
    }

    pub fn max_x(&self) -> f32 {
        self.center.x + self.width / 2.0
    }

    pub fn min_z(&self) -> f32 {
        self.center.z - self.depth / 2.0
    }

    pub fn max_z(&self) -> f32 {
        self.center.z + self.depth / 2.0
    }

    pub fn contains(&self, point: Position) -> bool {
        self.min_x() <= point.x
            && point.x <= self.max_x()
            && self.min_z() <= point.z
            && point.z <= self.max_z()
    }

    /// Strict overlap; rectangles that only share an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_z() < other.max_z()
            && other.min_z() < self.max_z()
    }
}

/// Length x width of a vehicle body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub length: f32,
    pub width: f32,
}

impl Footprint {
    pub fn new(length: f32, width: f32) -> Self {
        Self { length, width }
    }

    /// The body rectangle of a vehicle centered at `center` facing `heading`
    pub fn rect_at(&self, center: Position, heading: Heading) -> Rect {
        match heading.axis() {
            Axis::NorthSouth => Rect::new(center, self.width, self.length),
            Axis::EastWest => Rect::new(center, self.length, self.width),
        }
    }
}

/// Speed below which an agent counts as stopped
pub const STOPPED_SPEED: f32 = 0.05;

/// Tolerance used when comparing positions along a lane
pub const POSITION_EPSILON: f32 = 1e-4;
