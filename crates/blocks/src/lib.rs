//! Geometry primitives for the signal engine: cell positions, the six
//! axis-aligned directions, and the eighteen wire-to-wire connection
//! geometries, along with the fixed orderings the engine walks them in.
//!
//! Nothing in this crate knows about power, settling, or the world; it is
//! pure integer geometry, the same role `mchprs_blocks` plays for the
//! rest of the server.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An integer cell position in the voxel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32, z: i32) -> CellPos {
        CellPos { x, y, z }
    }

    /// The cell adjacent to this one in `dir`.
    pub fn offset(self, dir: Direction) -> CellPos {
        let CellPos { x, y, z } = self;
        match dir {
            Direction::West => CellPos::new(x - 1, y, z),
            Direction::North => CellPos::new(x, y, z - 1),
            Direction::East => CellPos::new(x + 1, y, z),
            Direction::South => CellPos::new(x, y, z + 1),
            Direction::Down => CellPos::new(x, y - 1, z),
            Direction::Up => CellPos::new(x, y + 1, z),
        }
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The six axis-aligned directions, with the fixed encoding the settle
/// driver relies on: cardinals occupy 0..3 in clockwise order (viewed
/// from above), so `(i + 1) % 4` is always a clockwise turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Direction {
    West = 0,
    North = 1,
    East = 2,
    South = 3,
    Down = 4,
    Up = 5,
}

pub const CARDINALS: [Direction; 4] = [
    Direction::West,
    Direction::North,
    Direction::East,
    Direction::South,
];

pub const ALL_DIRECTIONS: [Direction; 6] = [
    Direction::West,
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::Down,
    Direction::Up,
];

impl Direction {
    pub const fn index(self) -> usize {
        self as u8 as usize
    }

    pub fn from_index(i: usize) -> Direction {
        match i {
            0 => Direction::West,
            1 => Direction::North,
            2 => Direction::East,
            3 => Direction::South,
            4 => Direction::Down,
            5 => Direction::Up,
            _ => panic!("direction index out of range: {i}"),
        }
    }

    pub const fn is_cardinal(self) -> bool {
        self.index() < 4
    }

    /// `i XOR (0b10 >> (i >> 2))`
    pub const fn opposite(self) -> Direction {
        let i = self.index() as u32;
        let flipped = i ^ (0b10 >> (i >> 2));
        match flipped {
            0 => Direction::West,
            1 => Direction::North,
            2 => Direction::East,
            3 => Direction::South,
            4 => Direction::Down,
            5 => Direction::Up,
            _ => unreachable!(),
        }
    }

    /// Rotates a cardinal direction `turns` steps clockwise (viewed from
    /// above). Panics if `self` is not cardinal.
    pub fn rotated_cardinal(self, turns: i32) -> Direction {
        assert!(self.is_cardinal(), "rotated_cardinal on non-cardinal {self:?}");
        let i = self.index() as i32;
        Direction::from_index(((i + turns).rem_euclid(4)) as usize)
    }

    pub fn cardinal_right(self) -> Direction {
        self.rotated_cardinal(1)
    }

    pub fn cardinal_left(self) -> Direction {
        self.rotated_cardinal(-1)
    }
}

/// The cardinal update order `{front, back, right, left}`, used when
/// transmitting power out along a wire's connections. Indexed by the
/// forward cardinal direction.
pub fn cardinal_update_order(forward: Direction) -> [Direction; 4] {
    [
        forward,
        forward.opposite(),
        forward.cardinal_right(),
        forward.cardinal_left(),
    ]
}

/// The full update order `{front, back, right, left, down, up}`, used
/// when scanning a wire's six neighbors for non-wire blocks to notify.
pub fn full_update_order(forward: Direction) -> [Direction; 6] {
    let [front, back, right, left] = cardinal_update_order(forward);
    [front, back, right, left, Direction::Down, Direction::Up]
}

/// The five directions other than `excluded`, in a fixed canonical
/// order. Used when probing a signal conductor's other faces for a
/// source.
pub fn except(excluded: Direction) -> [Direction; 5] {
    let mut out = [Direction::West; 5];
    let mut n = 0;
    for d in ALL_DIRECTIONS {
        if d != excluded {
            out[n] = d;
            n += 1;
        }
    }
    out
}

bitflags::bitflags! {
    /// A 4-bit cardinal bitmask in WNES order, recording which cardinal
    /// directions offered power to a wire this settle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlowMask: u8 {
        const WEST = 0b0001;
        const NORTH = 0b0010;
        const EAST = 0b0100;
        const SOUTH = 0b1000;
    }
}

impl FlowMask {
    pub fn for_direction(dir: Direction) -> FlowMask {
        match dir {
            Direction::West => FlowMask::WEST,
            Direction::North => FlowMask::NORTH,
            Direction::East => FlowMask::EAST,
            Direction::South => FlowMask::SOUTH,
            Direction::Down | Direction::Up => FlowMask::empty(),
        }
    }

    /// Resolves the flow-in mask to an outgoing cardinal direction per
    /// the flow table: a single bit picks itself, two adjacent bits pick
    /// the clockwise-later one, three bits pick the direction opposite
    /// the missing bit, and everything else (zero bits, an opposing
    /// pair, or all four) is ambiguous.
    pub fn flow_out(self) -> Option<Direction> {
        match self.bits().count_ones() {
            1 => CARDINALS
                .into_iter()
                .find(|d| FlowMask::for_direction(*d) == self),
            2 => CARDINALS.into_iter().find_map(|d| {
                let pair = FlowMask::for_direction(d) | FlowMask::for_direction(d.cardinal_right());
                (pair == self).then(|| d.cardinal_right())
            }),
            3 => {
                let missing = CARDINALS
                    .into_iter()
                    .find(|d| !self.contains(FlowMask::for_direction(*d)))?;
                Some(missing.opposite())
            }
            _ => None,
        }
    }
}

/// The eighteen geometries by which one wire can reach another: six
/// direct, eight diagonal, and four "staircase" shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionSide {
    // direct
    North,
    South,
    East,
    West,
    Down,
    Up,
    // diagonal
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    NorthUp,
    EastUp,
    SouthDown,
    WestDown,
    // staircase
    NorthDown,
    SouthUp,
    EastDown,
    WestUp,
}

pub const CONNECTION_SIDE_COUNT: usize = 18;

/// All eighteen sides, direct first, then diagonal, then staircase. This
/// is the canonical (unrotated, forward = North) order that
/// `connection_update_order` rotates away from.
pub const ALL_CONNECTION_SIDES: [ConnectionSide; CONNECTION_SIDE_COUNT] = [
    ConnectionSide::North,
    ConnectionSide::South,
    ConnectionSide::East,
    ConnectionSide::West,
    ConnectionSide::Down,
    ConnectionSide::Up,
    ConnectionSide::NorthEast,
    ConnectionSide::NorthWest,
    ConnectionSide::SouthEast,
    ConnectionSide::SouthWest,
    ConnectionSide::NorthUp,
    ConnectionSide::EastUp,
    ConnectionSide::SouthDown,
    ConnectionSide::WestDown,
    ConnectionSide::NorthDown,
    ConnectionSide::SouthUp,
    ConnectionSide::EastDown,
    ConnectionSide::WestUp,
];

fn direct_from_direction(dir: Direction) -> ConnectionSide {
    match dir {
        Direction::West => ConnectionSide::West,
        Direction::North => ConnectionSide::North,
        Direction::East => ConnectionSide::East,
        Direction::South => ConnectionSide::South,
        Direction::Down => ConnectionSide::Down,
        Direction::Up => ConnectionSide::Up,
    }
}

fn horizontal_diagonal(a: Direction, b: Direction) -> ConnectionSide {
    use Direction::*;
    match (a, b) {
        (North, East) | (East, North) => ConnectionSide::NorthEast,
        (North, West) | (West, North) => ConnectionSide::NorthWest,
        (South, East) | (East, South) => ConnectionSide::SouthEast,
        (South, West) | (West, South) => ConnectionSide::SouthWest,
        _ => unreachable!("not a horizontal pair: {a:?} {b:?}"),
    }
}

fn cardinal_vertical(card: Direction, up: bool) -> ConnectionSide {
    use Direction::*;
    match (card, up) {
        (North, true) => ConnectionSide::NorthUp,
        (South, false) => ConnectionSide::SouthDown,
        (East, true) => ConnectionSide::EastUp,
        (West, false) => ConnectionSide::WestDown,
        (North, false) => ConnectionSide::NorthDown,
        (South, true) => ConnectionSide::SouthUp,
        (East, false) => ConnectionSide::EastDown,
        (West, true) => ConnectionSide::WestUp,
        _ => unreachable!("not a cardinal direction: {card:?}"),
    }
}

impl ConnectionSide {
    /// Rotates this connection geometry `turns` clockwise steps. Used to
    /// derive `connection_update_order` for an arbitrary forward
    /// direction from the canonical (forward = North) ordering.
    pub fn rotated(self, turns: i32) -> ConnectionSide {
        use ConnectionSide::*;
        let rot = |d: Direction| d.rotated_cardinal(turns);
        match self {
            North => direct_from_direction(rot(Direction::North)),
            South => direct_from_direction(rot(Direction::South)),
            East => direct_from_direction(rot(Direction::East)),
            West => direct_from_direction(rot(Direction::West)),
            Down => Down,
            Up => Up,
            NorthEast => horizontal_diagonal(rot(Direction::North), rot(Direction::East)),
            NorthWest => horizontal_diagonal(rot(Direction::North), rot(Direction::West)),
            SouthEast => horizontal_diagonal(rot(Direction::South), rot(Direction::East)),
            SouthWest => horizontal_diagonal(rot(Direction::South), rot(Direction::West)),
            NorthUp => cardinal_vertical(rot(Direction::North), true),
            SouthDown => cardinal_vertical(rot(Direction::South), false),
            EastUp => cardinal_vertical(rot(Direction::East), true),
            WestDown => cardinal_vertical(rot(Direction::West), false),
            NorthDown => cardinal_vertical(rot(Direction::North), false),
            SouthUp => cardinal_vertical(rot(Direction::South), true),
            EastDown => cardinal_vertical(rot(Direction::East), false),
            WestUp => cardinal_vertical(rot(Direction::West), true),
        }
    }

    /// The cardinal bits (WNES) this connection geometry contributes to
    /// `flow_in` when it is the side power arrived through.
    pub fn flow_in_bits(self) -> FlowMask {
        use ConnectionSide::*;
        match self {
            North | NorthUp | NorthDown => FlowMask::NORTH,
            South | SouthDown | SouthUp => FlowMask::SOUTH,
            East | EastUp | EastDown => FlowMask::EAST,
            West | WestDown | WestUp => FlowMask::WEST,
            Down | Up => FlowMask::empty(),
            NorthEast => FlowMask::NORTH | FlowMask::EAST,
            NorthWest => FlowMask::NORTH | FlowMask::WEST,
            SouthEast => FlowMask::SOUTH | FlowMask::EAST,
            SouthWest => FlowMask::SOUTH | FlowMask::WEST,
        }
    }

}

/// The eighteen connection sides in the fixed order the search and
/// transmit phases walk them in: direct, then diagonal, then staircase,
/// all rotated to put `forward` first among the cardinals.
pub fn connection_update_order(forward: Direction) -> [ConnectionSide; CONNECTION_SIDE_COUNT] {
    let turns = forward.index() as i32 - Direction::North.index() as i32;
    let mut out = ALL_CONNECTION_SIDES;
    for side in &mut out {
        *side = side.rotated(turns);
    }
    out
}
