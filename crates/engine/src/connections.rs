//! Connection discovery (§4.2): for a wire node, which of the eighteen
//! [`ConnectionSide`] geometries actually reach another wire right now,
//! and in which direction power may cross that link.
//!
//! Grounded on `RedstoneWireTurbo::identify_neighbors` /
//! `orient_neighbors` and the plain `can_connect_to` /
//! `can_connect_diagonal_to` pair in `wire/mod.rs`, generalized from
//! MCHPRS's fixed cardinal-only shape to the full direct/diagonal/
//! staircase geometry set.

use indexmap::IndexMap;
use redwire_blocks::{CellPos, ConnectionSide, Direction, FlowMask};
use redwire_world::{BlockState, ConnectionType, World};

use crate::node::{get_or_add, NodeArena, NodeId};

/// One live link from a wire to a neighboring wire.
#[derive(Debug, Clone, Copy)]
pub struct WireConnection {
    pub side: ConnectionSide,
    pub target: NodeId,
    pub kind: ConnectionType,
}

/// The set of connections a wire currently has, in discovery order
/// (§4.2 fixes this to `connection_update_order`, so iteration order is
/// the order power is offered out in the transmit phase).
#[derive(Debug, Clone, Default)]
pub struct Connections {
    entries: IndexMap<ConnectionSide, WireConnection>,
    /// The cardinal direction implied by this wire's connection shape
    /// alone (independent of which sides actually received power this
    /// settle); used as `resolve_flow_dir`'s second fallback.
    pub i_flow_dir: Option<Direction>,
}

impl Connections {
    pub fn empty() -> Connections {
        Connections::default()
    }

    pub fn insert(&mut self, conn: WireConnection) {
        self.entries.insert(conn.side, conn);
    }

    pub fn get(&self, side: ConnectionSide) -> Option<&WireConnection> {
        self.entries.get(&side)
    }

    pub fn contains(&self, side: ConnectionSide) -> bool {
        self.entries.contains_key(&side)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WireConnection> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recomputes `i_flow_dir` from the cardinal sides currently
    /// connected (mirrors `flow_in_bits`, but over shape rather than
    /// this settle's actual power offers).
    fn recompute_flow_dir(&mut self) {
        let mask = self
            .entries
            .keys()
            .fold(FlowMask::empty(), |m, side| m | side.flow_in_bits());
        self.i_flow_dir = mask.flow_out();
    }
}

/// Rebuilds `node`'s connection set from scratch by walking the
/// eighteen sides in `node`'s forward-rotated order and probing each
/// neighbor. `forward` is the direction this wire last received power
/// from, or West if it has none yet (§4.1's backup flow direction).
pub fn discover_connections<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    world: &W,
    id: NodeId,
    forward: Direction,
) where
    S: BlockState,
    W: World<State = S>,
{
    let node = arena.get(id);
    let pos = node.pos;
    let state = node.state;
    let wire_type = match &node.wire {
        Some(wire) => wire.wire_type,
        None => return,
    };
    let shape = state.connections_view();

    let mut connections = Connections::empty();
    for side in redwire_blocks::connection_update_order(forward) {
        if !shape.contains(side) {
            continue;
        }
        let target_pos = reaches(pos, side);
        let target_id = get_or_add(arena, node_map, world, target_pos);
        let target = arena.get(target_id);
        let Some(target_wire) = &target.wire else {
            continue;
        };
        if !target.state.connections_view().contains(opposite_side(side)) {
            continue;
        }
        let kind = wire_type.connection_to(target_wire.wire_type);
        connections.insert(WireConnection {
            side,
            target: target_id,
            kind,
        });
    }
    connections.recompute_flow_dir();

    // §4.4's `should_break`: a wire whose supporting geometry just gave
    // out (its floor broke, etc.) is treated as equivalent to a removal
    // for the rest of this settle, without actually touching the world
    // here — that happens through the ordinary commit path once this
    // wire reaches phase 3.
    let should_break = !state.can_exist(world, pos);

    let node = arena.get_mut(id);
    if let Some(wire) = &mut node.wire {
        wire.connections = connections;
        wire.discovered = true;
        if !wire.removed && !wire.should_break && should_break {
            wire.should_break = true;
        }
    }
}

/// The cell a connection side reaches, for connection discovery.
/// Diagonal and staircase sides reach two cells away; direct sides
/// reach one.
fn reaches(from: CellPos, side: ConnectionSide) -> CellPos {
    use ConnectionSide::*;
    let at = |dir: Direction| from.offset(dir);
    match side {
        North => at(Direction::North),
        South => at(Direction::South),
        East => at(Direction::East),
        West => at(Direction::West),
        Down => at(Direction::Down),
        Up => at(Direction::Up),
        NorthEast => at(Direction::North).offset(Direction::East),
        NorthWest => at(Direction::North).offset(Direction::West),
        SouthEast => at(Direction::South).offset(Direction::East),
        SouthWest => at(Direction::South).offset(Direction::West),
        NorthUp => at(Direction::North).offset(Direction::Up),
        SouthDown => at(Direction::South).offset(Direction::Down),
        EastUp => at(Direction::East).offset(Direction::Up),
        WestDown => at(Direction::West).offset(Direction::Down),
        NorthDown => at(Direction::North).offset(Direction::Down),
        SouthUp => at(Direction::South).offset(Direction::Up),
        EastDown => at(Direction::East).offset(Direction::Down),
        WestUp => at(Direction::West).offset(Direction::Up),
    }
}

/// The side a wire at the far end of a connection sees looking back:
/// direct sides flip to their cardinal opposite; diagonal and
/// staircase sides flip both the horizontal and vertical sense.
pub(crate) fn opposite_side(side: ConnectionSide) -> ConnectionSide {
    use ConnectionSide::*;
    match side {
        North => South,
        South => North,
        East => West,
        West => East,
        Down => Up,
        Up => Down,
        NorthEast => SouthWest,
        NorthWest => SouthEast,
        SouthEast => NorthWest,
        SouthWest => NorthEast,
        NorthUp => SouthDown,
        SouthDown => NorthUp,
        EastUp => WestDown,
        WestDown => EastUp,
        NorthDown => SouthUp,
        SouthUp => NorthDown,
        EastDown => WestUp,
        WestUp => EastDown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_side_is_involution() {
        for side in redwire_blocks::ALL_CONNECTION_SIDES {
            assert_eq!(opposite_side(opposite_side(side)), side);
        }
    }

    #[test]
    fn connections_default_is_empty() {
        let conns = Connections::empty();
        assert!(conns.is_empty());
        assert_eq!(conns.i_flow_dir, None);
    }
}
