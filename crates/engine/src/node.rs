//! The node arena (§4.1): a transient graph materialized over the cells
//! touched by one settle, with symmetric lazily-built neighbor links and
//! an arena that reuses node objects across settles.
//!
//! Grounded on `RedstoneWireTurbo`'s `UpdateNode`/`NodeId`/arena-as-`Vec`
//! pattern, generalized to the richer per-node state (wire connections,
//! phase flags, revalidation) the settle driver needs.

use redwire_blocks::{CellPos, ConnectionSide, Direction};
use redwire_world::{BlockState, WireType};

use crate::connections::Connections;

/// An index into the node arena. Cheap to copy, stable for the lifetime
/// of the settle (and across a reentrant settle, since revalidation
/// prefers to reuse a node's slot in place).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// A [`Node`] refined for wire cells.
pub struct WireData {
    pub wire_type: WireType,
    pub current_power: u8,
    /// `min - 1` sentinel (the "not yet offered power" value) until a
    /// real offer arrives, then clamped to `[min, max]`.
    pub virtual_power: i32,
    /// `min - 1` sentinel until `find_external_power` runs.
    pub external_power: i32,
    pub flow_in: redwire_blocks::FlowMask,
    /// The backup flow direction recorded when this wire was first
    /// enqueued; used when runtime flow information is ambiguous.
    pub i_flow_dir: Option<Direction>,
    pub connections: Connections,
    pub discovered: bool,
    pub searched: bool,
    pub root: bool,
    pub added: bool,
    pub removed: bool,
    pub should_break: bool,
    /// Intrusive link for the search queue; see `queue.rs`.
    pub(crate) search_next: Option<NodeId>,
    pub(crate) in_search_queue: bool,
}

impl WireData {
    fn fresh(wire_type: WireType, current_power: u8) -> WireData {
        let sentinel = wire_type.signal.min as i32 - 1;
        WireData {
            wire_type,
            current_power,
            virtual_power: sentinel,
            external_power: sentinel,
            flow_in: redwire_blocks::FlowMask::empty(),
            i_flow_dir: None,
            connections: Connections::empty(),
            discovered: false,
            searched: false,
            root: false,
            added: false,
            removed: false,
            should_break: false,
            search_next: None,
            in_search_queue: false,
        }
    }

    /// Clears the per-settle phase flags without touching the cached
    /// connection graph; used when revalidating a node whose wire
    /// identity hasn't changed (§4.1 revalidation rule).
    fn reset_phase_flags(&mut self, current_power: u8) {
        let sentinel = self.wire_type.signal.min as i32 - 1;
        self.current_power = current_power;
        self.virtual_power = sentinel;
        self.external_power = sentinel;
        self.flow_in = redwire_blocks::FlowMask::empty();
        self.i_flow_dir = None;
        self.discovered = false;
        self.searched = false;
        self.root = false;
        self.added = false;
        self.removed = false;
        self.should_break = false;
        self.search_next = None;
        self.in_search_queue = false;
    }

    /// `virtual_power` clamped into `[min, max]`, i.e. the power this
    /// wire would actually expose to the world if committed right now.
    pub fn clamped_virtual_power(&self) -> u8 {
        let signal = self.wire_type.signal;
        if self.virtual_power < signal.min as i32 {
            signal.min
        } else {
            signal.clamp(self.virtual_power)
        }
    }

    /// §4.3's root/requeue test: the wire disagrees with its
    /// environment, or its identity just changed.
    pub fn needs_update(&self) -> bool {
        self.removed || self.should_break || self.clamped_virtual_power() != self.current_power
    }

    /// `offer_power`: raises `virtual_power` if `power` is higher, and
    /// records the cardinal bit(s) of `side` into `flow_in`. Returns
    /// whether the offer raised the virtual power.
    pub fn offer_power(&mut self, power: u8, side: ConnectionSide) -> bool {
        let raised = power as i32 > self.virtual_power;
        if raised {
            self.virtual_power = power as i32;
        }
        self.flow_in |= side.flow_in_bits();
        raised
    }

    /// Resolves this settle's outgoing flow direction: the flow-in
    /// table result, falling back to the connection-implied direction,
    /// falling back to the backup direction recorded at enqueue time,
    /// falling back to West.
    pub fn resolve_flow_dir(&self) -> Direction {
        self.flow_in
            .flow_out()
            .or(self.connections.i_flow_dir)
            .or(self.i_flow_dir)
            .unwrap_or(Direction::West)
    }
}

/// The engine's view of one cell during a settle.
pub struct Node<S: BlockState> {
    pub pos: CellPos,
    pub state: S,
    neighbors: [Option<NodeId>; 6],
    /// Snapshot possibly stale; must be re-read via revalidation before use.
    pub invalid: bool,
    /// `Some` iff `state` was a wire at snapshot time (invariant 2).
    pub wire: Option<WireData>,
}

impl<S: BlockState> Node<S> {
    fn fresh(pos: CellPos, state: S) -> Node<S> {
        Node {
            pos,
            state,
            neighbors: [None; 6],
            invalid: false,
            wire: state.wire_type().map(|wt| WireData::fresh(wt, state.power())),
        }
    }

    pub fn neighbor(&self, dir: Direction) -> Option<NodeId> {
        self.neighbors[dir.index()]
    }

    fn set_neighbor(&mut self, dir: Direction, id: NodeId) {
        self.neighbors[dir.index()] = Some(id);
    }
}

/// Owns every [`Node`] materialized since the engine was constructed.
/// `len` tracks how many of `nodes` are live in the *current* settle;
/// entries beyond it are retained allocations from a previous settle,
/// overwritten the next time [`NodeArena::get_next_node`] runs past them.
pub struct NodeArena<S: BlockState> {
    nodes: Vec<Node<S>>,
    len: usize,
}

impl<S: BlockState> NodeArena<S> {
    pub fn new() -> NodeArena<S> {
        // A small pool pre-filled at construction, per §4.1 lifecycle.
        NodeArena {
            nodes: Vec::with_capacity(64),
            len: 0,
        }
    }

    /// Constant-time index bump; the backing `Vec` doubles on its own
    /// growth path when every slot is in use, exactly mirroring the
    /// arena-doubling rule in §4.1.
    pub fn get_next_node(&mut self, pos: CellPos, state: S) -> NodeId {
        let fresh = Node::fresh(pos, state);
        let id = NodeId(self.len as u32);
        if self.len == self.nodes.len() {
            self.nodes.push(fresh);
        } else {
            self.nodes[self.len] = fresh;
        }
        self.len += 1;
        id
    }

    /// Clears the arena back to empty, retaining its backing allocation
    /// for reuse by the next settle.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn get(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.0 as usize]
    }

}

impl<S: BlockState> Default for NodeArena<S> {
    fn default() -> Self {
        NodeArena::new()
    }
}

/// Revalidates a stale node in place if its wire-ness and identity are
/// unchanged; otherwise the caller should allocate a fresh node.
/// Returns `true` if the existing node was revalidated in place.
pub fn try_revalidate_in_place<S: BlockState>(node: &mut Node<S>, fresh_state: S) -> bool {
    let was_wire = node.wire.is_some();
    let is_wire = fresh_state.is_wire();
    if was_wire != is_wire {
        return false;
    }
    if let (Some(wire), Some(fresh_wire_type)) = (&node.wire, fresh_state.wire_type()) {
        if wire.wire_type != fresh_wire_type {
            return false;
        }
    }
    node.state = fresh_state;
    node.invalid = false;
    if let Some(wire) = &mut node.wire {
        wire.reset_phase_flags(fresh_state.power());
    }
    true
}

/// Builds the symmetric neighbor link between `a` (in direction `dir`
/// from `a`) and the node at `a`'s neighbor, materializing the neighbor
/// node if it doesn't exist yet. Invariant 5: `a.neighbors[d] = b`
/// implies `b.neighbors[opp(d)] = a`.
pub fn link_neighbor<S: BlockState, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    world: &W,
    a: NodeId,
    dir: Direction,
) -> NodeId
where
    W: redwire_world::World<State = S>,
{
    if let Some(existing) = arena.get(a).neighbor(dir) {
        if !arena.get(existing).invalid {
            return existing;
        }
        // The cached link points at a node some `on_wire_*` call has
        // since flagged invalid (§4.1's revalidation rule); re-resolve
        // it through `node_map` rather than handing back a stale
        // snapshot. `get_or_add` either revalidates `existing` in place
        // (same id) or swaps in a freshly allocated replacement, either
        // way returning whatever `node_map` now considers current for
        // that position.
        let neighbor_pos = arena.get(existing).pos;
        let b = get_or_add(arena, node_map, world, neighbor_pos);
        arena.get_mut(a).set_neighbor(dir, b);
        arena.get_mut(b).set_neighbor(dir.opposite(), a);
        return b;
    }
    let neighbor_pos = arena.get(a).pos.offset(dir);
    let b = get_or_add(arena, node_map, world, neighbor_pos);
    arena.get_mut(a).set_neighbor(dir, b);
    arena.get_mut(b).set_neighbor(dir.opposite(), a);
    b
}

/// `get_or_add` (§4.1 contract): returns the node for `pos`, creating or
/// revalidating it as needed.
pub fn get_or_add<S: BlockState, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    world: &W,
    pos: CellPos,
) -> NodeId
where
    W: redwire_world::World<State = S>,
{
    if let Some(&id) = node_map.get(&pos) {
        if arena.get(id).invalid {
            let fresh_state = world.get_block_state(pos);
            if !try_revalidate_in_place(arena.get_mut(id), fresh_state) {
                let replacement = arena.get_next_node(pos, fresh_state);
                node_map.insert(pos, replacement);
                return replacement;
            }
        }
        return id;
    }
    let state = world.get_block_state(pos);
    let id = arena.get_next_node(pos, state);
    node_map.insert(pos, id);
    id
}
