//! Root discovery (§4.3): deciding which block-update notifications
//! actually need a settle, and seeding the settle's update queue with
//! the wires that must be reconsidered first.
//!
//! Grounded on `RedstoneWireTurbo::update_node`'s dispatch between "new
//! wire", "removed wire", and "neighbor changed" cases for the entry
//! points, and on the accompanying Alternate-Current-style root test
//! (discover → external power → wire power → compare against
//! `current_power`) for the decision itself, generalized to the
//! engine's explicit `added`/`removed`/`root` wire flags and the
//! neighbor-of-neighbor fan-out described in §4.3.

use redwire_blocks::{full_update_order, CellPos, ALL_DIRECTIONS};
use redwire_world::{BlockState, World};

use crate::connections::discover_connections;
use crate::node::{get_or_add, link_neighbor, NodeArena, NodeId};
use crate::power::{find_external_power, find_power};
use crate::queue::UpdateQueue;

/// What kind of root event brought `pos` into this settle. Wire removal
/// isn't one of these: unlike a placement or a neighbor poke, by the
/// time a removal is reported `world` no longer has anything at `pos`
/// to look up, so it needs its own entry point (`on_wire_removed`)
/// carrying the wire's last `BlockState` along with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// A wire was placed at `pos` where there wasn't one before.
    WireAdded,
    /// A non-wire neighbor of `pos` changed; `pos` itself is unchanged.
    NeighborChanged,
}

/// `on_wire_update` (§4.3): a non-wire-graph change happened at `pos`.
/// Looks up (or revalidates) the wire at `pos` and runs the root test:
/// `discover` → `find_external_power` → (conditionally) `find_power`.
/// If the result disagrees with the wire's current power, or the wire
/// is newly removed/breaking, it is pushed as a root. When the wire
/// turns out to sit in a larger network, its non-wire neighbors are
/// also fanned out through, to catch a single source feeding several
/// cells of the same network that wouldn't otherwise be reconsidered
/// (§4.3's "one power source feeding multiple network cells" case).
pub fn on_wire_update<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    queue: &mut UpdateQueue,
    world: &W,
    pos: CellPos,
    kind: RootKind,
) where
    S: BlockState,
    W: World<State = S>,
{
    // `pos` is, by construction, exactly the cell this call is telling
    // us just changed (a wire placed, removed, or a plain neighbor
    // poke promising *something* nearby did). If an earlier probe this
    // settle already cached a node for `pos` — e.g. as a neighbor
    // visited by `find_external_power` before this was a wire at all —
    // that cached snapshot predates the change and must be revalidated
    // against the world rather than reused as-is. This is the targeted
    // form of §4.5's "mark every current node invalid" reentrancy rule:
    // invalidating the one position a caller is telling us about is
    // enough, since every other cached node's world-state is unchanged
    // unless some other `on_wire_*` call says otherwise.
    if let Some(&existing) = node_map.get(&pos) {
        arena.get_mut(existing).invalid = true;
    }
    let id = get_or_add(arena, node_map, world, pos);
    if let Some(wire) = &mut arena.get_mut(id).wire {
        match kind {
            RootKind::WireAdded => wire.added = true,
            RootKind::NeighborChanged => {}
        }
    }

    if arena.get(id).wire.is_none() {
        // §7's "missing node" case: a should-not-happen defensive no-op
        // as far as the wire-root test goes, but the cell may still be
        // a non-wire block that genuinely needs its one phase-3 update
        // call (e.g. a lever that was just removed), so it still rides
        // along as a root rather than being silently dropped.
        queue.push_root(id);
        return;
    }

    consider_wire_root(arena, node_map, queue, world, id, true);
}

/// `on_wire_added`: shorthand for the common case of a wire block just
/// having been placed.
pub fn on_wire_added<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    queue: &mut UpdateQueue,
    world: &W,
    pos: CellPos,
) where
    S: BlockState,
    W: World<State = S>,
{
    on_wire_update(arena, node_map, queue, world, pos, RootKind::WireAdded);
}

/// `on_wire_removed` (§4.3, §6): a wire block just broke or was
/// replaced by something that isn't a wire. Unlike every other root
/// event, `world` already reflects the change by the time this runs —
/// `get_or_add(pos)` would only ever find air (or whatever replaced the
/// wire) — so the caller passes `old_state`, the wire's `BlockState`
/// immediately before the removal, and the node at `pos` is built
/// straight from that snapshot instead of from a world read. That is
/// what lets the removed wire still run the root test against its last
/// connections rather than relying on a surviving neighbor to notice
/// the power drop on its own.
///
/// The synthesized node is marked `invalid` immediately: it describes a
/// cell the live world no longer agrees with, so any later lookup of
/// `pos` through `node_map` (a neighbor resolving its own link to this
/// position) must revalidate against the world and see the current,
/// non-wire reality instead of reusing this one-shot snapshot.
pub fn on_wire_removed<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    queue: &mut UpdateQueue,
    world: &W,
    pos: CellPos,
    old_state: S,
) where
    S: BlockState,
    W: World<State = S>,
{
    if let Some(&existing) = node_map.get(&pos) {
        arena.get_mut(existing).invalid = true;
    }

    if old_state.wire_type().is_none() {
        // Whatever just vanished from `pos` was never part of the wire
        // graph; fall back to the plain non-wire root path.
        let id = get_or_add(arena, node_map, world, pos);
        queue.push_root(id);
        return;
    }

    let id = arena.get_next_node(pos, old_state);
    node_map.insert(pos, id);
    arena.get_mut(id).invalid = true;
    arena.get_mut(id).wire.as_mut().expect("checked above").removed = true;

    consider_wire_root(arena, node_map, queue, world, id, true);
}

/// The root test proper (§4.3), run once for the wire at `id` and,
/// through `fan_out`, once more (without a further fan-out, so the
/// search stays one hop deep) for any wire reached by probing past a
/// conducting or source-emitting non-wire neighbor. Returns whether
/// `id` was pushed as a root.
fn consider_wire_root<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    queue: &mut UpdateQueue,
    world: &W,
    id: NodeId,
    fan_out: bool,
) -> bool
where
    S: BlockState,
    W: World<State = S>,
{
    let forward = arena.get(id).wire.as_ref().expect("checked by caller").resolve_flow_dir();
    discover_connections(arena, node_map, world, id, forward);

    let signal = arena.get(id).wire.as_ref().expect("checked by caller").wire_type.signal;
    let external = find_external_power(arena, node_map, world, id, signal);
    arena.get_mut(id).wire.as_mut().expect("checked by caller").external_power = external as i32;

    let should_compute_wire_power = {
        let wire = arena.get(id).wire.as_ref().expect("checked by caller");
        !wire.wire_type.is_self_referential() || wire.needs_update()
    };
    if should_compute_wire_power {
        find_power(arena, id, false);
    }

    let (is_root, connection_total, resolved_flow) = {
        let wire = arena.get(id).wire.as_ref().expect("checked by caller");
        (wire.needs_update(), wire.connections.len(), wire.resolve_flow_dir())
    };

    if is_root {
        arena.get_mut(id).wire.as_mut().expect("checked by caller").root = true;
        queue.push_root(id);
    }

    if fan_out && connection_total > 0 {
        fan_out_through_neighbors(arena, node_map, queue, world, id, signal, resolved_flow);
    }

    is_root
}

/// §4.3's neighbor-of-neighbor scan: for each of `id`'s six neighbors
/// (in `FULL_UPDATE_ORDERS[flow]` order) that relays a signal — a
/// conductor or a source in its own right — examine that neighbor's
/// other cardinal-plus-vertical neighbors (excluding the direction back
/// toward `id`) and root-check any wire found there. This is
/// deliberately one hop, not a recursive walk: it exists to catch a
/// source feeding several cells of one network without the cost of
/// enumerating the whole network up front.
fn fan_out_through_neighbors<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    queue: &mut UpdateQueue,
    world: &W,
    id: NodeId,
    signal: redwire_world::SignalType,
    flow: redwire_blocks::Direction,
) where
    S: BlockState,
    W: World<State = S>,
{
    for dir in full_update_order(flow) {
        let nbr_id = link_neighbor(arena, node_map, world, id, dir);
        if arena.get(nbr_id).wire.is_some() {
            continue;
        }
        let nbr = arena.get(nbr_id);
        let nbr_pos = nbr.pos;
        let nbr_state = nbr.state;
        let relays = nbr_state.is_signal_conductor(dir.opposite(), signal) || nbr_state.is_signal_source(signal);
        if !relays {
            continue;
        }

        for probe_dir in ALL_DIRECTIONS {
            if probe_dir == dir.opposite() {
                continue;
            }
            let probe_id = get_or_add(arena, node_map, world, nbr_pos.offset(probe_dir));
            if arena.get(probe_id).wire.is_none() {
                continue;
            }
            consider_wire_root(arena, node_map, queue, world, probe_id, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RootKind;

    #[test]
    fn root_kinds_are_distinct() {
        assert_ne!(RootKind::WireAdded, RootKind::NeighborChanged);
    }
}
