//! The settle driver (§4.5): the three-phase pass — search, depower,
//! power — that turns a batch of root events into a consistent power
//! assignment across a wire network, plus the reentrancy guard that
//! lets a block update triggered mid-settle safely fold into the same
//! pass.
//!
//! Grounded on `RedstoneWireTurbo::breadth_first_walk` /
//! `propagate_changes` (the BFS-with-layers shape) and
//! `calculate_current_changes` (the depower-then-repower two-pass
//! trick), generalized into three explicit named phases.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use redwire_blocks::{CellPos, ConnectionSide};
use redwire_world::{BlockState, World};

use crate::connections::discover_connections;
use crate::node::{NodeArena, NodeId};
use crate::power::{find_external_power, find_power};
use crate::queue::{SearchQueue, UpdateQueue};
use crate::roots::{on_wire_added, on_wire_removed, on_wire_update, RootKind};

/// Owns the node arena and queues for one [`World`] and drives settles
/// over it. One `SignalEngine` is meant to live alongside (or inside)
/// the world it settles; it is not `Send`/`Sync` by itself since it
/// borrows the world mutably during a settle.
pub struct SignalEngine<S: BlockState> {
    arena: NodeArena<S>,
    node_map: FxHashMap<CellPos, NodeId>,
    update_queue: UpdateQueue,
    /// Reentrancy guard (§4.5's "module flag"): `true` for the
    /// duration of the outermost `settle` call's phase 3, so a
    /// world callback that reenters `on_wire_update`/`settle` only
    /// enqueues its roots into the shared queue instead of recursing
    /// into a second phase 3.
    updating: bool,
}

impl<S: BlockState> SignalEngine<S> {
    pub fn new() -> SignalEngine<S> {
        SignalEngine {
            arena: NodeArena::new(),
            node_map: FxHashMap::default(),
            update_queue: UpdateQueue::new(),
            updating: false,
        }
    }

    pub fn on_wire_added<W: World<State = S>>(&mut self, world: &W, pos: CellPos) {
        on_wire_added(&mut self.arena, &mut self.node_map, &mut self.update_queue, world, pos);
    }

    /// `old_state` is the wire's `BlockState` immediately before it was
    /// removed; by the time this is called `world` already reflects the
    /// removal, and that snapshot is what lets the removed wire still
    /// seed a root carrying its last connections (§4.3, §6).
    pub fn on_wire_removed<W: World<State = S>>(&mut self, world: &W, pos: CellPos, old_state: S) {
        on_wire_removed(
            &mut self.arena,
            &mut self.node_map,
            &mut self.update_queue,
            world,
            pos,
            old_state,
        );
    }

    pub fn on_neighbor_changed<W: World<State = S>>(&mut self, world: &W, pos: CellPos) {
        on_wire_update(
            &mut self.arena,
            &mut self.node_map,
            &mut self.update_queue,
            world,
            pos,
            RootKind::NeighborChanged,
        );
    }

    /// Runs a settle to completion: search, depower, power.
    ///
    /// If invoked while `self.updating` is already `true` — a
    /// reentrant call made by a `World` callback inside this same
    /// call's phase 3 — the new roots already queued by
    /// `on_wire_update` are left for the outer phase 3's loop to pick
    /// up, and this call returns immediately without recursing into
    /// its own phase 3 (§4.5's reentrancy guard). Because of that
    /// guard, the code below only ever runs for the outermost call —
    /// every nested one returns above — so finalization always sees
    /// "no nested invocation outstanding" and always clears the map
    /// and rewinds the arena (§4.1's "node objects are retained for
    /// reuse").
    pub fn settle<W: World<State = S>>(&mut self, world: &mut W) {
        if self.updating {
            trace!("settle re-entered; new roots left for the outer phase 3");
            return;
        }
        self.updating = true;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.drive_phase_3(world);
        }));
        self.updating = false;
        self.node_map.clear();
        self.arena.reset();
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }

    /// Phase 3 in a loop: drains the update queue, but phases 1 and 2
    /// (search and depower) run first to populate it, and may run
    /// again mid-loop if phase 3's own notifications enqueued fresh
    /// roots (handled by the reentrant-call early return above; those
    /// roots sit in `self.update_queue` waiting for the next iteration
    /// of this very loop).
    fn drive_phase_3<W: World<State = S>>(&mut self, world: &mut W) {
        loop {
            let discovered = self.search_phase(world);
            if discovered.is_empty() && self.update_queue.is_empty() {
                break;
            }
            self.depower_phase(&discovered);
            self.power_phase(world);
            if self.update_queue.is_empty() {
                break;
            }
        }
    }

    /// Phase 1 – search (§4.5). Drains the update queue's roots into
    /// the search queue, then floods outward along OUT connections to
    /// every reachable, not-yet-searched peer, computing each wire's
    /// connections and a provisional `find_power` as it's first
    /// reached. Returns every wire touched, in discovery order.
    fn search_phase<W: World<State = S>>(&mut self, world: &W) -> Vec<NodeId> {
        let mut search = SearchQueue::new();
        let mut discovered = Vec::new();
        // `SearchQueue::push` is a no-op for non-wire nodes, so a root
        // that isn't a wire (a plain neighbor-update or a wire that's
        // just been removed) would otherwise vanish here; carry it
        // forward so power phase still gives it its one `apply_non_wire`
        // call.
        let mut non_wire_roots = Vec::new();

        while let Some(root) = self.update_queue.pop() {
            if self.arena.get(root).wire.is_some() {
                search.push(&mut self.arena, root);
            } else {
                non_wire_roots.push(root);
            }
        }
        self.update_queue.clear();
        for id in non_wire_roots {
            self.update_queue.push_root(id);
        }

        while let Some(id) = search.pop(&mut self.arena) {
            let already_searched = match &self.arena.get(id).wire {
                Some(wire) => wire.searched,
                None => continue,
            };
            if already_searched {
                continue;
            }

            let forward = self.arena.get(id).wire.as_ref().expect("checked above").resolve_flow_dir();
            discover_connections(&mut self.arena, &mut self.node_map, world, id, forward);
            let signal = self.arena.get(id).wire.as_ref().expect("checked above").wire_type.signal;
            let external = find_external_power(&mut self.arena, &mut self.node_map, world, id, signal);
            self.arena.get_mut(id).wire.as_mut().expect("checked above").external_power = external as i32;
            find_power(&mut self.arena, id, false);

            let wire = self.arena.get_mut(id).wire.as_mut().expect("checked above");
            wire.searched = true;
            discovered.push(id);

            let out_targets: SmallVec<[(ConnectionSide, NodeId); 8]> = wire
                .connections
                .iter()
                .filter(|c| c.kind.flows_out())
                .map(|c| (c.side, c.target))
                .collect();

            for (side, target) in out_targets {
                let target_searched = match &self.arena.get(target).wire {
                    Some(wire) => wire.searched,
                    None => continue,
                };
                if target_searched {
                    continue;
                }
                let backup_dir = side.flow_in_bits().flow_out();
                if let Some(wire) = &mut self.arena.get_mut(target).wire {
                    wire.i_flow_dir = backup_dir;
                }
                search.push(&mut self.arena, target);
            }
        }

        debug!(count = discovered.len(), "search phase discovered wires");
        discovered
    }

    /// Phase 2 – depower (§4.5). Re-derives every discovered wire's
    /// power while ignoring contributions from peers already searched,
    /// which "empties" the network of its own prior state. Roots,
    /// removed/breaking wires, and anything still above `min` after
    /// that recomputation feed the update queue directly; everything
    /// else gets nudged one step below `min` so the power phase's first
    /// real offer is guaranteed to raise it and re-enqueue it.
    fn depower_phase(&mut self, discovered: &[NodeId]) {
        for &id in discovered {
            find_power(&mut self.arena, id, true);

            let wire = self.arena.get_mut(id).wire.as_mut().expect("discovered is wire");
            let signal = wire.wire_type.signal;
            let should_queue =
                wire.root || wire.removed || wire.should_break || wire.clamped_virtual_power() > signal.min;

            if should_queue {
                if wire.root {
                    self.update_queue.push_root(id);
                } else {
                    self.update_queue.push(id);
                }
            } else {
                wire.virtual_power = signal.min as i32 - 1;
            }
        }
    }

    /// Phase 3 – power (§4.5). Drains the update queue in roots-first,
    /// FIFO order. Each wire still needing an update transmits its
    /// power out along every OUT connection, re-enqueueing any peer
    /// whose virtual power that offer raised, then commits its final
    /// power to the world and notifies neighbors.
    fn power_phase<W: World<State = S>>(&mut self, world: &mut W) {
        while let Some(id) = self.update_queue.pop() {
            if self.arena.get(id).wire.is_none() {
                self.apply_non_wire(world, id);
                continue;
            }

            // A wire reached only through a reentrant settle's own root
            // test (§4.5's "shares phase 3 with the outer loop") never
            // went through this round's `search_phase`, so it may still
            // be sitting on an empty connection set from
            // `WireData::fresh`. Discover it lazily here, the same work
            // `search_phase` would have done had it reached this wire
            // first, so `transmit_power` below has real OUT connections
            // to walk instead of silently stopping.
            if !self.arena.get(id).wire.as_ref().expect("checked above").discovered {
                self.discover(&*world, id);
            }

            let wire = self.arena.get(id).wire.as_ref().expect("checked above");
            if !wire.needs_update() {
                continue;
            }
            let removed = wire.removed;

            // A removed wire is already gone from the world; it rides
            // through phase 3 only so `commit` can notify its former
            // neighbors, never to transmit power it no longer has any
            // business offering.
            if !removed {
                self.transmit_power(id);
            }
            self.commit(world, id);
        }
    }

    /// Runs the same discover → external-power → wire-power sequence
    /// `search_phase` runs for a freshly reached wire, marking it
    /// `discovered`/`searched` so a later reentrant offer to it doesn't
    /// redo the work.
    fn discover<W: World<State = S>>(&mut self, world: &W, id: NodeId) {
        let forward = self.arena.get(id).wire.as_ref().expect("checked above").resolve_flow_dir();
        discover_connections(&mut self.arena, &mut self.node_map, world, id, forward);
        let signal = self.arena.get(id).wire.as_ref().expect("checked above").wire_type.signal;
        let external = find_external_power(&mut self.arena, &mut self.node_map, world, id, signal);
        self.arena.get_mut(id).wire.as_mut().expect("checked above").external_power = external as i32;
        find_power(&mut self.arena, id, false);
        let wire = self.arena.get_mut(id).wire.as_mut().expect("checked above");
        wire.searched = true;
    }

    /// `transmit_power`: pushes this wire's (clamped) virtual power out
    /// along every OUT connection, offering the receiving side and
    /// re-enqueueing any peer that offer actually raised.
    fn transmit_power(&mut self, id: NodeId) {
        let (wire_type, source_power, offers): (_, _, SmallVec<[(ConnectionSide, NodeId); 8]>) = {
            let wire = self.arena.get(id).wire.as_ref().expect("transmit_power on non-wire");
            (
                wire.wire_type,
                wire.clamped_virtual_power(),
                wire.connections
                    .iter()
                    .filter(|c| c.kind.flows_out())
                    .map(|c| (c.side, c.target))
                    .collect(),
            )
        };

        for (side, target) in offers {
            let target_wire_type = self
                .arena
                .get(target)
                .wire
                .as_ref()
                .expect("connection target is a wire")
                .wire_type;
            let step = wire_type.step_to(target_wire_type);
            let power = crate::power::step_power(source_power, step, target_wire_type.signal);
            let receiving_side = crate::connections::opposite_side(side);
            let raised = self
                .arena
                .get_mut(target)
                .wire
                .as_mut()
                .expect("connection target is a wire")
                .offer_power(power, receiving_side);
            if raised {
                self.update_queue.push(target);
            }
        }
    }

    /// Commits a wire's final power to the world, then notifies
    /// neighbors if anything observable changed. The notification
    /// calls may reenter `on_wire_update`/`settle`; the reentrancy
    /// guard in `settle` ensures that reentrant call only enqueues.
    ///
    /// A removed wire has no block state left to rewrite — the world
    /// already reflects its removal — so it skips straight to notifying
    /// neighbors with the current (post-removal) block state.
    fn commit<W: World<State = S>>(&mut self, world: &mut W, id: NodeId) {
        let node = self.arena.get(id);
        let pos = node.pos;
        let old_state = node.state;
        let wire = node.wire.as_ref().expect("commit on non-wire");
        let final_power = wire.clamped_virtual_power();
        let identity_changed = wire.added || wire.removed;

        if wire.removed {
            let current = world.get_block_state(pos);
            world.update_neighbors(pos);
            world.update_neighbor_shapes(pos, current);
            return;
        }

        if final_power == wire.current_power && !identity_changed {
            return;
        }

        let new_state = old_state.with_power(final_power);
        let changed = world.set_block_state(pos, new_state) || identity_changed;

        {
            let node = self.arena.get_mut(id);
            node.state = new_state;
            node.wire.as_mut().expect("commit on non-wire").current_power = final_power;
        }

        if changed {
            world.update_neighbors(pos);
            world.update_neighbor_shapes(pos, new_state);
        }
    }

    /// The non-wire half of phase 3 (§4.5): a root that turned out not
    /// to be a wire still gets one `BlockState::update` call, provided
    /// it's still neither air nor a wire by the time phase 3 reaches it.
    fn apply_non_wire<W: World<State = S>>(&mut self, world: &mut W, id: NodeId) {
        let pos = self.arena.get(id).pos;
        let fresh = world.get_block_state(pos);
        if fresh.is_air() || fresh.is_wire() {
            return;
        }
        fresh.update(world, pos);
    }
}

impl<S: BlockState> Default for SignalEngine<S> {
    fn default() -> Self {
        SignalEngine::new()
    }
}
