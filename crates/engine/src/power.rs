//! Power computation (§4.4): the external signal a wire receives from
//! non-wire neighbors, and the signal a wire receives from its wire
//! connections.
//!
//! Grounded on `get_max_current_strength`/`calculate_current_changes` in
//! `turbo.rs` and the weak/strong-power probing in `wire/mod.rs`'s
//! `calculate_power`, generalized from MCHPRS's fixed 15-strength
//! redstone signal to an arbitrary [`SignalType`].

use smallvec::SmallVec;

use redwire_blocks::{CellPos, ConnectionSide};
use redwire_world::{BlockState, SignalType, World};

use crate::node::{get_or_add, link_neighbor, NodeArena, NodeId};

/// The strongest signal any non-wire neighbor (or a conductor relaying a
/// source on its far side) offers this wire, per §4.4's external power
/// rule. Returns `signal.min` if nothing offers power.
///
/// Walks through the arena's lazily-built neighbor links rather than
/// querying `world` directly, so a cell probed here is cached for reuse
/// by a later settle phase or a neighboring wire's own probe.
pub fn find_external_power<S, W>(
    arena: &mut NodeArena<S>,
    node_map: &mut rustc_hash::FxHashMap<CellPos, NodeId>,
    world: &W,
    id: NodeId,
    signal: SignalType,
) -> u8
where
    S: BlockState,
    W: World<State = S>,
{
    let mut best = signal.min;

    for dir in redwire_blocks::ALL_DIRECTIONS {
        let nbr_id = link_neighbor(arena, node_map, world, id, dir);
        let nbr = arena.get(nbr_id);
        if nbr.wire.is_some() {
            continue;
        }
        let nbr_pos = nbr.pos;
        let nbr_state = nbr.state;
        let direct = nbr_state.get_signal(world, nbr_pos, dir.opposite(), signal);
        best = best.max(direct);

        if nbr_state.is_signal_conductor(dir.opposite(), signal) {
            for probe_dir in redwire_blocks::except(dir.opposite()) {
                let probe_pos = nbr_pos.offset(probe_dir);
                let probe_id = get_or_add(arena, node_map, world, probe_pos);
                let probe = arena.get(probe_id);
                if probe.wire.is_some() {
                    continue;
                }
                let through = probe
                    .state
                    .get_direct_signal(world, probe_pos, probe_dir.opposite(), signal);
                best = best.max(through);
            }
        }
    }
    best
}

/// The signal offered to `target` across one [`ConnectionSide`] link
/// from `source`, after the per-hop step decrement. Self-referential
/// wire kinds (`step == 0`) never offer power back across a link they
/// also received power through in the same settle; callers filter that
/// case via [`redwire_world::WireType::is_self_referential`].
pub fn step_power(source_power: u8, step: u8, signal: SignalType) -> u8 {
    signal.clamp(source_power as i32 - step as i32)
}

/// `find_power` (§4.4): resets `virtual_power` to the wire's already
/// computed `external_power` and `flow_in` to empty, then — unless
/// `external_power` already saturates the signal's max — folds in every
/// IN connection's contribution. With `ignore_searched`, a peer that
/// has already been visited by this settle's search pass contributes
/// nothing (the depower phase's "pretend the network is empty" pass).
pub fn find_power<S: BlockState>(arena: &mut NodeArena<S>, id: NodeId, ignore_searched: bool) {
    let (wire_type, external_power) = {
        let wire = arena.get(id).wire.as_ref().expect("find_power on non-wire node");
        (wire.wire_type, wire.external_power)
    };
    let signal = wire_type.signal;

    {
        let wire = arena.get_mut(id).wire.as_mut().expect("find_power on non-wire node");
        wire.virtual_power = external_power;
        wire.flow_in = redwire_blocks::FlowMask::empty();
    }

    if external_power >= signal.max as i32 {
        return;
    }

    let incoming: SmallVec<[(ConnectionSide, NodeId); 8]> = arena
        .get(id)
        .wire
        .as_ref()
        .expect("checked above")
        .connections
        .iter()
        .filter(|c| c.kind.flows_in())
        .map(|c| (c.side, c.target))
        .collect();

    for (side, target) in incoming {
        let peer = arena.get(target).wire.as_ref().expect("connection target is a wire");
        if ignore_searched && peer.searched {
            continue;
        }
        let step = wire_type.step_to(peer.wire_type);
        let contribution = ((peer.virtual_power - step as i32).max(signal.min as i32)) as u8;
        arena
            .get_mut(id)
            .wire
            .as_mut()
            .expect("checked above")
            .offer_power(contribution, side);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_power_clamps_to_min() {
        let signal = SignalType::new(0, 15, 1);
        assert_eq!(step_power(0, 1, signal), 0);
    }

    #[test]
    fn step_power_decrements() {
        let signal = SignalType::new(0, 15, 1);
        assert_eq!(step_power(10, 1, signal), 9);
    }
}
