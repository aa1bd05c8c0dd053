//! The external interfaces the signal engine consumes: the `World`
//! facade it queries and mutates, the `BlockState` capability surface a
//! block kind implements to participate in a network, and the small
//! value types (`SignalType`, `WireType`, `ConnectionType`) that
//! parameterize a power domain.
//!
//! This crate intentionally knows nothing about chunks, persistence, or
//! rendering; `World` is a pure facade so the engine can be driven by a
//! real chunked world or, as in the test suite, a flat hash map.

use redwire_blocks::{CellPos, Direction};

/// A `(min, max, step)` triple parameterizing a power domain. `step` is
/// the power decrement applied per hop between two wires of this type;
/// a `step` of zero marks a self-referential wire kind that must not
/// power itself (see [`WireType::is_self_referential`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalType {
    pub min: u8,
    pub max: u8,
    pub step: u8,
}

impl SignalType {
    pub const fn new(min: u8, max: u8, step: u8) -> SignalType {
        SignalType { min, max, step }
    }

    pub fn clamp(self, value: i32) -> u8 {
        value.clamp(self.min as i32, self.max as i32) as u8
    }
}

/// Binds a [`SignalType`] to a specific wire block kind. `id` identifies
/// the concrete wire block (two `WireType`s with the same `id` are the
/// same kind of wire); distinct ids sharing a `signal` still interoperate
/// on the same network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireType {
    pub id: u32,
    pub signal: SignalType,
}

impl WireType {
    pub const fn new(id: u32, signal: SignalType) -> WireType {
        WireType { id, signal }
    }

    /// A `step` of zero identifies wires that must not offer power back
    /// to the same cell that fed them; see DESIGN.md for why this
    /// matters to `find_wire_power`.
    pub fn is_self_referential(self) -> bool {
        self.signal.step == 0
    }

    /// The per-hop decrement between two (possibly different) wire
    /// kinds sharing a network: the larger of the two steps, so the
    /// slower-decaying kind never outpaces the faster one.
    pub fn step_to(self, other: WireType) -> u8 {
        self.signal.step.max(other.signal.step)
    }

    /// Whether, and in which direction, power may cross from `self` to
    /// `other`. Distinct wire kinds of the same signal are symmetric by
    /// default; embedders with asymmetric wire kinds (diodes, one-way
    /// rails) can special-case pairs here.
    pub fn connection_to(self, _other: WireType) -> ConnectionType {
        ConnectionType::Both
    }
}

/// Whether a connection between two wires carries power in, out, or
/// both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    In,
    Out,
    Both,
}

impl ConnectionType {
    pub fn flows_in(self) -> bool {
        matches!(self, ConnectionType::In | ConnectionType::Both)
    }

    pub fn flows_out(self) -> bool {
        matches!(self, ConnectionType::Out | ConnectionType::Both)
    }
}

/// Which of the eighteen [`redwire_blocks::ConnectionSide`] geometries a
/// wire's current shape exposes. Non-wire blocks return `empty()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionMask(u32);

impl ConnectionMask {
    pub fn empty() -> ConnectionMask {
        ConnectionMask(0)
    }

    pub fn single(side: redwire_blocks::ConnectionSide) -> ConnectionMask {
        ConnectionMask::empty().with(side)
    }

    pub fn with(mut self, side: redwire_blocks::ConnectionSide) -> ConnectionMask {
        self.0 |= 1 << Self::bit(side);
        self
    }

    pub fn contains(self, side: redwire_blocks::ConnectionSide) -> bool {
        self.0 & (1 << Self::bit(side)) != 0
    }

    fn bit(side: redwire_blocks::ConnectionSide) -> u32 {
        redwire_blocks::ALL_CONNECTION_SIDES
            .iter()
            .position(|s| *s == side)
            .expect("every ConnectionSide has a bit") as u32
    }

    /// All eighteen direct + diagonal + staircase sides set. A common
    /// shorthand for a wire shape with no directional restriction.
    pub fn all() -> ConnectionMask {
        redwire_blocks::ALL_CONNECTION_SIDES
            .iter()
            .fold(ConnectionMask::empty(), |m, s| m.with(*s))
    }
}

/// The capability surface a block kind implements to participate in the
/// signal engine. Implementors are expected to be small `Copy` value
/// types (an enum tag plus inline fields), mirroring how the rest of the
/// corpus represents block state: a snapshot the engine can cache by
/// value in a [`Node`](../redwire_engine/struct.Node.html), not a
/// trait object.
pub trait BlockState: Copy + Eq + std::fmt::Debug {
    fn is_air(&self) -> bool;

    /// True for any wire block, regardless of signal type.
    fn is_wire(&self) -> bool;

    /// True if this cell is a wire carrying `signal`.
    fn is_wire_of_signal(&self, signal: SignalType) -> bool;

    /// True if this cell is specifically a wire of `wire`.
    fn is_wire_of_type(&self, wire: WireType) -> bool;

    /// True if `self` and `other` are the exact same block kind
    /// (ignoring any power level difference for wires).
    fn is_same_kind(&self, other: &Self) -> bool;

    /// The wire type this cell is bound to, if it is a wire.
    fn wire_type(&self) -> Option<WireType>;

    /// The wire's current power, or 0 for non-wires.
    fn power(&self) -> u8;

    /// Returns a copy of this wire with its power replaced.
    fn with_power(&self, new_power: u8) -> Self;

    /// Which connection geometries this wire's current shape exposes.
    fn connections_view(&self) -> ConnectionMask;

    /// True if this cell unconditionally emits `signal` at full
    /// strength in every direction that isn't otherwise excluded (e.g. a
    /// lever, a powered block).
    fn is_signal_source(&self, signal: SignalType) -> bool;

    /// True if this cell conducts `signal` through itself from `dir`
    /// (e.g. a solid block, which relays power from a source on one
    /// face to a wire on another).
    fn is_signal_conductor(&self, dir: Direction, signal: SignalType) -> bool;

    /// The weak signal this cell emits toward `dir`, as seen by a wire
    /// one cell away in that direction.
    fn get_signal<W: World<State = Self>>(
        &self,
        world: &W,
        pos: CellPos,
        dir: Direction,
        signal: SignalType,
    ) -> u8;

    /// The strong ("direct") signal this cell emits toward `dir`, used
    /// when probing through a conductor.
    fn get_direct_signal<W: World<State = Self>>(
        &self,
        world: &W,
        pos: CellPos,
        dir: Direction,
        signal: SignalType,
    ) -> u8;

    /// False if this cell's supporting geometry has been invalidated
    /// (its attachment block removed, etc.) and it must break.
    fn can_exist<W: World<State = Self>>(&self, world: &W, pos: CellPos) -> bool;

    /// Non-wire update: re-derive this cell's own state in response to a
    /// neighbor change (e.g. a lamp re-checking whether it should be lit).
    fn update<W: World<State = Self>>(&self, world: &mut W, pos: CellPos);

    /// Shape update: notify this cell that the block at `nbr_pos` in
    /// direction `dir` became `nbr_state`, in case that invalidates this
    /// cell's geometry (e.g. the floor a wire sits on disappearing).
    fn update_shape<W: World<State = Self>>(
        &self,
        world: &mut W,
        pos: CellPos,
        dir: Direction,
        nbr_pos: CellPos,
        nbr_state: Self,
    );
}

/// The world facade the engine queries and mutates. Storage, chunking,
/// and persistence are the caller's concern; the engine only ever reads
/// and writes individual cells.
pub trait World {
    type State: BlockState;

    fn get_block_state(&self, pos: CellPos) -> Self::State;

    /// Writes `new_state` to `pos`. Returns whether the write actually
    /// changed anything observable.
    fn set_block_state(&mut self, pos: CellPos, new_state: Self::State) -> bool;

    /// Notifies every non-wire neighbor of `pos` that it should re-check
    /// its own state (`BlockState::update`). May reenter the engine.
    fn update_neighbors(&mut self, pos: CellPos);

    /// Notifies every neighbor of `pos` that the block at `pos` became
    /// `state`, so each can re-check its geometry
    /// (`BlockState::update_shape`). May reenter the engine.
    fn update_neighbor_shapes(&mut self, pos: CellPos, state: Self::State);
}
