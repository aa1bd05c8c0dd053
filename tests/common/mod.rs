//! A minimal in-memory `World`/`BlockState` fixture, grounded on
//! `tests/common/mod.rs`'s `TestWorld` in the teacher repo: a flat
//! position-keyed map standing in for chunk storage, plus the small set
//! of block kinds (wire, lever, solid) the scenarios in §8 need.

use std::collections::HashMap;
use std::sync::Once;

use redwire::{
    BlockState, CellPos, ConnectionMask, ConnectionSide, Direction, SignalEngine, SignalType,
    World, WireType, ALL_DIRECTIONS,
};

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary, so a settle's
/// `debug!`/`trace!` instrumentation is visible with `RUST_LOG=debug
/// cargo test -- --nocapture`, the same `EnvFilter`-driven setup the
/// teacher's server binary wires up at startup.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// The ordinary redstone-like signal: 0..=15, one-per-hop decay.
pub const REDSTONE: SignalType = SignalType::new(0, 15, 1);
/// A self-referential signal (step = 0): used by scenario 5 to prove
/// the engine never lets a `step == 0` wire feed itself.
pub const LOOP_SIGNAL: SignalType = SignalType::new(0, 15, 0);

pub const WIRE: WireType = WireType::new(0, REDSTONE);
pub const LOOP_WIRE: WireType = WireType::new(1, LOOP_SIGNAL);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoBlock {
    Air,
    Solid,
    /// A solid block that breaks the instant a neighboring wire's power
    /// changes under it; exists only to drive the reentrancy scenario.
    Fragile,
    /// A block that turns into a wire the instant a neighboring wire's
    /// power changes under it; exists only to drive a settle in which a
    /// brand new wire appears reentrantly and must still propagate past
    /// its own immediate neighbors.
    Sprout,
    Lever { powered: bool },
    Wire { wire: WireType, power: u8 },
}

impl DemoBlock {
    pub fn wire(wire: WireType, power: u8) -> DemoBlock {
        DemoBlock::Wire { wire, power }
    }
}

impl BlockState for DemoBlock {
    fn is_air(&self) -> bool {
        matches!(self, DemoBlock::Air)
    }

    fn is_wire(&self) -> bool {
        matches!(self, DemoBlock::Wire { .. })
    }

    fn is_wire_of_signal(&self, signal: SignalType) -> bool {
        matches!(self, DemoBlock::Wire { wire, .. } if wire.signal == signal)
    }

    fn is_wire_of_type(&self, wire_type: WireType) -> bool {
        matches!(self, DemoBlock::Wire { wire, .. } if *wire == wire_type)
    }

    fn is_same_kind(&self, other: &Self) -> bool {
        match (self, other) {
            (DemoBlock::Air, DemoBlock::Air) => true,
            (DemoBlock::Solid, DemoBlock::Solid) => true,
            (DemoBlock::Fragile, DemoBlock::Fragile) => true,
            (DemoBlock::Sprout, DemoBlock::Sprout) => true,
            (DemoBlock::Lever { .. }, DemoBlock::Lever { .. }) => true,
            (DemoBlock::Wire { wire: a, .. }, DemoBlock::Wire { wire: b, .. }) => a == b,
            _ => false,
        }
    }

    fn wire_type(&self) -> Option<WireType> {
        match self {
            DemoBlock::Wire { wire, .. } => Some(*wire),
            _ => None,
        }
    }

    fn power(&self) -> u8 {
        match self {
            DemoBlock::Wire { power, .. } => *power,
            _ => 0,
        }
    }

    fn with_power(&self, new_power: u8) -> Self {
        match self {
            DemoBlock::Wire { wire, .. } => DemoBlock::Wire { wire: *wire, power: new_power },
            other => *other,
        }
    }

    fn connections_view(&self) -> ConnectionMask {
        match self {
            DemoBlock::Wire { .. } => ConnectionMask::empty()
                .with(ConnectionSide::North)
                .with(ConnectionSide::South)
                .with(ConnectionSide::East)
                .with(ConnectionSide::West),
            _ => ConnectionMask::empty(),
        }
    }

    fn is_signal_source(&self, _signal: SignalType) -> bool {
        matches!(self, DemoBlock::Lever { powered: true })
    }

    fn is_signal_conductor(&self, _dir: Direction, _signal: SignalType) -> bool {
        matches!(self, DemoBlock::Solid | DemoBlock::Fragile)
    }

    fn get_signal<W: World<State = Self>>(
        &self,
        _world: &W,
        _pos: CellPos,
        _dir: Direction,
        signal: SignalType,
    ) -> u8 {
        match self {
            DemoBlock::Lever { powered: true } => signal.max,
            _ => signal.min,
        }
    }

    fn get_direct_signal<W: World<State = Self>>(
        &self,
        world: &W,
        pos: CellPos,
        dir: Direction,
        signal: SignalType,
    ) -> u8 {
        self.get_signal(world, pos, dir, signal)
    }

    fn can_exist<W: World<State = Self>>(&self, _world: &W, _pos: CellPos) -> bool {
        true
    }

    fn update<W: World<State = Self>>(&self, _world: &mut W, _pos: CellPos) {}

    fn update_shape<W: World<State = Self>>(
        &self,
        _world: &mut W,
        _pos: CellPos,
        _dir: Direction,
        _nbr_pos: CellPos,
        _nbr_state: Self,
    ) {
    }
}

/// The test world: a flat cell map plus the engine that settles it.
/// Reentrancy (a `World` callback driving a nested `settle`) uses
/// `std::mem::take` to move `engine` out of `self` for the duration of
/// the call it would otherwise alias — the standard way to let one
/// struct hold both a `World` impl and the engine that drives it
/// without unsafe code or interior mutability.
pub struct DemoWorld {
    cells: HashMap<CellPos, DemoBlock>,
    engine: SignalEngine<DemoBlock>,
}

impl DemoWorld {
    pub fn new() -> DemoWorld {
        init_tracing();
        DemoWorld {
            cells: HashMap::new(),
            engine: SignalEngine::new(),
        }
    }

    pub fn get(&self, pos: CellPos) -> DemoBlock {
        self.get_block_state(pos)
    }

    pub fn place_solid(&mut self, pos: CellPos) {
        self.cells.insert(pos, DemoBlock::Solid);
    }

    pub fn place_fragile(&mut self, pos: CellPos) {
        self.cells.insert(pos, DemoBlock::Fragile);
    }

    pub fn place_sprout(&mut self, pos: CellPos) {
        self.cells.insert(pos, DemoBlock::Sprout);
    }

    pub fn place_lever(&mut self, pos: CellPos, powered: bool) {
        self.cells.insert(pos, DemoBlock::Lever { powered });
    }

    /// Places a wire of `wire` at `pos` with power 0 and runs
    /// `on_wire_added` to settle the network it joins.
    pub fn place_wire(&mut self, pos: CellPos, wire: WireType) {
        self.cells.insert(pos, DemoBlock::wire(wire, 0));
        let mut engine = std::mem::take(&mut self.engine);
        engine.on_wire_added(self, pos);
        engine.settle(self);
        self.engine = engine;
    }

    /// Breaks whatever is at `pos` and settles the network that lost it.
    pub fn remove(&mut self, pos: CellPos) {
        let old_state = self.get_block_state(pos);
        self.cells.remove(&pos);
        let mut engine = std::mem::take(&mut self.engine);
        engine.on_wire_removed(self, pos, old_state);
        engine.settle(self);
        self.engine = engine;
    }

    /// Flips a lever's state, then tells the engine the cells adjacent
    /// to it should be reconsidered.
    pub fn set_lever(&mut self, pos: CellPos, powered: bool) {
        self.cells.insert(pos, DemoBlock::Lever { powered });
        let mut engine = std::mem::take(&mut self.engine);
        for dir in ALL_DIRECTIONS {
            let nbr = pos.offset(dir);
            if self.get_block_state(nbr).is_wire() {
                engine.on_neighbor_changed(self, nbr);
            }
        }
        engine.settle(self);
        self.engine = engine;
    }

    /// Re-runs `on_wire_update` at `pos` without any world change —
    /// used by the idempotence property test.
    pub fn poke(&mut self, pos: CellPos) {
        let mut engine = std::mem::take(&mut self.engine);
        engine.on_neighbor_changed(self, pos);
        engine.settle(self);
        self.engine = engine;
    }
}

impl Default for DemoWorld {
    fn default() -> Self {
        DemoWorld::new()
    }
}

impl World for DemoWorld {
    type State = DemoBlock;

    fn get_block_state(&self, pos: CellPos) -> DemoBlock {
        self.cells.get(&pos).copied().unwrap_or(DemoBlock::Air)
    }

    fn set_block_state(&mut self, pos: CellPos, new_state: DemoBlock) -> bool {
        let changed = self.cells.get(&pos).copied() != Some(new_state);
        self.cells.insert(pos, new_state);
        changed
    }

    fn update_neighbors(&mut self, pos: CellPos) {
        for dir in ALL_DIRECTIONS {
            let nbr_pos = pos.offset(dir);
            let nbr_state = self.get_block_state(nbr_pos);
            if !nbr_state.is_air() && !nbr_state.is_wire() {
                nbr_state.update(self, nbr_pos);
            }
        }
    }

    fn update_neighbor_shapes(&mut self, pos: CellPos, state: DemoBlock) {
        for dir in ALL_DIRECTIONS {
            let nbr_pos = pos.offset(dir);
            let nbr_state = self.get_block_state(nbr_pos);
            if nbr_state == DemoBlock::Fragile {
                // Its support changed power; it breaks, which is itself a
                // world change that deserves its own settle. This is where
                // a concrete `World` may reenter `on_wire_update`/`settle`
                // from inside a settle already in progress.
                let old_state = nbr_state;
                self.cells.remove(&nbr_pos);
                let mut engine = std::mem::take(&mut self.engine);
                engine.on_wire_removed(self, nbr_pos, old_state);
                engine.settle(self);
                self.engine = engine;
                continue;
            }
            if nbr_state == DemoBlock::Sprout {
                // Its neighbor just powered up; it sprouts into a wire of
                // its own, reentrantly, the same way `Fragile` breaks —
                // except this time the reentrant settle must still reach
                // past this wire's own immediate neighbors, not just
                // commit its own power.
                self.cells.insert(nbr_pos, DemoBlock::wire(WIRE, 0));
                let mut engine = std::mem::take(&mut self.engine);
                engine.on_wire_added(self, nbr_pos);
                engine.settle(self);
                self.engine = engine;
                continue;
            }
            if !nbr_state.is_air() {
                nbr_state.update_shape(self, nbr_pos, dir.opposite(), pos, state);
            }
        }
    }
}

pub fn pos(x: i32, y: i32, z: i32) -> CellPos {
    CellPos::new(x, y, z)
}
