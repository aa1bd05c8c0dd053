//! `redwire`: a signal-propagation engine for wire networks embedded in
//! a voxel grid. This crate is a thin facade over [`redwire_engine`];
//! most embedders only need `SignalEngine`, `World`, and `BlockState`.

pub use redwire_blocks::{
    CellPos, ConnectionSide, Direction, FlowMask, ALL_CONNECTION_SIDES, ALL_DIRECTIONS, CARDINALS,
};
pub use redwire_engine::{Connections, Node, NodeArena, NodeId, RootKind, SignalEngine, WireConnection, WireData};
pub use redwire_world::{BlockState, ConnectionMask, ConnectionType, SignalType, World, WireType};
