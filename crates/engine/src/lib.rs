//! A signal-propagation engine for a voxel-world wire network: node
//! graph, connection discovery, root discovery, power computation, and
//! the three-phase settle driver that ties them together.
//!
//! Grounded throughout on `mchprs_redstone`'s `RedstoneWireTurbo`
//! (`crates/core/src/redstone/wire/turbo.rs`), generalized from a fixed
//! 0-15 redstone signal over cardinal wires to an arbitrary
//! [`redwire_world::SignalType`] over the full eighteen-geometry
//! connection set in [`redwire_blocks`].

pub mod connections;
pub mod node;
pub mod power;
pub mod queue;
pub mod roots;
pub mod settle;

pub use connections::{Connections, WireConnection};
pub use node::{Node, NodeArena, NodeId, WireData};
pub use roots::RootKind;
pub use settle::SignalEngine;
