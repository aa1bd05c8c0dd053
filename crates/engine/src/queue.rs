//! Queueing machinery for the settle driver (§4.6): an intrusive FIFO
//! used to walk the wire graph during search, and a two-tier (roots
//! first, then insertion order) queue used to drive block updates.
//!
//! Grounded on `RedstoneWireTurbo::update_queue: Vec<Vec<NodeId>>` and
//! its `shift_queue`/`breadth_first_walk` pair, generalized from
//! MCHPRS's fixed-depth layer vector to an intrusive linked list so the
//! search queue never needs to know its own depth in advance.

use crate::node::{NodeArena, NodeId};
use redwire_world::BlockState;

/// A singly-linked FIFO of [`NodeId`]s, threaded through
/// [`crate::node::WireData::search_next`] so enqueueing costs no
/// allocation beyond the arena's own.
pub struct SearchQueue {
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl SearchQueue {
    pub fn new() -> SearchQueue {
        SearchQueue { head: None, tail: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Enqueues `id` if it isn't already in the queue. No-op for
    /// non-wire nodes.
    pub fn push<S: BlockState>(&mut self, arena: &mut NodeArena<S>, id: NodeId) {
        let Some(wire) = &mut arena.get_mut(id).wire else { return };
        if wire.in_search_queue {
            return;
        }
        wire.in_search_queue = true;
        wire.search_next = None;
        match self.tail {
            Some(tail) => {
                arena.get_mut(tail).wire.as_mut().expect("tail is a wire").search_next = Some(id);
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Pops the front of the queue, clearing its membership flag.
    pub fn pop<S: BlockState>(&mut self, arena: &mut NodeArena<S>) -> Option<NodeId> {
        let id = self.head?;
        let wire = arena.get_mut(id).wire.as_mut().expect("queued node is a wire");
        self.head = wire.search_next.take();
        wire.in_search_queue = false;
        if self.head.is_none() {
            self.tail = None;
        }
        Some(id)
    }
}

impl Default for SearchQueue {
    fn default() -> Self {
        SearchQueue::new()
    }
}

/// The block-update queue (§4.6): roots discovered this settle run
/// before any node reached during the ordinary breadth-first walk, and
/// within each tier, insertion order (FIFO) is preserved.
pub struct UpdateQueue {
    roots: Vec<NodeId>,
    rest: Vec<NodeId>,
    cursor: usize,
}

impl UpdateQueue {
    pub fn new() -> UpdateQueue {
        UpdateQueue {
            roots: Vec::new(),
            rest: Vec::new(),
            cursor: 0,
        }
    }

    pub fn push_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    pub fn push(&mut self, id: NodeId) {
        self.rest.push(id);
    }

    pub fn is_empty(&self) -> bool {
        self.cursor >= self.roots.len() + self.rest.len()
    }

    /// Pops in roots-first, then-FIFO order.
    pub fn pop(&mut self) -> Option<NodeId> {
        if self.cursor < self.roots.len() {
            let id = self.roots[self.cursor];
            self.cursor += 1;
            return Some(id);
        }
        let rest_index = self.cursor - self.roots.len();
        if rest_index < self.rest.len() {
            self.cursor += 1;
            return Some(self.rest[rest_index]);
        }
        None
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.rest.clear();
        self.cursor = 0;
    }
}

impl Default for UpdateQueue {
    fn default() -> Self {
        UpdateQueue::new()
    }
}
