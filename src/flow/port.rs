//! Ports: the typed endpoints edges attach to.
//!
//! Each node declares its ports via a static `PortDescriptor` array. The
//! dataflow builds one [`Port`] per descriptor when the node is added and uses
//! the descriptors to validate connections.

use crate::data::{Package, PackageKind};
use crate::flow::id::{EdgeId, PortId};
use std::sync::Arc;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// How many edges a port accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Single,
    Multiple,
}

/// Static descriptor for a node's port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    pub kind: PackageKind,
    pub capacity: Capacity,
}

impl PortDescriptor {
    pub const fn input(name: &'static str, kind: PackageKind) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind,
            capacity: Capacity::Single,
        }
    }

    pub const fn input_multiple(name: &'static str, kind: PackageKind) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind,
            capacity: Capacity::Multiple,
        }
    }

    /// Output ports always accept any number of edges.
    pub const fn output(name: &'static str, kind: PackageKind) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            kind,
            capacity: Capacity::Multiple,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}

/// Package held by an input port for one incoming edge.
#[derive(Debug, Clone)]
struct HeldPackage {
    pack: Arc<Package>,
    changed: bool,
}

/// Runtime state of one port.
///
/// `connections` lists edges in connection order. For input ports `held` is
/// parallel to it and `pack` aliases the most recently connected package (or
/// an empty one when unconnected). For output ports `pack` is the node's
/// current output.
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    descriptor: PortDescriptor,
    connections: Vec<EdgeId>,
    held: Vec<HeldPackage>,
    pack: Arc<Package>,
    changed: bool,
}

impl Port {
    pub fn new(id: PortId, descriptor: PortDescriptor) -> Self {
        Self {
            id,
            descriptor,
            connections: Vec::new(),
            held: Vec::new(),
            pack: Arc::new(Package::empty(descriptor.kind)),
            changed: false,
        }
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn kind(&self) -> PackageKind {
        self.descriptor.kind
    }

    pub fn is_input(&self) -> bool {
        self.descriptor.is_input()
    }

    pub fn connections(&self) -> &[EdgeId] {
        &self.connections
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// False only for a single-capacity port that already has an edge.
    pub fn has_more_connections(&self) -> bool {
        match self.descriptor.capacity {
            Capacity::Multiple => true,
            Capacity::Single => self.connections.is_empty(),
        }
    }

    /// Current package: the output of an output port, or the last connected
    /// input package.
    pub fn package(&self) -> &Arc<Package> {
        &self.pack
    }

    /// Packages in connection order. Output ports yield their single output.
    pub fn packages(&self) -> Vec<&Arc<Package>> {
        if self.is_input() {
            self.held.iter().map(|h| &h.pack).collect()
        } else {
            vec![&self.pack]
        }
    }

    /// Attach an edge. Input ports start holding `pack` for it.
    pub fn connect(&mut self, edge: EdgeId, pack: Arc<Package>) {
        let slot = self.connections.len();
        self.connect_at(edge, pack, slot);
    }

    /// Attach an edge at position `slot` (clamped to the current length).
    pub fn connect_at(&mut self, edge: EdgeId, pack: Arc<Package>, slot: usize) {
        let slot = slot.min(self.connections.len());
        self.connections.insert(slot, edge);
        if self.is_input() {
            self.held.insert(slot, HeldPackage { pack, changed: true });
            self.refresh_alias();
            self.changed = true;
        }
    }

    /// Detach an edge, keeping the order of the remaining connections.
    ///
    /// Returns the position the edge occupied.
    pub fn disconnect(&mut self, edge: EdgeId) -> Option<usize> {
        let slot = self.connections.iter().position(|e| *e == edge)?;
        self.connections.remove(slot);
        if self.is_input() {
            self.held.remove(slot);
            self.refresh_alias();
            self.changed = true;
        }
        Some(slot)
    }

    /// Position of `edge` in connection order.
    pub fn slot_of(&self, edge: EdgeId) -> Option<usize> {
        self.connections.iter().position(|e| *e == edge)
    }

    /// Replace the package held for `edge` with a new upstream output.
    pub fn refresh(&mut self, edge: EdgeId, pack: Arc<Package>) {
        if let Some(slot) = self.slot_of(edge) {
            if let Some(held) = self.held.get_mut(slot) {
                held.pack = pack;
                held.changed = true;
            }
            self.refresh_alias();
        }
    }

    /// Set the output of an output port.
    pub fn set_output(&mut self, pack: Arc<Package>) {
        self.pack = pack;
        self.changed = true;
    }

    /// True when any held package changed since the last `clear_changed`.
    pub fn is_changed(&self) -> bool {
        self.changed || self.held.iter().any(|h| h.changed)
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
        for held in &mut self.held {
            held.changed = false;
        }
    }

    fn refresh_alias(&mut self) {
        self.pack = match self.held.last() {
            Some(held) => held.pack.clone(),
            None => Arc::new(Package::empty(self.descriptor.kind)),
        };
    }
}
