//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use crossbeam_channel::Receiver;
use std::collections::BTreeSet;
use visflow::data::{Package, SubsetPackage};
use visflow::flow::{Dataflow, FlowEvent, NodeId};

/// Small dataset used across tests: rows 0..=5 with a numeric and a text column.
pub const CARS_CSV: &str = "\
name,mpg,origin
ford,18,usa
bmw,24,europe
toyota,31,japan
chevy,15,usa
audi,27,europe
honda,34,japan
";

/// Row indices held by a package.
pub fn indices(pack: &SubsetPackage) -> BTreeSet<usize> {
    pack.indices().collect()
}

/// Row indices of a node's `out` port.
pub fn output_indices(flow: &Dataflow, node: NodeId) -> BTreeSet<usize> {
    flow.output_package(node)
        .ok()
        .and_then(|p| match p.as_ref() {
            Package::Subset(s) => Some(indices(s)),
            Package::Constants(_) => None,
        })
        .unwrap_or_default()
}

/// Drain every event currently queued.
pub fn drain(rx: &Receiver<FlowEvent>) -> Vec<FlowEvent> {
    rx.try_iter().collect()
}
