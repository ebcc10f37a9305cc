//! IdentityNode: forwards its input unchanged.

use crate::data::PackageKind;
use crate::flow::error::FlowResult;
use crate::flow::node::{NodeContext, NodePlugin, ProcessOutcome};
use crate::flow::port::PortDescriptor;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PackageKind::Subset),
    PortDescriptor::output("out", PackageKind::Subset),
];

#[derive(Default)]
pub struct IdentityNode;

impl IdentityNode {
    pub fn new() -> Self {
        Self
    }
}

impl NodePlugin for IdentityNode {
    fn name(&self) -> &str {
        "Identity"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        let input = ctx.subset("in")?.clone();
        ctx.set_output("out", input)?;
        Ok(ProcessOutcome::Done)
    }
}
