//! Dataflow graph engine.
//!
//! Nodes expose typed ports; edges connect an output port to an input port.
//! When a node's inputs or settings change, [`Dataflow::propagate`] re-runs
//! it and everything downstream in topological order.
//!
//! # Architecture
//!
//! ```text
//! DataSource ──► RangeFilter ──► Union ──► Scatterplot ──► selection
//!                    ▲             ▲
//! ValueMaker ────────┘   Sampler ──┘
//! ```
//!
//! Ports hold shared [`Package`](crate::data::Package)s. Outputs are pushed
//! into downstream input ports by reference, so a dataset is parsed once
//! and shared by every subset derived from it.

pub mod dataflow;
pub mod diagram;
pub mod edge;
pub mod error;
pub mod events;
pub mod id;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod port;
pub mod scheduler;

pub use dataflow::{Dataflow, NodeSlot, PassStatus, RemovedEdge};
pub use diagram::{Diagram, SavedEdge, SavedNode, DIAGRAM_VERSION};
pub use edge::Edge;
pub use error::{ErrorCategory, FlowError, FlowResult};
pub use events::{FlowEvent, FlowEvents};
pub use id::{EdgeId, NodeId, PortId};
pub use node::{
    AnyNode, AsyncCompletion, AsyncRequest, AsyncTicket, BuiltinNode, ConfigValue, FetchRequest,
    NodeContext, NodePlugin, NodeState, Position, ProcessOutcome,
};
pub use node_type::NodeType;
pub use nodes::NodeFactory;
pub use port::{Capacity, Port, PortDescriptor, PortDirection};
pub use scheduler::{PlanStats, PropagationPlan, PropagationScheduler};
