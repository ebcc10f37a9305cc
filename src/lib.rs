//! # VisFlow: subset-flow engine for visual data exploration
//!
//! Users wire nodes (data sources, filters, set operators, visualizations)
//! into a dataflow diagram. The engine propagates dataset subsets through
//! the graph and keeps each node's output up to date as the diagram is
//! edited. Rendering is left to the UI, which talks to the engine through a
//! [`Session`] and listens for [`FlowEvent`]s.
//!
//! ## Architecture
//!
//! - **Data**: tabular datasets, subset packages with per-item visual
//!   overlays, constant lists and selections
//! - **Flow**: nodes, typed ports, edges and the propagation scheduler
//! - **History**: undo/redo of graph edits
//! - **Session**: one editing session owning the graph, its history and
//!   the dataset fetcher
//!
//! ## Configuration
//!
//! Engine settings are stored as TOML under the platform data directory,
//! in `visflow/config.toml`. See [`config::EngineConfig`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use visflow::{config::EngineConfig, fetch::DirectoryFetcher, flow::*, Session};
//!
//! let config = EngineConfig::load_or_default();
//! let fetcher = Arc::new(DirectoryFetcher::new(&config.data_dir));
//! let (mut session, events) = Session::with_channel(config, fetcher);
//!
//! let source = session.create_node(NodeType::DataSource, Position::default());
//! session.configure_node(source, "filename", ConfigValue::String("cars.csv".into()))?;
//! let plot = session.create_node(NodeType::Scatterplot, Position::new(200.0, 0.0));
//! session.connect_ports(source, "out", plot, "in")?;
//! session.settle().await;
//!
//! for event in events.try_iter() {
//!     println!("{:?}", event);
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod fetch;
pub mod flow;
pub mod history;
pub mod session;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{Result, ResultExt, VisFlowError};
pub use fetch::{DatasetFetcher, DirectoryFetcher, MemoryFetcher};
pub use flow::{Dataflow, Diagram, FlowError, FlowEvent, FlowEvents, NodeId, NodeType, PassStatus};
pub use history::{HistoryLog, HistoryRecord, HistoryStep};
pub use session::{GraphAction, Session};
