//! DataSourceNode: loads a dataset and emits every row.
//!
//! Loading is asynchronous: the first `process` returns a fetch request and the
//! dataflow suspends until `complete_async` delivers the raw text. The parsed
//! dataset is cached per (username, filename).

use crate::data::{PackageKind, SubsetPackage, TabularDataset};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::node::{
    AsyncCompletion, ConfigValue, FetchRequest, NodeContext, NodePlugin, ProcessOutcome,
};
use crate::flow::nodes::{options_from_json, options_to_json};
use crate::flow::port::PortDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", PackageKind::Subset)];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceOptions {
    pub username: String,
    pub filename: String,
}

struct CachedDataset {
    username: String,
    filename: String,
    dataset: Arc<TabularDataset>,
}

pub struct DataSourceNode {
    options: DataSourceOptions,
    cache: Option<CachedDataset>,
    inline: Option<Arc<TabularDataset>>,
}

impl DataSourceNode {
    pub fn new() -> Self {
        Self {
            options: DataSourceOptions::default(),
            cache: None,
            inline: None,
        }
    }

    /// A source emitting an in-memory dataset without fetching.
    pub fn with_dataset(dataset: Arc<TabularDataset>) -> Self {
        let mut node = Self::new();
        node.options.filename = dataset.name().to_string();
        node.inline = Some(dataset);
        node
    }

    pub fn options(&self) -> &DataSourceOptions {
        &self.options
    }

    /// Owner used when the diagram does not name one.
    pub fn set_default_username(&mut self, username: &str) {
        if self.options.username.is_empty() {
            self.options.username = username.to_string();
        }
    }

    /// The dataset currently emitted, if loaded.
    pub fn dataset(&self) -> Option<&Arc<TabularDataset>> {
        self.inline
            .as_ref()
            .or_else(|| self.cached().map(|c| &c.dataset))
    }

    fn cached(&self) -> Option<&CachedDataset> {
        self.cache.as_ref().filter(|c| {
            c.username == self.options.username && c.filename == self.options.filename
        })
    }
}

impl Default for DataSourceNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePlugin for DataSourceNode {
    fn name(&self) -> &str {
        "Data Source"
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn process(&mut self, ctx: &mut NodeContext) -> FlowResult<ProcessOutcome> {
        if let Some(dataset) = self.dataset() {
            ctx.set_output("out", SubsetPackage::full(dataset.clone()))?;
            return Ok(ProcessOutcome::Done);
        }
        if self.options.filename.is_empty() {
            ctx.set_output("out", SubsetPackage::new())?;
            return Ok(ProcessOutcome::Done);
        }
        Ok(ProcessOutcome::Pending(FetchRequest {
            username: self.options.username.clone(),
            filename: self.options.filename.clone(),
        }))
    }

    fn complete_async(
        &mut self,
        completion: AsyncCompletion,
        ctx: &mut NodeContext,
    ) -> FlowResult<ProcessOutcome> {
        let text = completion.map_err(FlowError::Fetch)?;
        let dataset = Arc::new(TabularDataset::parse(&self.options.filename, &text)?);
        tracing::info!(
            "Loaded '{}' ({} rows, {} dimensions)",
            dataset.name(),
            dataset.num_rows(),
            dataset.num_dimensions()
        );
        self.cache = Some(CachedDataset {
            username: self.options.username.clone(),
            filename: self.options.filename.clone(),
            dataset: dataset.clone(),
        });
        ctx.set_output("out", SubsetPackage::full(dataset))?;
        Ok(ProcessOutcome::Done)
    }

    fn on_config_change(&mut self, key: &str, value: &ConfigValue) -> FlowResult<()> {
        match key {
            "username" => self.options.username = value.require_str(key)?.to_string(),
            "filename" => self.options.filename = value.require_str(key)?.to_string(),
            _ => return Err(FlowError::unknown_setting(key)),
        }
        self.inline = None;
        Ok(())
    }

    fn serialize_options(&self) -> serde_json::Value {
        options_to_json(&self.options)
    }

    fn deserialize_options(&mut self, options: &serde_json::Value) -> FlowResult<()> {
        self.options = options_from_json(options)?;
        self.inline = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::id::{NodeId, PortId};
    use crate::flow::port::Port;

    fn ports() -> Vec<Port> {
        vec![Port::new(PortId::new(NodeId(0), 0), PORTS[0])]
    }

    #[test]
    fn test_requests_fetch_then_emits_rows() {
        let mut node = DataSourceNode::new();
        node.on_config_change("filename", &ConfigValue::String("cars.csv".into()))
            .unwrap();
        node.set_default_username("alice");

        let ports = ports();
        let mut ctx = NodeContext::new(NodeId(0), 1, &ports);
        let outcome = node.process(&mut ctx).unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Pending(FetchRequest {
                username: "alice".into(),
                filename: "cars.csv".into(),
            })
        );

        let outcome = node
            .complete_async(Ok("a,b\n1,2\n3,4\n".into()), &mut ctx)
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Done);
        let staged = ctx.into_staged();
        assert_eq!(staged[0].as_ref().unwrap().count(), 2);

        // Cached now
        let mut ctx = NodeContext::new(NodeId(0), 2, &ports);
        assert_eq!(node.process(&mut ctx).unwrap(), ProcessOutcome::Done);
    }

    #[test]
    fn test_fetch_failure() {
        let mut node = DataSourceNode::new();
        let ports = ports();
        let mut ctx = NodeContext::new(NodeId(0), 1, &ports);
        let err = node
            .complete_async(Err("not found".into()), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, FlowError::Fetch(_)));
    }

    #[test]
    fn test_no_file_emits_empty() {
        let mut node = DataSourceNode::new();
        let ports = ports();
        let mut ctx = NodeContext::new(NodeId(0), 1, &ports);
        assert_eq!(node.process(&mut ctx).unwrap(), ProcessOutcome::Done);
        assert!(ctx.into_staged()[0].as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_options_round_trip() {
        let mut node = DataSourceNode::new();
        node.deserialize_options(&serde_json::json!({"username": "bob", "filename": "x.json"}))
            .unwrap();
        assert_eq!(node.options().filename, "x.json");
        assert_eq!(node.serialize_options()["username"], "bob");
    }

    #[test]
    fn test_rejected_setting_keeps_options() {
        let mut node = DataSourceNode::new();
        node.on_config_change("filename", &ConfigValue::String("cars.csv".into()))
            .unwrap();
        assert!(matches!(
            node.on_config_change("filename", &ConfigValue::Int(7)),
            Err(FlowError::InvalidSetting { .. })
        ));
        assert!(node.on_config_change("file", &ConfigValue::String("x".into())).is_err());
        assert_eq!(node.options().filename, "cars.csv");
    }
}
