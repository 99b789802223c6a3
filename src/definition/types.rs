/// Core workflow definition types
///
/// Defines the on-disk document structures for workflow definitions, nodes,
/// connection graphs and settings. Documents use camelCase keys and are
/// deserialized from JSON, YAML or evaluated Lua tables.
///
/// Fields the validator must report as missing (ids, names, node lists) use
/// lenient serde defaults, so an incomplete document still deserializes and
/// every structural problem surfaces in one validation report instead of a
/// parse failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A complete workflow definition containing nodes and their connections
///
/// Definitions are the unit of registration: the registry keys them by `id`
/// and atomically replaces the stored instance on a successful reload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    /// Unique definition identifier, stable across reloads (e.g. "bug-fixes")
    #[serde(default)]
    pub id: String,
    /// Human-readable definition name
    #[serde(default)]
    pub name: String,
    /// Optional free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Semantic version string, informational only
    #[serde(default)]
    pub version: String,
    /// Tags for registry lookups
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether this definition is active (filtered by `get_active`)
    #[serde(default)]
    pub active: bool,
    /// Ordered list of nodes in this definition
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Connection graph keyed by source node name
    #[serde(default)]
    pub connections: ConnectionMap,
    /// Optional execution settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl Definition {
    /// Conventional name of the primary output channel.
    pub const PRIMARY_CHANNEL: &'static str = "main";
}

/// A single node in a workflow definition
///
/// Nodes are discrete processing steps. The `type` tag is an opaque string
/// resolved by the external execution engine into a concrete executor; this
/// crate only checks the declared shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node identifier within the definition (e.g. "n1")
    #[serde(default)]
    pub id: String,
    /// Display name, unique within the definition; connection endpoints
    /// reference nodes by this name
    #[serde(default)]
    pub name: String,
    /// Executor type tag (e.g. "flowdeck.shell", "flowdeck.parse")
    #[serde(rename = "type", default)]
    pub node_type: String,
    /// Executor type version
    #[serde(default = "default_type_version")]
    pub type_version: u32,
    /// 2-D canvas position, layout metadata only; must be [x, y]
    #[serde(default)]
    pub position: Vec<f64>,
    /// Executor-specific configuration as a free-form JSON mapping
    #[serde(default)]
    pub parameters: Value,
    /// Disabled nodes stay in the document but are skipped by the engine
    #[serde(default)]
    pub disabled: bool,
}

fn default_type_version() -> u32 {
    1
}

/// Connection graph: source node name → named output channels.
pub type ConnectionMap = HashMap<String, ChannelMap>;

/// Output channels of one node: channel name → ordered parallel branches,
/// each branch an ordered list of targets. The primary channel is
/// conventionally "main"; other channels carry alternate outcomes such as
/// "error". All channels share one shape and one validation path.
pub type ChannelMap = HashMap<String, Vec<Vec<ConnectionTarget>>>;

/// A single connection endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTarget {
    /// Target node name (must exist in the same definition)
    pub node: String,
    /// Channel type on the receiving side
    #[serde(rename = "type", default)]
    pub channel_type: String,
    /// Input index on the target node
    #[serde(default)]
    pub index: u32,
}

/// Optional execution settings carried on a definition
///
/// Opaque to this crate apart from the `execution_order` enumeration; the
/// external engine interprets the rest.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Execution-order mode; when present must be one of
    /// [`Settings::EXECUTION_ORDERS`]. Kept as a raw string so an unknown
    /// value is a collected validation error, not a parse failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<String>,
    /// IANA timezone name for schedule resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Whether the engine persists intermediate execution progress
    #[serde(default)]
    pub save_execution_progress: bool,
    /// Whether manual runs are persisted
    #[serde(default)]
    pub save_manual_executions: bool,
    /// Definition id to route execution errors to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_workflow: Option<String>,
}

impl Settings {
    /// The known execution-order modes.
    pub const EXECUTION_ORDERS: [&'static str; 2] = ["v0", "v1"];
}
