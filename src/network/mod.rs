//! Bayesian networks trained on real browser data.
//!
//! The same network machinery drives header generation (input and header networks) and
//! fingerprint attribute sampling (fingerprint network).

pub mod bayesian_network;
pub mod bayesian_node;
pub mod definitions;

pub use bayesian_network::{BayesianNetwork, BayesianNetworkError, NetworkDefinition};
pub use bayesian_node::{BayesianNode, ConditionalProbabilities, NodeDefinition};
pub use definitions::{DefinitionsError, NetworkDefinitions};

/// Raw network value meaning "the attribute is absent".
pub const MISSING_VALUE_DATASET_TOKEN: &str = "*MISSING_VALUE*";

/// Prefix of raw network values holding a JSON-encoded structure.
pub const STRINGIFIED_PREFIX: &str = "*STRINGIFIED*";

/// Special node names in the input and header networks.
pub const BROWSER_HTTP_NODE_NAME: &str = "*BROWSER_HTTP";
pub const OPERATING_SYSTEM_NODE_NAME: &str = "*OPERATING_SYSTEM";
pub const DEVICE_NODE_NAME: &str = "*DEVICE";
