//! Bayesian network used by both the header generator and the attribute sampler.
//!
//! Loads pre-trained probability distributions from JSON (optionally zipped) and
//! samples complete variable assignments.

use super::bayesian_node::{BayesianNode, NodeDefinition};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Network definition structure.
#[derive(Debug, Deserialize)]
pub struct NetworkDefinition {
  pub nodes: Vec<NodeDefinition>,
}

/// A Bayesian network with nodes stored in sampling order (parents before children).
#[derive(Debug, Clone)]
pub struct BayesianNetwork {
  nodes_in_sampling_order: Vec<BayesianNode>,
  nodes_by_name: HashMap<String, usize>,
}

impl BayesianNetwork {
  /// Build a network from a parsed definition.
  pub fn from_definition(definition: NetworkDefinition) -> Result<Self, BayesianNetworkError> {
    let mut nodes_in_sampling_order = Vec::with_capacity(definition.nodes.len());
    let mut nodes_by_name = HashMap::with_capacity(definition.nodes.len());

    for (i, node_def) in definition.nodes.into_iter().enumerate() {
      for parent in &node_def.parent_names {
        if !nodes_by_name.contains_key(parent) {
          return Err(BayesianNetworkError::ParentOutOfOrder {
            node: node_def.name.clone(),
            parent: parent.clone(),
          });
        }
      }
      if nodes_by_name.insert(node_def.name.clone(), i).is_some() {
        return Err(BayesianNetworkError::DuplicateNode(node_def.name));
      }
      nodes_in_sampling_order.push(BayesianNode::new(node_def));
    }

    Ok(Self {
      nodes_in_sampling_order,
      nodes_by_name,
    })
  }

  /// Load a network from JSON text.
  pub fn from_json_str(json: &str) -> Result<Self, BayesianNetworkError> {
    let definition: NetworkDefinition = serde_json::from_str(json)?;
    Self::from_definition(definition)
  }

  /// Load a network from ZIP file bytes holding a single JSON definition.
  pub fn from_zip_bytes(zip_bytes: &[u8]) -> Result<Self, BayesianNetworkError> {
    let cursor = Cursor::new(zip_bytes);
    let mut archive = ZipArchive::new(cursor)?;

    let mut json_content = String::new();
    for i in 0..archive.len() {
      let mut file = archive.by_index(i)?;
      if file.name().ends_with(".json") {
        file.read_to_string(&mut json_content)?;
        break;
      }
    }

    if json_content.is_empty() {
      return Err(BayesianNetworkError::NoJsonInZip);
    }

    Self::from_json_str(&json_content)
  }

  /// Get a node by name.
  pub fn get_node(&self, name: &str) -> Option<&BayesianNode> {
    self
      .nodes_by_name
      .get(name)
      .map(|&i| &self.nodes_in_sampling_order[i])
  }

  /// Names of every modeled variable, in sampling order.
  pub fn node_names(&self) -> impl Iterator<Item = &str> {
    self.nodes_in_sampling_order.iter().map(|node| node.name())
  }

  /// Get possible values for a node.
  pub fn get_possible_values(&self, name: &str) -> Option<Vec<String>> {
    self
      .get_node(name)
      .map(|node| node.possible_values().to_vec())
  }

  /// Generate a random sample from the network.
  ///
  /// `input_values` contains already known node values that are kept as they are.
  pub fn generate_sample(&self, input_values: &HashMap<String, String>) -> HashMap<String, String> {
    let mut sample = input_values.clone();

    for node in &self.nodes_in_sampling_order {
      if !sample.contains_key(node.name()) {
        let value = node.sample(&sample);
        sample.insert(node.name().to_string(), value);
      }
    }

    sample
  }

  /// Like [`generate_sample`](Self::generate_sample), but rejects observed variables the
  /// network does not model.
  pub fn generate_observed_sample(
    &self,
    observed: &HashMap<String, String>,
  ) -> Result<HashMap<String, String>, BayesianNetworkError> {
    if let Some(unknown) = observed.keys().find(|name| !self.nodes_by_name.contains_key(*name)) {
      return Err(BayesianNetworkError::UnknownNode(unknown.clone()));
    }

    Ok(self.generate_sample(observed))
  }

  /// Generate a random sample consistent with the given value restrictions.
  ///
  /// Backtracks over banned values until every node has a value allowed by
  /// `value_possibilities`. Returns `None` if no consistent sample exists.
  pub fn generate_consistent_sample_when_possible(
    &self,
    value_possibilities: &HashMap<String, Vec<String>>,
  ) -> Option<HashMap<String, String>> {
    self.recursively_generate_consistent_sample(HashMap::new(), value_possibilities, 0)
  }

  fn recursively_generate_consistent_sample(
    &self,
    sample_so_far: HashMap<String, String>,
    value_possibilities: &HashMap<String, Vec<String>>,
    depth: usize,
  ) -> Option<HashMap<String, String>> {
    if depth >= self.nodes_in_sampling_order.len() {
      return Some(sample_so_far);
    }

    let node = &self.nodes_in_sampling_order[depth];
    let mut banned_values: Vec<String> = Vec::new();
    let mut sample_so_far = sample_so_far;

    loop {
      let sample_value = node.sample_according_to_restrictions(
        &sample_so_far,
        value_possibilities.get(node.name()).map(|v| v.as_slice()),
        &banned_values,
      );

      let Some(value) = sample_value else {
        break;
      };

      sample_so_far.insert(node.name().to_string(), value.clone());

      if let Some(complete_sample) = self.recursively_generate_consistent_sample(
        sample_so_far.clone(),
        value_possibilities,
        depth + 1,
      ) {
        return Some(complete_sample);
      }

      banned_values.push(value);
    }

    None
  }
}

/// Errors that can occur when working with Bayesian networks.
#[derive(Debug, thiserror::Error)]
pub enum BayesianNetworkError {
  #[error("ZIP file error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON parsing error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("No JSON file found in ZIP archive")]
  NoJsonInZip,

  #[error("Duplicate node in network definition: {0}")]
  DuplicateNode(String),

  #[error("Node {node} is listed before its parent {parent}")]
  ParentOutOfOrder { node: String, parent: String },

  #[error("Observed variable is not modeled by the network: {0}")]
  UnknownNode(String),
}
