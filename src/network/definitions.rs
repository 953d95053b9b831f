//! Loading of the network artifacts a generator is built from.
//!
//! Artifacts are either the bundled set from [`crate::data`] or files in a directory.
//! Network files may be plain JSON (`<stem>.json`) or a ZIP archive (`<stem>.zip`).

use super::bayesian_network::{BayesianNetwork, BayesianNetworkError};
use crate::data;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Every artifact needed to build a header generator and an attribute sampler.
#[derive(Debug, Clone)]
pub struct NetworkDefinitions {
  pub fingerprint_network: BayesianNetwork,
  pub input_network: BayesianNetwork,
  pub header_network: BayesianNetwork,
  /// Entries of the form `name/version|httpVersion`.
  pub browser_helper: Vec<String>,
  /// Header names in send order, keyed by browser name.
  pub headers_order: HashMap<String, Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DefinitionsError {
  #[error("Failed to load network {artifact}: {source}")]
  Network {
    artifact: &'static str,
    #[source]
    source: BayesianNetworkError,
  },

  #[error("Failed to parse {artifact}: {source}")]
  Json {
    artifact: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to read {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Artifact {artifact} not found in {}", .dir.display())]
  MissingArtifact { artifact: &'static str, dir: PathBuf },
}

impl NetworkDefinitions {
  /// Parse the artifacts compiled into the crate.
  pub fn bundled() -> Result<Self, DefinitionsError> {
    let network = |artifact: &'static str, json: &str| {
      BayesianNetwork::from_json_str(json)
        .map_err(|source| DefinitionsError::Network { artifact, source })
    };

    Ok(Self {
      fingerprint_network: network(
        data::FINGERPRINT_NETWORK_STEM,
        data::FINGERPRINT_NETWORK_JSON,
      )?,
      input_network: network(data::INPUT_NETWORK_STEM, data::INPUT_NETWORK_JSON)?,
      header_network: network(data::HEADER_NETWORK_STEM, data::HEADER_NETWORK_JSON)?,
      browser_helper: parse_json(data::BROWSER_HELPER_STEM, data::BROWSER_HELPER_JSON)?,
      headers_order: parse_json(data::HEADERS_ORDER_STEM, data::HEADERS_ORDER_JSON)?,
    })
  }

  /// Load the artifacts from `dir`.
  pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, DefinitionsError> {
    let dir = dir.as_ref();
    log::debug!("Loading network definitions from {}", dir.display());

    let browser_helper_json =
      read_to_string(&dir.join(format!("{}.json", data::BROWSER_HELPER_STEM)))?;
    let headers_order_json =
      read_to_string(&dir.join(format!("{}.json", data::HEADERS_ORDER_STEM)))?;

    Ok(Self {
      fingerprint_network: load_network(dir, data::FINGERPRINT_NETWORK_STEM)?,
      input_network: load_network(dir, data::INPUT_NETWORK_STEM)?,
      header_network: load_network(dir, data::HEADER_NETWORK_STEM)?,
      browser_helper: parse_json(data::BROWSER_HELPER_STEM, &browser_helper_json)?,
      headers_order: parse_json(data::HEADERS_ORDER_STEM, &headers_order_json)?,
    })
  }
}

fn load_network(dir: &Path, artifact: &'static str) -> Result<BayesianNetwork, DefinitionsError> {
  let zip_path = dir.join(format!("{artifact}.zip"));
  let json_path = dir.join(format!("{artifact}.json"));

  let network = if zip_path.is_file() {
    let bytes = std::fs::read(&zip_path).map_err(|source| DefinitionsError::Io {
      path: zip_path.clone(),
      source,
    })?;
    BayesianNetwork::from_zip_bytes(&bytes)
  } else if json_path.is_file() {
    BayesianNetwork::from_json_str(&read_to_string(&json_path)?)
  } else {
    return Err(DefinitionsError::MissingArtifact {
      artifact,
      dir: dir.to_path_buf(),
    });
  };

  let network = network.map_err(|source| DefinitionsError::Network { artifact, source })?;
  log::debug!(
    "Loaded {artifact} with {} nodes",
    network.node_names().count()
  );
  Ok(network)
}

fn read_to_string(path: &Path) -> Result<String, DefinitionsError> {
  std::fs::read_to_string(path).map_err(|source| DefinitionsError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn parse_json<T: serde::de::DeserializeOwned>(
  artifact: &'static str,
  json: &str,
) -> Result<T, DefinitionsError> {
  serde_json::from_str(json).map_err(|source| DefinitionsError::Json { artifact, source })
}
