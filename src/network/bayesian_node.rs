//! Bayesian network node.
//!
//! A node owns a conditional probability table keyed by the values of its parents and
//! draws weighted random values from it.

use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

/// Node definition as stored in a network definition file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
  pub name: String,
  #[serde(default)]
  pub parent_names: Vec<String>,
  pub possible_values: Vec<String>,
  pub conditional_probabilities: ConditionalProbabilities,
}

/// One level of a conditional probability table.
///
/// Intermediate levels hold `deeper` (keyed by the value of the next parent) and an
/// optional `skip` level used when that parent value is unknown. Terminal levels hold
/// the value probabilities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConditionalProbabilities {
  #[serde(default)]
  pub deeper: Option<HashMap<String, ConditionalProbabilities>>,
  #[serde(default)]
  pub skip: Option<Box<ConditionalProbabilities>>,
  #[serde(flatten)]
  pub probabilities: HashMap<String, f64>,
}

impl ConditionalProbabilities {
  pub fn is_terminal(&self) -> bool {
    self.deeper.is_none()
  }
}

/// A single node in the Bayesian network.
#[derive(Debug, Clone)]
pub struct BayesianNode {
  definition: NodeDefinition,
}

impl BayesianNode {
  pub fn new(definition: NodeDefinition) -> Self {
    Self { definition }
  }

  pub fn name(&self) -> &str {
    &self.definition.name
  }

  pub fn parent_names(&self) -> &[String] {
    &self.definition.parent_names
  }

  pub fn possible_values(&self) -> &[String] {
    &self.definition.possible_values
  }

  /// Walk the probability table along the known parent values.
  ///
  /// Unknown parent values follow the `skip` branch when one exists. If the walk ends
  /// on a level without probabilities the result is empty.
  fn probabilities_given_known_values(
    &self,
    parent_values: &HashMap<String, String>,
  ) -> &HashMap<String, f64> {
    let mut probabilities = &self.definition.conditional_probabilities;

    for parent_name in &self.definition.parent_names {
      let Some(deeper) = &probabilities.deeper else {
        break;
      };

      let next = parent_values
        .get(parent_name)
        .and_then(|value| deeper.get(value))
        .or(probabilities.skip.as_deref());

      match next {
        Some(level) => probabilities = level,
        None => break,
      }
    }

    &probabilities.probabilities
  }

  /// Draw one of `candidates` with weights from `probabilities`.
  ///
  /// `candidates` keeps the draw order stable for a given table, so the first candidate
  /// wins when floating point rounding leaves the anchor uncovered.
  fn sample_weighted(
    candidates: &[&String],
    total_probability: f64,
    probabilities: &HashMap<String, f64>,
  ) -> Option<String> {
    let first = candidates.first()?;

    let mut rng = rand::rng();
    let anchor = rng.random::<f64>() * total_probability;
    let mut cumulative = 0.0;

    for value in candidates {
      if let Some(&prob) = probabilities.get(*value) {
        cumulative += prob;
        if cumulative > anchor {
          return Some((*value).clone());
        }
      }
    }

    Some((*first).clone())
  }

  /// Values with a non-zero probability given the parents, in definition order.
  fn values_in_distribution<'a>(&'a self, probabilities: &HashMap<String, f64>) -> Vec<&'a String> {
    self
      .definition
      .possible_values
      .iter()
      .filter(|value| probabilities.get(*value).is_some_and(|&p| p > 0.0))
      .collect()
  }

  /// Sample a value from the conditional distribution given parent values.
  ///
  /// Falls back to the first possible value when the table has no entry for the
  /// parent combination.
  pub fn sample(&self, parent_values: &HashMap<String, String>) -> String {
    let probabilities = self.probabilities_given_known_values(parent_values);
    let candidates = self.values_in_distribution(probabilities);
    let total: f64 = candidates.iter().filter_map(|v| probabilities.get(*v)).sum();

    Self::sample_weighted(&candidates, total, probabilities)
      .or_else(|| self.definition.possible_values.first().cloned())
      .unwrap_or_default()
  }

  /// Sample according to restrictions on possible values.
  ///
  /// `value_possibilities` limits the draw to the listed values (all values when
  /// `None`); `banned_values` are excluded. Returns `None` if nothing remains.
  pub fn sample_according_to_restrictions(
    &self,
    parent_values: &HashMap<String, String>,
    value_possibilities: Option<&[String]>,
    banned_values: &[String],
  ) -> Option<String> {
    let probabilities = self.probabilities_given_known_values(parent_values);

    let valid_values: Vec<&String> = self
      .values_in_distribution(probabilities)
      .into_iter()
      .filter(|value| value_possibilities.is_none_or(|allowed| allowed.contains(*value)))
      .filter(|value| !banned_values.contains(*value))
      .collect();

    let total: f64 = valid_values.iter().filter_map(|v| probabilities.get(*v)).sum();

    Self::sample_weighted(&valid_values, total, probabilities)
  }
}
