//! Fingerprint generation.
//!
//! A [`FingerprintGenerator`] first generates an HTTP header set, then samples the
//! remaining browser attributes with the generated User-Agent as the only observed
//! variable, so both halves of the result describe the same browser.

pub mod normalize;
pub mod types;

pub use normalize::{normalize_sample, RawValue};
pub use types::{
  Brand, Fingerprint, FingerprintWithHeaders, RawSample, ScreenFingerprint, UserAgentData,
  VideoCard, LANGUAGES_ATTRIBUTE,
};

use serde_json::Value;
use std::collections::HashMap;

use crate::headers::{
  HeaderGenerator, HeaderGeneratorError, HeaderLookup, HeaderMap, HeaderSource, ACCEPT_LANGUAGE,
  USER_AGENT,
};
use crate::network::{BayesianNetwork, BayesianNetworkError, DefinitionsError, NetworkDefinitions};
use crate::options::{GenerationOptions, ValidationError};

/// Name of the observed variable in the fingerprint network.
pub const USER_AGENT_NODE_NAME: &str = "userAgent";

/// Samples raw browser attributes given observed variable values.
pub trait AttributeSampler {
  fn sample_attributes(
    &self,
    observed: &HashMap<String, String>,
  ) -> Result<RawSample, BayesianNetworkError>;
}

impl AttributeSampler for BayesianNetwork {
  fn sample_attributes(
    &self,
    observed: &HashMap<String, String>,
  ) -> Result<RawSample, BayesianNetworkError> {
    self.generate_observed_sample(observed)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
  #[error("Invalid options: {0}")]
  Validation(#[from] ValidationError),

  #[error("Generated headers have no {0} header")]
  MissingHeader(&'static str),

  #[error("Sampled attribute {attribute} is malformed: {reason}")]
  MalformedSample { attribute: String, reason: String },

  #[error("Header generation failed: {0}")]
  Headers(#[from] HeaderGeneratorError),

  #[error("Attribute sampling failed: {0}")]
  Sampler(#[from] BayesianNetworkError),

  #[error("Failed to load network definitions: {0}")]
  Definitions(#[from] DefinitionsError),
}

/// Generates fingerprints together with matching headers.
#[derive(Debug, Clone)]
pub struct FingerprintGenerator<H = HeaderGenerator, S = BayesianNetwork> {
  default_options: GenerationOptions,
  header_source: H,
  sampler: S,
}

impl FingerprintGenerator {
  /// Create a generator from the bundled networks.
  pub fn new(default_options: GenerationOptions) -> Result<Self, FingerprintError> {
    Self::from_definitions(default_options, &NetworkDefinitions::bundled()?)
  }

  pub fn from_definitions(
    default_options: GenerationOptions,
    definitions: &NetworkDefinitions,
  ) -> Result<Self, FingerprintError> {
    Self::with_components(
      default_options,
      HeaderGenerator::from_definitions(definitions),
      definitions.fingerprint_network.clone(),
    )
  }
}

impl<H: HeaderSource, S: AttributeSampler> FingerprintGenerator<H, S> {
  pub fn with_components(
    default_options: GenerationOptions,
    header_source: H,
    sampler: S,
  ) -> Result<Self, FingerprintError> {
    default_options.validate()?;
    Ok(Self {
      default_options,
      header_source,
      sampler,
    })
  }

  pub fn default_options(&self) -> &GenerationOptions {
    &self.default_options
  }

  /// Generate a fingerprint and its headers.
  ///
  /// `override_options` replace the defaults per top-level option. `request_dependent_headers`
  /// are passed through to the header source.
  pub fn get_fingerprint(
    &self,
    override_options: &GenerationOptions,
    request_dependent_headers: &HeaderMap,
  ) -> Result<FingerprintWithHeaders, FingerprintError> {
    override_options.validate()?;
    let options = self.default_options.merged_with(override_options);

    let headers = self
      .header_source
      .generate_headers(&options, request_dependent_headers)?;

    let user_agent = headers
      .get_ignore_case(USER_AGENT)
      .ok_or(FingerprintError::MissingHeader(USER_AGENT))?;

    let mut observed = HashMap::new();
    observed.insert(USER_AGENT_NODE_NAME.to_string(), user_agent.to_string());
    let raw_sample = self.sampler.sample_attributes(&observed)?;

    let mut fingerprint = normalize_sample(&raw_sample)?;
    let languages = headers
      .get_ignore_case(ACCEPT_LANGUAGE)
      .map(parse_accept_language)
      .unwrap_or_default();
    fingerprint.set_languages(languages);

    Ok(FingerprintWithHeaders {
      fingerprint,
      headers,
    })
  }

  /// Like [`get_fingerprint`](Self::get_fingerprint), with the overrides given as an
  /// untyped options object.
  pub fn get_fingerprint_from_value(
    &self,
    override_options: &Value,
    request_dependent_headers: &HeaderMap,
  ) -> Result<FingerprintWithHeaders, FingerprintError> {
    let override_options = GenerationOptions::from_value(override_options)?;
    self.get_fingerprint(&override_options, request_dependent_headers)
  }

  pub fn get_default_fingerprint(&self) -> Result<FingerprintWithHeaders, FingerprintError> {
    self.get_fingerprint(&GenerationOptions::default(), &HeaderMap::new())
  }
}

/// Language tags of an Accept-Language value, in order, without quality weights.
pub fn parse_accept_language(value: &str) -> Vec<String> {
  if value.trim().is_empty() {
    return Vec::new();
  }

  value
    .split(',')
    .map(|segment| {
      segment
        .split_once(';')
        .map_or(segment, |(language, _)| language)
        .trim()
        .to_string()
    })
    .collect()
}
