//! HTTP header generation.
//!
//! Headers are sampled from two Bayesian networks: the input network picks a
//! browser/OS/device combination allowed by the options, and the header network picks
//! header values consistent with it. HTTP/2 header sets use lower-case names and
//! HTTP/1 sets canonical names, so readers go through [`HeaderLookup`].

use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::network::{
  BayesianNetwork, BayesianNetworkError, DefinitionsError, NetworkDefinitions,
  BROWSER_HTTP_NODE_NAME, DEVICE_NODE_NAME, MISSING_VALUE_DATASET_TOKEN,
  OPERATING_SYSTEM_NODE_NAME,
};
use crate::options::{GenerationOptions, HttpVersion};

/// Header name to value, in send order.
pub type HeaderMap = IndexMap<String, String>;

pub const USER_AGENT: &str = "User-Agent";
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";

/// Locale used when the options do not name any.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Case-insensitive header access.
pub trait HeaderLookup {
  /// Value of `name`, preferring an exact match over a case-insensitive one.
  fn get_ignore_case(&self, name: &str) -> Option<&str>;

  fn contains_ignore_case(&self, name: &str) -> bool {
    self.get_ignore_case(name).is_some()
  }
}

impl<S: BuildHasher> HeaderLookup for IndexMap<String, String, S> {
  fn get_ignore_case(&self, name: &str) -> Option<&str> {
    self
      .get(name)
      .or_else(|| {
        self
          .iter()
          .find(|(key, _)| key.eq_ignore_ascii_case(name))
          .map(|(_, value)| value)
      })
      .map(String::as_str)
  }
}

impl<S: BuildHasher> HeaderLookup for HashMap<String, String, S> {
  fn get_ignore_case(&self, name: &str) -> Option<&str> {
    self
      .get(name)
      .or_else(|| {
        self
          .iter()
          .find(|(key, _)| key.eq_ignore_ascii_case(name))
          .map(|(_, value)| value)
      })
      .map(String::as_str)
  }
}

/// Anything that can produce a header set for the given options.
pub trait HeaderSource {
  /// Generate headers. `request_dependent_headers` are headers the request is known to
  /// carry; they end up in the result unchanged.
  fn generate_headers(
    &self,
    options: &GenerationOptions,
    request_dependent_headers: &HeaderMap,
  ) -> Result<HeaderMap, HeaderGeneratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderGeneratorError {
  #[error("No known browser matches the requested browsers: {0}")]
  NoMatchingBrowser(String),

  #[error("No browser, operating system and device combination satisfies the options")]
  NoConsistentSample,

  #[error("Bayesian network error: {0}")]
  Network(#[from] BayesianNetworkError),
}

/// Parsed browser/HTTP version entry of the browser helper file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserHttpInfo {
  pub name: String,
  pub version: Vec<u32>,
  pub http_version: String,
  pub complete_string: String,
}

impl BrowserHttpInfo {
  /// Parse `name/version|httpVersion`, e.g. `chrome/124.0.0.0|2`.
  pub fn parse(s: &str) -> Option<Self> {
    if s == MISSING_VALUE_DATASET_TOKEN {
      return None;
    }

    let (browser_string, http_version) = s.split_once('|')?;
    let (name, version) = browser_string.split_once('/')?;
    if name.is_empty() || http_version.contains('|') || version.contains('/') {
      return None;
    }

    let version: Vec<u32> = version
      .split('.')
      .filter_map(|v| v.parse().ok())
      .collect();

    Some(Self {
      name: name.to_string(),
      version,
      http_version: http_version.to_string(),
      complete_string: s.to_string(),
    })
  }

  pub fn major_version(&self) -> u32 {
    self.version.first().copied().unwrap_or(0)
  }
}

/// Build an Accept-Language value: the first locale bare, the rest with decreasing
/// quality (`en-US,en;q=0.9,fr;q=0.8`).
pub fn accept_language_header(locales: &[String]) -> String {
  locales
    .iter()
    .enumerate()
    .map(|(i, locale)| {
      if i == 0 {
        locale.clone()
      } else {
        format!("{locale};q={:.1}", 1.0 - 0.1 * i as f64)
      }
    })
    .collect::<Vec<_>>()
    .join(",")
}

/// Header generator backed by the input and header networks.
#[derive(Debug, Clone)]
pub struct HeaderGenerator {
  input_network: BayesianNetwork,
  header_network: BayesianNetwork,
  browser_helper: Vec<BrowserHttpInfo>,
  headers_order: HashMap<String, Vec<String>>,
}

impl HeaderGenerator {
  /// Create a header generator from the bundled networks.
  pub fn new() -> Result<Self, DefinitionsError> {
    Ok(Self::from_definitions(&NetworkDefinitions::bundled()?))
  }

  pub fn from_definitions(definitions: &NetworkDefinitions) -> Self {
    let browser_helper = definitions
      .browser_helper
      .iter()
      .filter_map(|s| BrowserHttpInfo::parse(s))
      .collect();

    Self {
      input_network: definitions.input_network.clone(),
      header_network: definitions.header_network.clone(),
      browser_helper,
      headers_order: definitions.headers_order.clone(),
    }
  }

  /// Helper entries allowed by the browser options.
  fn matching_browsers(&self, options: &GenerationOptions) -> Vec<&BrowserHttpInfo> {
    let default_http_version = options.http_version.unwrap_or_default();
    let specs = options.browser_specs();

    self
      .browser_helper
      .iter()
      .filter(|info| {
        specs.iter().any(|spec| {
          spec.name == info.name
            && spec.accepts_version(info.major_version())
            && spec.http_version.unwrap_or(default_http_version).as_str() == info.http_version
        })
      })
      .collect()
  }

  /// Build the value restrictions for the input network.
  fn build_constraints(
    &self,
    options: &GenerationOptions,
  ) -> Result<HashMap<String, Vec<String>>, HeaderGeneratorError> {
    let browsers = self.matching_browsers(options);
    if browsers.is_empty() {
      let names: Vec<String> = options
        .browser_specs()
        .into_iter()
        .map(|spec| spec.name)
        .collect();
      return Err(HeaderGeneratorError::NoMatchingBrowser(names.join(", ")));
    }
    log::debug!("{} browser versions match the options", browsers.len());

    let mut constraints = HashMap::new();
    constraints.insert(
      BROWSER_HTTP_NODE_NAME.to_string(),
      browsers
        .iter()
        .map(|info| info.complete_string.clone())
        .collect(),
    );

    if let Some(operating_systems) = &options.operating_systems {
      constraints.insert(
        OPERATING_SYSTEM_NODE_NAME.to_string(),
        operating_systems.iter().cloned().collect(),
      );
    }

    if let Some(devices) = &options.devices {
      constraints.insert(DEVICE_NODE_NAME.to_string(), devices.iter().cloned().collect());
    }

    Ok(constraints)
  }

  /// Order headers according to browser-specific ordering.
  ///
  /// Names the ordering does not know keep their relative order at the end.
  fn order_headers(&self, headers: HeaderMap, browser: &str) -> HeaderMap {
    let Some(order) = self.headers_order.get(browser) else {
      return headers;
    };

    let mut remaining = headers;
    let mut ordered = HeaderMap::with_capacity(remaining.len());

    for header_name in order {
      if let Some(value) = remaining.shift_remove(header_name) {
        ordered.insert(header_name.clone(), value);
      }
    }
    ordered.extend(remaining);

    ordered
  }
}

impl HeaderSource for HeaderGenerator {
  fn generate_headers(
    &self,
    options: &GenerationOptions,
    request_dependent_headers: &HeaderMap,
  ) -> Result<HeaderMap, HeaderGeneratorError> {
    let constraints = self.build_constraints(options)?;

    let input_sample = self
      .input_network
      .generate_consistent_sample_when_possible(&constraints)
      .ok_or(HeaderGeneratorError::NoConsistentSample)?;
    log::trace!("Sampled header input: {input_sample:?}");

    let browser = input_sample
      .get(BROWSER_HTTP_NODE_NAME)
      .and_then(|value| BrowserHttpInfo::parse(value))
      .ok_or(HeaderGeneratorError::NoConsistentSample)?;

    let header_sample = self.header_network.generate_observed_sample(&input_sample)?;

    let mut sampled: Vec<(String, String)> = header_sample
      .into_iter()
      .filter(|(name, value)| !name.starts_with('*') && value != MISSING_VALUE_DATASET_TOKEN)
      .collect();
    sampled.sort();

    let mut headers: HeaderMap = sampled.into_iter().collect();

    let locales = options
      .locales
      .clone()
      .unwrap_or_else(|| vec![DEFAULT_LOCALE.to_string()]);
    let accept_language_name = if browser.http_version == HttpVersion::Http1.as_str() {
      ACCEPT_LANGUAGE.to_string()
    } else {
      ACCEPT_LANGUAGE.to_ascii_lowercase()
    };
    headers.insert(accept_language_name, accept_language_header(&locales));

    for (name, value) in request_dependent_headers {
      headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
      headers.insert(name.clone(), value.clone());
    }

    Ok(self.order_headers(headers, &browser.name))
  }
}
