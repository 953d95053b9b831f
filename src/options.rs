//! Generation options and their validation.
//!
//! Options reach the generator either typed ([`GenerationOptions`]) or as an untyped
//! JSON/YAML document. Untyped input goes through [`GenerationOptions::from_value`],
//! which checks the document shape field by field so errors can name the offending
//! field. Typed input still goes through [`GenerationOptions::validate`] for the
//! constraints the type system cannot express.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Supported browsers.
pub const SUPPORTED_BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge"];

/// Supported operating systems.
pub const SUPPORTED_OPERATING_SYSTEMS: &[&str] = &["windows", "macos", "linux", "android", "ios"];

/// Supported devices.
pub const SUPPORTED_DEVICES: &[&str] = &["desktop", "mobile"];

/// Maximum number of locales accepted in `locales`.
pub const MAX_LOCALES: usize = 10;

const BROWSER_SPEC_FIELDS: &[&str] = &["name", "minVersion", "maxVersion", "httpVersion"];

/// Error returned when options do not match the option schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("Unknown option `{0}`")]
  UnknownField(String),

  #[error("Option `{field}` must be {expected}")]
  InvalidType {
    field: String,
    expected: &'static str,
  },

  #[error("Option `{field}` accepts at most {max} entries, got {actual}")]
  TooManyEntries {
    field: String,
    max: usize,
    actual: usize,
  },

  #[error("Option `{field}` has minVersion {min} greater than maxVersion {max}")]
  InvertedVersionRange { field: String, min: u32, max: u32 },

  #[error("Option `{field}` does not accept {value:?}")]
  UnsupportedValue { field: String, value: String },

  #[error("Options document could not be parsed: {0}")]
  Malformed(String),
}

impl ValidationError {
  /// Name of the offending field, e.g. `browsers[1].minVersion`.
  pub fn field(&self) -> &str {
    match self {
      Self::UnknownField(field)
      | Self::InvalidType { field, .. }
      | Self::TooManyEntries { field, .. }
      | Self::InvertedVersionRange { field, .. }
      | Self::UnsupportedValue { field, .. } => field,
      Self::Malformed(_) => "options",
    }
  }
}

/// HTTP protocol version the generated headers are meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HttpVersion {
  #[serde(rename = "1")]
  Http1,
  #[default]
  #[serde(rename = "2")]
  Http2,
}

impl HttpVersion {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Http1 => "1",
      Self::Http2 => "2",
    }
  }
}

impl fmt::Display for HttpVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for HttpVersion {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "1" => Ok(Self::Http1),
      "2" => Ok(Self::Http2),
      other => Err(ValidationError::UnsupportedValue {
        field: "httpVersion".to_string(),
        value: other.to_string(),
      }),
    }
  }
}

/// A browser restricted to a range of major versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSpec {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub min_version: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_version: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub http_version: Option<HttpVersion>,
}

impl BrowserSpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      min_version: None,
      max_version: None,
      http_version: None,
    }
  }

  pub fn with_min_version(mut self, version: u32) -> Self {
    self.min_version = Some(version);
    self
  }

  pub fn with_max_version(mut self, version: u32) -> Self {
    self.max_version = Some(version);
    self
  }

  pub fn with_http_version(mut self, version: HttpVersion) -> Self {
    self.http_version = Some(version);
    self
  }

  /// Check whether a major version lies within the bounds.
  pub fn accepts_version(&self, major: u32) -> bool {
    self.min_version.is_none_or(|min| major >= min)
      && self.max_version.is_none_or(|max| major <= max)
  }

  fn validate(&self, field: &str) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (self.min_version, self.max_version) {
      if min > max {
        return Err(ValidationError::InvertedVersionRange {
          field: field.to_string(),
          min,
          max,
        });
      }
    }
    Ok(())
  }
}

/// Entry of the `browsers` option: a bare browser name or a full [`BrowserSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BrowserEntry {
  Name(String),
  Spec(BrowserSpec),
}

impl BrowserEntry {
  pub fn name(&self) -> &str {
    match self {
      Self::Name(name) => name,
      Self::Spec(spec) => &spec.name,
    }
  }

  /// View the entry as a spec without version bounds when only a name was given.
  pub fn to_spec(&self) -> BrowserSpec {
    match self {
      Self::Name(name) => BrowserSpec::new(name.clone()),
      Self::Spec(spec) => spec.clone(),
    }
  }
}

impl From<&str> for BrowserEntry {
  fn from(name: &str) -> Self {
    Self::Name(name.to_string())
  }
}

impl From<String> for BrowserEntry {
  fn from(name: String) -> Self {
    Self::Name(name)
  }
}

impl From<BrowserSpec> for BrowserEntry {
  fn from(spec: BrowserSpec) -> Self {
    Self::Spec(spec)
  }
}

/// Options for generating headers and fingerprints.
///
/// Every field is optional; unset fields fall back to the generator defaults.
/// Deserializing goes through [`GenerationOptions::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct GenerationOptions {
  /// Browsers to pick from, as names or version-bounded specs.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub browsers: Option<Vec<BrowserEntry>>,
  /// Operating systems: "windows", "macos", "linux", "android", "ios"
  #[serde(skip_serializing_if = "Option::is_none")]
  pub operating_systems: Option<BTreeSet<String>>,
  /// Device types: "desktop", "mobile"
  #[serde(skip_serializing_if = "Option::is_none")]
  pub devices: Option<BTreeSet<String>>,
  /// Locales for the Accept-Language header, most preferred first
  #[serde(skip_serializing_if = "Option::is_none")]
  pub locales: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub http_version: Option<HttpVersion>,
}

impl GenerationOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_browsers<I, B>(mut self, browsers: I) -> Self
  where
    I: IntoIterator<Item = B>,
    B: Into<BrowserEntry>,
  {
    self.browsers = Some(browsers.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_operating_systems<I, S>(mut self, operating_systems: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.operating_systems = Some(operating_systems.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_devices<I, S>(mut self, devices: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.devices = Some(devices.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_locales<I, S>(mut self, locales: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.locales = Some(locales.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_http_version(mut self, version: HttpVersion) -> Self {
    self.http_version = Some(version);
    self
  }

  /// Return a copy where every top-level field set in `overrides` replaces ours.
  pub fn merged_with(&self, overrides: &GenerationOptions) -> GenerationOptions {
    GenerationOptions {
      browsers: overrides.browsers.clone().or_else(|| self.browsers.clone()),
      operating_systems: overrides
        .operating_systems
        .clone()
        .or_else(|| self.operating_systems.clone()),
      devices: overrides.devices.clone().or_else(|| self.devices.clone()),
      locales: overrides.locales.clone().or_else(|| self.locales.clone()),
      http_version: overrides.http_version.or(self.http_version),
    }
  }

  /// Check the constraints not enforced by the types themselves.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if let Some(browsers) = &self.browsers {
      for (i, entry) in browsers.iter().enumerate() {
        let field = format!("browsers[{i}]");
        if let BrowserEntry::Spec(spec) = entry {
          spec.validate(&field)?;
        }
      }
    }

    if let Some(locales) = &self.locales {
      if locales.len() > MAX_LOCALES {
        return Err(ValidationError::TooManyEntries {
          field: "locales".to_string(),
          max: MAX_LOCALES,
          actual: locales.len(),
        });
      }
    }

    Ok(())
  }

  /// Validate an untyped options document and convert it.
  pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::InvalidType {
      field: "options".to_string(),
      expected: "an object",
    })?;

    let mut options = GenerationOptions::default();

    for (key, value) in object {
      match key.as_str() {
        "browsers" => {
          let entries = expect_array(key, value)?;
          let browsers = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_browser_entry(&format!("browsers[{i}]"), entry))
            .collect::<Result<Vec<_>, _>>()?;
          options.browsers = Some(browsers);
        }
        "operatingSystems" => {
          options.operating_systems = Some(expect_strings(key, value)?.into_iter().collect());
        }
        "devices" => {
          options.devices = Some(expect_strings(key, value)?.into_iter().collect());
        }
        "locales" => {
          options.locales = Some(expect_strings(key, value)?);
        }
        "httpVersion" => {
          options.http_version = Some(parse_http_version(key, value)?);
        }
        _ => return Err(ValidationError::UnknownField(key.clone())),
      }
    }

    options.validate()?;
    Ok(options)
  }

  /// Parse and validate a JSON options document.
  pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
    let value: Value =
      serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Self::from_value(&value)
  }

  /// Parse and validate a YAML options document.
  pub fn from_yaml_str(yaml: &str) -> Result<Self, ValidationError> {
    let value: Value =
      serde_yaml::from_str(yaml).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Self::from_value(&value)
  }

  /// Browser specs to generate for, defaulting to every supported browser.
  pub fn browser_specs(&self) -> Vec<BrowserSpec> {
    match &self.browsers {
      Some(browsers) => browsers.iter().map(BrowserEntry::to_spec).collect(),
      None => SUPPORTED_BROWSERS
        .iter()
        .map(|name| BrowserSpec::new(*name))
        .collect(),
    }
  }
}

impl TryFrom<Value> for GenerationOptions {
  type Error = ValidationError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    Self::from_value(&value)
  }
}

fn expect_array<'a>(field: &str, value: &'a Value) -> Result<&'a Vec<Value>, ValidationError> {
  value.as_array().ok_or(ValidationError::InvalidType {
    field: field.to_string(),
    expected: "an array",
  })
}

fn expect_strings(field: &str, value: &Value) -> Result<Vec<String>, ValidationError> {
  expect_array(field, value)?
    .iter()
    .enumerate()
    .map(|(i, item)| {
      item
        .as_str()
        .map(String::from)
        .ok_or(ValidationError::InvalidType {
          field: format!("{field}[{i}]"),
          expected: "a string",
        })
    })
    .collect()
}

fn parse_http_version(field: &str, value: &Value) -> Result<HttpVersion, ValidationError> {
  let text = value.as_str().ok_or(ValidationError::InvalidType {
    field: field.to_string(),
    expected: "the string \"1\" or \"2\"",
  })?;

  text
    .parse()
    .map_err(|_| ValidationError::UnsupportedValue {
      field: field.to_string(),
      value: text.to_string(),
    })
}

fn parse_version_bound(field: String, value: &Value) -> Result<u32, ValidationError> {
  value
    .as_u64()
    .and_then(|v| u32::try_from(v).ok())
    .ok_or(ValidationError::InvalidType {
      field,
      expected: "a non-negative integer",
    })
}

fn parse_browser_entry(field: &str, value: &Value) -> Result<BrowserEntry, ValidationError> {
  match value {
    Value::String(name) => Ok(BrowserEntry::Name(name.clone())),
    Value::Object(object) => parse_browser_spec(field, object).map(BrowserEntry::Spec),
    _ => Err(ValidationError::InvalidType {
      field: field.to_string(),
      expected: "a browser name or a browser spec object",
    }),
  }
}

fn parse_browser_spec(
  field: &str,
  object: &Map<String, Value>,
) -> Result<BrowserSpec, ValidationError> {
  if let Some(unknown) = object
    .keys()
    .find(|key| !BROWSER_SPEC_FIELDS.contains(&key.as_str()))
  {
    return Err(ValidationError::UnknownField(format!("{field}.{unknown}")));
  }

  let name = object
    .get("name")
    .and_then(Value::as_str)
    .ok_or(ValidationError::InvalidType {
      field: format!("{field}.name"),
      expected: "a string",
    })?;

  let mut spec = BrowserSpec::new(name);
  if let Some(min) = object.get("minVersion") {
    spec.min_version = Some(parse_version_bound(format!("{field}.minVersion"), min)?);
  }
  if let Some(max) = object.get("maxVersion") {
    spec.max_version = Some(parse_version_bound(format!("{field}.maxVersion"), max)?);
  }
  if let Some(version) = object.get("httpVersion") {
    spec.http_version = Some(parse_http_version(&format!("{field}.httpVersion"), version)?);
  }

  Ok(spec)
}
