//! Fingerprint type definitions.
//!
//! A [`Fingerprint`] is a flat attribute map. The typed views below read groups of
//! attributes back out of it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::headers::HeaderMap;

/// Raw sampler output: attribute name to encoded value.
pub type RawSample = HashMap<String, String>;

/// Attribute holding the languages derived from the Accept-Language header.
pub const LANGUAGES_ATTRIBUTE: &str = "languages";

/// A normalized browser fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint {
  attributes: BTreeMap<String, Value>,
}

impl Fingerprint {
  pub fn from_attributes(attributes: BTreeMap<String, Value>) -> Self {
    Self { attributes }
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.attributes.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.attributes.contains_key(name)
  }

  pub fn attributes(&self) -> &BTreeMap<String, Value> {
    &self.attributes
  }

  pub fn len(&self) -> usize {
    self.attributes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.attributes.is_empty()
  }

  /// Languages in preference order.
  pub fn languages(&self) -> Vec<String> {
    self
      .get(LANGUAGES_ATTRIBUTE)
      .and_then(Value::as_array)
      .map(|languages| {
        languages
          .iter()
          .filter_map(|language| language.as_str().map(String::from))
          .collect()
      })
      .unwrap_or_default()
  }

  pub(crate) fn set_languages(&mut self, languages: Vec<String>) {
    self.attributes.insert(
      LANGUAGES_ATTRIBUTE.to_string(),
      Value::Array(languages.into_iter().map(Value::String).collect()),
    );
  }

  pub fn user_agent(&self) -> Option<&str> {
    self.get("userAgent").and_then(Value::as_str)
  }

  /// Screen geometry, present when screen characteristics were sampled.
  pub fn screen(&self) -> Option<ScreenFingerprint> {
    if !self.contains("width") || !self.contains("height") {
      return None;
    }
    let object: serde_json::Map<String, Value> = self
      .attributes
      .iter()
      .map(|(name, value)| (name.clone(), value.clone()))
      .collect();
    serde_json::from_value(Value::Object(object)).ok()
  }

  pub fn video_card(&self) -> Option<VideoCard> {
    self
      .get("videoCard")
      .and_then(|value| serde_json::from_value(value.clone()).ok())
  }

  pub fn user_agent_data(&self) -> Option<UserAgentData> {
    self
      .get("userAgentData")
      .and_then(|value| serde_json::from_value(value.clone()).ok())
  }
}

/// Screen-related fingerprint properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreenFingerprint {
  pub width: u32,
  pub height: u32,
  #[serde(default)]
  pub avail_width: u32,
  #[serde(default)]
  pub avail_height: u32,
  #[serde(default)]
  pub avail_top: u32,
  #[serde(default)]
  pub avail_left: u32,
  #[serde(default)]
  pub color_depth: u32,
  #[serde(default)]
  pub pixel_depth: u32,
  #[serde(default = "default_device_pixel_ratio")]
  pub device_pixel_ratio: f64,
  #[serde(default)]
  pub inner_width: u32,
  #[serde(default)]
  pub inner_height: u32,
  #[serde(default)]
  pub outer_width: u32,
  #[serde(default)]
  pub outer_height: u32,
  #[serde(default)]
  pub screen_x: i32,
  #[serde(default, rename = "hasHDR")]
  pub has_hdr: bool,
}

fn default_device_pixel_ratio() -> f64 {
  1.0
}

/// Brand information for User-Agent Client Hints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Brand {
  pub brand: String,
  pub version: String,
}

/// User-Agent Client Hints data.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentData {
  #[serde(default)]
  pub brands: Vec<Brand>,
  #[serde(default)]
  pub mobile: bool,
  #[serde(default)]
  pub platform: String,
  #[serde(default)]
  pub architecture: String,
  #[serde(default)]
  pub bitness: String,
  #[serde(default)]
  pub ua_full_version: String,
}

/// WebGL video card information.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VideoCard {
  pub vendor: String,
  pub renderer: String,
}

/// A fingerprint combined with the headers it was conditioned on.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintWithHeaders {
  pub fingerprint: Fingerprint,
  pub headers: HeaderMap,
}
