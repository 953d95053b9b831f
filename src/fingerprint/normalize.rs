//! Turns a raw sampler output into a flat [`Fingerprint`].

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::types::{Fingerprint, RawSample};
use super::FingerprintError;
use crate::network::{MISSING_VALUE_DATASET_TOKEN, STRINGIFIED_PREFIX};

pub const PLUGIN_CHARACTERISTICS: &str = "pluginCharacteristics";
pub const SCREEN_CHARACTERISTICS: &str = "screenCharacteristics";

/// A raw sampler value after sentinel decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
  Absent,
  Scalar(String),
  Structured(Value),
}

impl RawValue {
  /// Decode one raw value. `attribute` names it in the error.
  pub fn decode(attribute: &str, raw: &str) -> Result<Self, FingerprintError> {
    if raw == MISSING_VALUE_DATASET_TOKEN {
      return Ok(Self::Absent);
    }

    match raw.strip_prefix(STRINGIFIED_PREFIX) {
      Some(encoded) => serde_json::from_str(encoded)
        .map(Self::Structured)
        .map_err(|e| FingerprintError::MalformedSample {
          attribute: attribute.to_string(),
          reason: e.to_string(),
        }),
      None => Ok(Self::Scalar(raw.to_string())),
    }
  }

  pub fn into_value(self) -> Option<Value> {
    match self {
      Self::Absent => None,
      Self::Scalar(s) => Some(Value::String(s)),
      Self::Structured(value) => Some(value),
    }
  }
}

/// Decode every value of `sample` and hoist the characteristics containers.
///
/// Plugin entries are hoisted before screen entries, so screen entries win when both
/// carry the same key. Hoisted entries replace ordinary attributes of the same name.
pub fn normalize_sample(sample: &RawSample) -> Result<Fingerprint, FingerprintError> {
  let mut attributes = BTreeMap::new();
  let mut plugin_characteristics = None;
  let mut screen_characteristics = None;

  for (name, raw) in sample {
    let Some(value) = RawValue::decode(name, raw)?.into_value() else {
      continue;
    };

    match name.as_str() {
      PLUGIN_CHARACTERISTICS => {
        plugin_characteristics = Some((PLUGIN_CHARACTERISTICS, as_object(name, value)?))
      }
      SCREEN_CHARACTERISTICS => {
        screen_characteristics = Some((SCREEN_CHARACTERISTICS, as_object(name, value)?))
      }
      _ => {
        attributes.insert(name.clone(), value);
      }
    }
  }

  let attributes = [plugin_characteristics, screen_characteristics]
    .into_iter()
    .flatten()
    .try_fold(attributes, |attributes, (container, entries)| {
      hoist(attributes, container, entries)
    })?;

  Ok(Fingerprint::from_attributes(attributes))
}

fn as_object(attribute: &str, value: Value) -> Result<Map<String, Value>, FingerprintError> {
  match value {
    Value::Object(entries) => Ok(entries),
    other => Err(FingerprintError::MalformedSample {
      attribute: attribute.to_string(),
      reason: format!("expected an object, got {other}"),
    }),
  }
}

fn hoist(
  attributes: BTreeMap<String, Value>,
  container: &str,
  entries: Map<String, Value>,
) -> Result<BTreeMap<String, Value>, FingerprintError> {
  entries
    .into_iter()
    .try_fold(attributes, |mut attributes, (key, value)| {
      let value = match value {
        Value::String(raw) => RawValue::decode(&format!("{container}.{key}"), &raw)?.into_value(),
        other => Some(other),
      };
      if let Some(value) = value {
        attributes.insert(key, value);
      }
      Ok(attributes)
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample(entries: &[(&str, &str)]) -> RawSample {
    entries
      .iter()
      .map(|(name, value)| (name.to_string(), value.to_string()))
      .collect()
  }

  #[test]
  fn test_decode_variants() {
    assert_eq!(
      RawValue::decode("a", MISSING_VALUE_DATASET_TOKEN).unwrap(),
      RawValue::Absent
    );
    assert_eq!(
      RawValue::decode("a", "Win32").unwrap(),
      RawValue::Scalar("Win32".to_string())
    );
    assert_eq!(
      RawValue::decode("a", "*STRINGIFIED*[1,2]").unwrap(),
      RawValue::Structured(json!([1, 2]))
    );
  }

  #[test]
  fn test_decode_restores_encoded_structures() {
    let values = [
      json!({"vendor": "Intel", "renderer": "UHD", "nested": {"depth": [1, 2]}}),
      json!(["Arial", "Verdana"]),
      json!(8),
      json!(1.5),
      json!(true),
    ];

    for value in values {
      let encoded = format!("{STRINGIFIED_PREFIX}{}", serde_json::to_string(&value).unwrap());
      assert_eq!(
        RawValue::decode("attribute", &encoded).unwrap(),
        RawValue::Structured(value)
      );
    }
  }

  #[test]
  fn test_decode_failure_names_attribute() {
    let result = RawValue::decode("videoCard", "*STRINGIFIED*{broken");
    assert!(matches!(
      result,
      Err(FingerprintError::MalformedSample { attribute, .. }) if attribute == "videoCard"
    ));
  }

  #[test]
  fn test_missing_values_are_dropped() {
    let fp = normalize_sample(&sample(&[
      ("doNotTrack", MISSING_VALUE_DATASET_TOKEN),
      ("platform", "MacIntel"),
    ]))
    .unwrap();

    assert!(!fp.contains("doNotTrack"));
    assert_eq!(fp.get("platform"), Some(&json!("MacIntel")));
  }

  #[test]
  fn test_stringified_values_are_decoded() {
    let fp = normalize_sample(&sample(&[
      ("hardwareConcurrency", "*STRINGIFIED*8"),
      ("webdriver", "*STRINGIFIED*false"),
      ("videoCard", r#"*STRINGIFIED*{"vendor":"Intel","renderer":"UHD"}"#),
    ]))
    .unwrap();

    assert_eq!(fp.get("hardwareConcurrency"), Some(&json!(8)));
    assert_eq!(fp.get("webdriver"), Some(&json!(false)));
    assert_eq!(fp.video_card().unwrap().vendor, "Intel");
  }

  #[test]
  fn test_plugin_characteristics_are_hoisted() {
    let fp = normalize_sample(&sample(&[(
      PLUGIN_CHARACTERISTICS,
      r#"*STRINGIFIED*{"plugins":"*STRINGIFIED*[1,2,3]"}"#,
    )]))
    .unwrap();

    assert_eq!(fp.get("plugins"), Some(&json!([1, 2, 3])));
    assert!(!fp.contains(PLUGIN_CHARACTERISTICS));
  }

  #[test]
  fn test_screen_characteristics_are_hoisted() {
    let fp = normalize_sample(&sample(&[(
      SCREEN_CHARACTERISTICS,
      r#"*STRINGIFIED*{"width":1440,"height":900,"colorDepth":30}"#,
    )]))
    .unwrap();

    assert!(!fp.contains(SCREEN_CHARACTERISTICS));
    let screen = fp.screen().unwrap();
    assert_eq!((screen.width, screen.height), (1440, 900));
    assert_eq!(screen.color_depth, 30);
  }

  #[test]
  fn test_screen_wins_over_plugins_and_ordinary_attributes() {
    let fp = normalize_sample(&sample(&[
      ("width", "ordinary"),
      ("shared", "ordinary"),
      (PLUGIN_CHARACTERISTICS, r#"*STRINGIFIED*{"shared":"plugin","width":1}"#),
      (SCREEN_CHARACTERISTICS, r#"*STRINGIFIED*{"shared":"screen"}"#),
    ]))
    .unwrap();

    assert_eq!(fp.get("shared"), Some(&json!("screen")));
    assert_eq!(fp.get("width"), Some(&json!(1)));
  }

  #[test]
  fn test_nested_missing_entries_are_skipped() {
    let fp = normalize_sample(&sample(&[(
      PLUGIN_CHARACTERISTICS,
      r#"*STRINGIFIED*{"plugins":"*MISSING_VALUE*","mimeTypes":[]}"#,
    )]))
    .unwrap();

    assert!(!fp.contains("plugins"));
    assert_eq!(fp.get("mimeTypes"), Some(&json!([])));
  }

  #[test]
  fn test_missing_container_is_dropped() {
    let fp = normalize_sample(&sample(&[
      (SCREEN_CHARACTERISTICS, MISSING_VALUE_DATASET_TOKEN),
      ("vendor", ""),
    ]))
    .unwrap();

    assert!(!fp.contains(SCREEN_CHARACTERISTICS));
    assert_eq!(fp.get("vendor"), Some(&json!("")));
  }

  #[test]
  fn test_non_object_container_is_rejected() {
    let result = normalize_sample(&sample(&[(SCREEN_CHARACTERISTICS, "*STRINGIFIED*[1]")]));
    assert!(matches!(
      result,
      Err(FingerprintError::MalformedSample { attribute, .. }) if attribute == SCREEN_CHARACTERISTICS
    ));

    let result = normalize_sample(&sample(&[(PLUGIN_CHARACTERISTICS, "plain")]));
    assert!(matches!(result, Err(FingerprintError::MalformedSample { .. })));
  }

  #[test]
  fn test_malformed_nested_entry_names_path() {
    let result = normalize_sample(&sample(&[(
      PLUGIN_CHARACTERISTICS,
      r#"*STRINGIFIED*{"plugins":"*STRINGIFIED*[1,"}"#,
    )]));
    assert!(matches!(
      result,
      Err(FingerprintError::MalformedSample { attribute, .. })
        if attribute == "pluginCharacteristics.plugins"
    ));
  }

  #[test]
  fn test_bundled_sample_has_no_sentinels() {
    let network =
      crate::network::BayesianNetwork::from_json_str(crate::data::FINGERPRINT_NETWORK_JSON).unwrap();
    for _ in 0..20 {
      let raw = network.generate_sample(&RawSample::new());
      let fp = normalize_sample(&raw).unwrap();
      for (name, value) in fp.attributes() {
        assert_ne!(name, PLUGIN_CHARACTERISTICS);
        assert_ne!(name, SCREEN_CHARACTERISTICS);
        if let Some(s) = value.as_str() {
          assert_ne!(s, MISSING_VALUE_DATASET_TOKEN);
          assert!(!s.starts_with(STRINGIFIED_PREFIX), "{name} still encoded");
        }
      }
    }
  }
}
