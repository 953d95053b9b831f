use donut_fingerprint::data;
use donut_fingerprint::headers::{ACCEPT_LANGUAGE, USER_AGENT};
use donut_fingerprint::network::{MISSING_VALUE_DATASET_TOKEN, STRINGIFIED_PREFIX};
use donut_fingerprint::{
  BrowserSpec, FingerprintError, FingerprintGenerator, GenerationOptions, HeaderLookup, HeaderMap,
  HttpVersion, NetworkDefinitions,
};
use serde_json::{json, Value};
use std::collections::HashSet;

fn generator() -> FingerprintGenerator {
  FingerprintGenerator::new(GenerationOptions::default()).unwrap()
}

fn assert_no_sentinels(value: &Value) {
  match value {
    Value::String(s) => {
      assert_ne!(s, MISSING_VALUE_DATASET_TOKEN);
      assert!(!s.starts_with(STRINGIFIED_PREFIX), "Encoded value left: {s}");
    }
    Value::Array(items) => items.iter().for_each(assert_no_sentinels),
    Value::Object(entries) => entries.values().for_each(assert_no_sentinels),
    _ => {}
  }
}

#[test]
fn test_fingerprints_are_normalized() {
  let generator = generator();
  for _ in 0..50 {
    let result = generator.get_default_fingerprint().unwrap();
    let fingerprint = &result.fingerprint;

    assert!(!fingerprint.contains("pluginCharacteristics"));
    assert!(!fingerprint.contains("screenCharacteristics"));
    assert!(fingerprint.contains("languages"));
    for value in fingerprint.attributes().values() {
      assert_no_sentinels(value);
    }
  }
}

#[test]
fn test_fingerprint_matches_headers() {
  let generator = generator();
  for _ in 0..20 {
    let result = generator.get_default_fingerprint().unwrap();
    let user_agent = result.headers.get_ignore_case(USER_AGENT).unwrap();
    assert_eq!(result.fingerprint.user_agent(), Some(user_agent));

    let platform = result.fingerprint.get("platform").and_then(Value::as_str).unwrap();
    if user_agent.contains("Windows") {
      assert_eq!(platform, "Win32");
    } else if user_agent.contains("Macintosh") {
      assert_eq!(platform, "MacIntel");
    }
  }
}

#[test]
fn test_locales_flow_into_languages() {
  let options = GenerationOptions::new().with_locales(["en-US", "en", "fr"]);
  let result = generator()
    .get_fingerprint(&options, &HeaderMap::new())
    .unwrap();

  assert_eq!(
    result.headers.get_ignore_case(ACCEPT_LANGUAGE),
    Some("en-US,en;q=0.9,fr;q=0.8")
  );
  assert_eq!(result.fingerprint.languages(), vec!["en-US", "en", "fr"]);
}

#[test]
fn test_defaults_apply_unless_overridden() {
  let defaults = GenerationOptions::new()
    .with_browsers(["safari"])
    .with_http_version(HttpVersion::Http1);
  let generator = FingerprintGenerator::new(defaults).unwrap();

  let result = generator.get_default_fingerprint().unwrap();
  let user_agent = result.fingerprint.user_agent().unwrap();
  assert!(user_agent.contains("Safari/"), "Unexpected UA: {user_agent}");
  assert!(!user_agent.contains("Chrome/"));
  assert!(result.headers.contains_key("User-Agent"));

  let overrides = GenerationOptions::new().with_browsers([BrowserSpec::new("chrome")
    .with_min_version(124)
    .with_max_version(124)]);
  let result = generator
    .get_fingerprint(&overrides, &HeaderMap::new())
    .unwrap();
  let user_agent = result.fingerprint.user_agent().unwrap();
  assert!(user_agent.contains("Chrome/124."), "Unexpected UA: {user_agent}");
  assert!(result.headers.contains_key("User-Agent"));
}

#[test]
fn test_unknown_option_is_rejected() {
  let result = generator().get_fingerprint_from_value(&json!({"colour": "blue"}), &HeaderMap::new());
  match result {
    Err(FingerprintError::Validation(e)) => assert_eq!(e.field(), "colour"),
    other => panic!("Expected a validation error, got {other:?}"),
  }

  let defaults = GenerationOptions::from_value(&json!({"browsers": [{"name": "chrome", "min": 1}]}));
  assert!(defaults.is_err());
}

#[test]
fn test_request_dependent_user_agent_is_observed() {
  let user_agent =
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string();
  let mut request_headers = HeaderMap::new();
  request_headers.insert("user-agent".to_string(), user_agent.clone());

  let options = GenerationOptions::new().with_browsers(["firefox"]);
  let result = generator()
    .get_fingerprint(&options, &request_headers)
    .unwrap();

  assert_eq!(result.fingerprint.user_agent(), Some(user_agent.as_str()));
  assert_eq!(
    result.fingerprint.get("oscpu").and_then(Value::as_str),
    Some("Linux x86_64")
  );
}

#[test]
fn test_generator_is_shared_across_threads() {
  let generator = generator();
  let user_agents: Vec<String> = std::thread::scope(|scope| {
    let handles: Vec<_> = (0..4)
      .map(|_| {
        scope.spawn(|| {
          (0..10)
            .map(|_| {
              let result = generator.get_default_fingerprint().unwrap();
              result.fingerprint.user_agent().unwrap().to_string()
            })
            .collect::<Vec<_>>()
        })
      })
      .collect();
    handles
      .into_iter()
      .flat_map(|handle| handle.join().unwrap())
      .collect()
  });

  assert_eq!(user_agents.len(), 40);
  let distinct: HashSet<&String> = user_agents.iter().collect();
  assert!(distinct.len() > 1, "Expected varied user agents");
}

#[test]
fn test_generator_from_data_directory() {
  let dir = tempfile::tempdir().unwrap();
  let files = [
    (data::FINGERPRINT_NETWORK_STEM, data::FINGERPRINT_NETWORK_JSON),
    (data::INPUT_NETWORK_STEM, data::INPUT_NETWORK_JSON),
    (data::HEADER_NETWORK_STEM, data::HEADER_NETWORK_JSON),
    (data::BROWSER_HELPER_STEM, data::BROWSER_HELPER_JSON),
    (data::HEADERS_ORDER_STEM, data::HEADERS_ORDER_JSON),
  ];
  for (stem, contents) in files {
    std::fs::write(dir.path().join(format!("{stem}.json")), contents).unwrap();
  }

  let definitions = NetworkDefinitions::from_dir(dir.path()).unwrap();
  let generator =
    FingerprintGenerator::from_definitions(GenerationOptions::default(), &definitions).unwrap();

  let result = generator.get_default_fingerprint().unwrap();
  assert!(result.fingerprint.screen().is_some());
}

#[test]
fn test_result_serializes_fingerprint_and_headers() {
  let result = generator().get_default_fingerprint().unwrap();
  let value = serde_json::to_value(&result).unwrap();

  let fingerprint = value["fingerprint"].as_object().unwrap();
  assert!(fingerprint.contains_key("userAgent"));
  assert_eq!(fingerprint["languages"], json!(["en-US"]));

  let header_names: Vec<&String> = value["headers"].as_object().unwrap().keys().collect();
  let expected: Vec<&String> = result.headers.keys().collect();
  assert_eq!(header_names.len(), expected.len());
}
