//! Network definitions and helper tables bundled into the binary.

/// Artifact stems, shared by the bundled set and on-disk directories.
pub const FINGERPRINT_NETWORK_STEM: &str = "fingerprint-network-definition";
pub const INPUT_NETWORK_STEM: &str = "input-network-definition";
pub const HEADER_NETWORK_STEM: &str = "header-network-definition";
pub const BROWSER_HELPER_STEM: &str = "browser-helper-file";
pub const HEADERS_ORDER_STEM: &str = "headers-order";

pub const FINGERPRINT_NETWORK_JSON: &str =
  include_str!("../data/fingerprint-network-definition.json");
pub const INPUT_NETWORK_JSON: &str = include_str!("../data/input-network-definition.json");
pub const HEADER_NETWORK_JSON: &str = include_str!("../data/header-network-definition.json");
pub const BROWSER_HELPER_JSON: &str = include_str!("../data/browser-helper-file.json");
pub const HEADERS_ORDER_JSON: &str = include_str!("../data/headers-order.json");
