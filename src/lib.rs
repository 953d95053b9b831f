//! Synthetic browser identities.
//!
//! [`FingerprintGenerator`] produces a browser fingerprint together with the HTTP
//! headers that browser would send. Both are sampled from Bayesian networks trained on
//! real traffic, with the generated User-Agent tying the two together.

pub mod data;
pub mod fingerprint;
pub mod headers;
pub mod network;
pub mod options;

pub use fingerprint::{
  AttributeSampler, Fingerprint, FingerprintError, FingerprintGenerator, FingerprintWithHeaders,
};
pub use headers::{HeaderGenerator, HeaderGeneratorError, HeaderLookup, HeaderMap, HeaderSource};
pub use network::{BayesianNetwork, NetworkDefinitions};
pub use options::{BrowserEntry, BrowserSpec, GenerationOptions, HttpVersion, ValidationError};
