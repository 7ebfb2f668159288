//! AAP Provider
//!
//! An infrastructure-as-code provider for Ansible Automation Platform (AAP).
//! The host drives it through the [`ProviderService`] trait; resources talk to
//! the AAP REST API through [`client::AapClient`].
//!
//! # Overview
//!
//! - **Custom string type**: [`CustomStringValue`] holds JSON or YAML text and
//!   compares by structure, so `{"a": 1}` and `a: 1` are the same value
//! - **Resources**: `aap_inventory` and `aap_job`, plus the `aap_inventory`
//!   data source
//! - **Planning**: attribute tables decide which attributes are compared
//!   semantically; a semantic match keeps the prior text in the plan
//! - **Configuration**: provider block settings with `AAP_*` environment
//!   fallbacks
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Semantic equality
//!
//! ```
//! use aap_provider::{CustomStringValue, StringSemanticEquals};
//!
//! let configured = CustomStringValue::new(r#"{"os": "Linux", "ports": [80, 443]}"#);
//! let from_server = CustomStringValue::new("---\nports:\n  - 80\n  - 443\nos: Linux\n");
//!
//! let (equal, diagnostics) = configured.string_semantic_equals(&from_server);
//! assert!(equal);
//! assert!(diagnostics.is_empty());
//! ```
//!
//! Text that is neither JSON nor a YAML mapping or sequence only matches an
//! identical copy of itself; any other comparison yields a warning diagnostic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod client;
pub mod config;
pub mod customtypes;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod testing;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use client::{AapClient, HttpResponse, ProviderHttpClient};
pub use config::ProviderConfig;
pub use customtypes::{semantic_equals, CustomStringType, CustomStringValue};
pub use diagnostics::{Diagnostic, DiagnosticSeverity};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{AapProvider, ProviderService};
pub use types::{AttributeChange, PlanResult, ProviderMetadata};
pub use value::{StringSemanticEquals, StringValuable, StringValue};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
