//! ctigraph Gatekeeper
//!
//! Ontology validation of extracted triples.
//!
//! The Gatekeeper provides:
//! - Structural checks (subject/object shape, predicate token form)
//! - Membership checks against the closed type and predicate sets
//! - Predicate domain/range enforcement
//! - Name presence and confidence bounds
//!
//! Invalid triples are never dropped: [`Gatekeeper::partition`] routes them
//! to a separate collection together with every reason that applied.
//!
//! # Examples
//!
//! ```
//! use ctigraph_gatekeeper::{Gatekeeper, ValidationConfig};
//! use ctigraph_domain::Ontology;
//! use serde_json::json;
//!
//! let ontology = Ontology::stix();
//! let gatekeeper = Gatekeeper::new(ValidationConfig::default(), &ontology);
//!
//! let result = gatekeeper.validate(&json!({
//!     "subject": {"name": "APT28", "type": "threat-actor"},
//!     "predicate": "uses",
//!     "object": {"name": "X-Agent", "type": "malware"},
//!     "confidence": 0.9
//! }));
//! assert!(result.is_valid());
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod report;
mod validator;

pub use config::ValidationConfig;
pub use error::GatekeeperError;
pub use report::{InvalidTriple, Partition, ValidationReport};
pub use validator::{Gatekeeper, RejectionReason, Role, ValidationResult, ValidationStatus};
