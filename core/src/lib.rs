pub mod accessors;
pub mod client;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod parsers;
pub mod scope;
pub mod timestamp;

#[cfg(test)]
mod fake;

pub use accessors::PagerDuty;
pub use client::{PagerDutyApi, PrincipalProvider, Query};
pub use envelope::{Envelope, EnvelopeBuilder, ResponseLimits, build_envelope};
pub use error::{CoreError, UpstreamError, ValidationError, handle_api_error};
pub use scope::{ScopeOutcome, ScopeResolution, ScopeResolver, ScopeStage, UserScope};
pub use timestamp::validate_iso8601;
