//! DTOs of the operator surface.

use serde::Serialize;
use utoipa::ToSchema;

/// Result of an on-demand reaper sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    /// Codes of the sessions this sweep moved to `finished`.
    pub finalized: Vec<String>,
}
