//! # Fee Estimation
//!
//! Read-only fee estimates from the mirror REST service. Requests go through
//! the same retry loop as node submissions, classified by HTTP status.
//!
//! ```text
//! query.rs    - FeeEstimateQuery, mirror URL rules
//! response.rs - FeeEstimateResponse and friends (serde, camelCase)
//! ```

pub mod query;
pub mod response;

pub use query::{mirror_base_url, FeeEstimateQuery};
pub use response::{FeeEstimate, FeeEstimateMode, FeeEstimateResponse, FeeExtra, NetworkFee};
