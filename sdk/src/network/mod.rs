//! # Network Module
//!
//! The client's view of the service network: which nodes exist, which are
//! healthy enough to try, and the bounded worker pool independent calls run on.
//!
//! ## Architecture
//!
//! ```text
//! node.rs    - One service node and its health/backoff state machine
//! pool.rs    - NodePool: request sizing, node selection, health marking
//! worker.rs  - Bounded worker pool with caller-runs overflow
//! ```
//!
//! ## Design Decisions
//!
//! - Each node owns a `parking_lot::Mutex` for its health. Marking one node
//!   unhealthy never blocks a selection touching another.
//! - The node list sits behind a `parking_lot::RwLock` because reads (every
//!   attempt) vastly outnumber writes (network reconfiguration).
//! - Nothing in this module performs I/O. Transports live in `execution`.

pub mod node;
pub mod pool;
pub mod worker;

pub use node::{HealthState, Node};
pub use pool::{NodePool, SelectionStrategy};
pub use worker::WorkerPool;
