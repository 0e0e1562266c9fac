//! # Execution Engine
//!
//! Gets prepared requests to the network and answers back, with bounded
//! retry.
//!
//! ```text
//! retry.rs     - RetryPolicy, AttemptOutcome, the generic attempt loop
//! transport.rs - NodeTransport trait, TCP implementation, precheck statuses
//! http.rs      - HttpTransport trait, reqwest implementation
//! submit.rs    - Transaction::execute / execute_all / execute_fan_out
//! ```
//!
//! Node submissions and mirror queries share [`execute_with_retry`]. They
//! differ only in how one attempt's result is classified:
//!
//! | Result                                 | Outcome     |
//! |----------------------------------------|-------------|
//! | node `OK`, HTTP 2xx with a valid body  | `Success`   |
//! | `BUSY`, `PLATFORM_*`, HTTP 408/429/5xx | `Retry`     |
//! | unparseable or inconsistent body       | `Retry`     |
//! | node connection failure                | `NextNode`  |
//! | any other status                       | `Fatal`     |

pub mod http;
pub mod retry;
pub mod submit;
pub mod transport;

pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use retry::{execute_with_retry, AttemptOutcome, RetryPolicy};
pub use submit::TransactionResponse;
pub use transport::{
    encode_response, read_message, write_message, NodeResponse, NodeTransport, ResponseStatus,
    TcpNodeTransport,
};
