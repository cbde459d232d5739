//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod session;
pub mod trace_id;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use session::{require_admin, require_user};
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
