//! Pipeline daemon: log poll + expiration sweep + content sync + control socket.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_content_sync, request_mark_device, request_status, request_stop, send_request,
    DaemonRequest, DaemonResponse,
};
pub use runtime::{run, run_with_transport, start_blocking, startup, Counters, PipelineState};
