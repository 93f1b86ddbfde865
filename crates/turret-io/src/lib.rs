pub mod bridge;
pub mod metrics;
pub mod protocol;

pub use bridge::{run_bridge, Bridge, BridgeConfig, BridgeError};
pub use metrics::{init_metrics, serve_metrics};
pub use protocol::{decode_frame, ProtocolVersion, StateMsg};
