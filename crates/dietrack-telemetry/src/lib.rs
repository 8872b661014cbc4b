mod logging;

pub use logging::{build_filter, init_telemetry, TelemetryConfig};
