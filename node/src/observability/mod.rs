//! Everything related to node observability lives here.

pub mod process;
pub mod prometheus;
pub mod tracing;

pub use prometheus::PrometheusExporter;
