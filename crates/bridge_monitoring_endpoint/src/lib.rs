//! The optional debug HTTP endpoint exposing the daemon's internal state.

pub mod monitoring_endpoint;

pub use monitoring_endpoint::{
    MonitoringEndpoint,
    MonitoringEndpointConfig,
    MonitoringEndpointRunError,
};
