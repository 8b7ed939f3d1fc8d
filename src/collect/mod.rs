// ABOUTME: Host data collection: metric snapshots and OS-entity enumeration
// ABOUTME: Boundary collaborators of the access-control core, all best-effort

//! Collectors behind the protected routes. Metric collection is
//! best-effort: a source that fails to answer contributes zeros or an empty
//! list rather than failing the whole snapshot.

pub mod host;
pub mod metrics;

pub use host::{
    containers, logins, processes, services, ContainerInfo, LoginSession, ProcessInfo,
    ServiceInfo, ServiceQueryError,
};
pub use metrics::{MetricsCollector, MetricsSnapshot};
