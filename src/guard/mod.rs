//! Per-request access decisions for every path.

pub mod middleware;
pub mod policy;

pub use middleware::{Guard, route_guard};
pub use policy::{GuardDecision, RouteSpace, found};
