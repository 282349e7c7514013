//! Authorization core - route policy resolution and scope matching
//!
//! Two pure functions make the allow/deny decision:
//! - [`resolve_roles`]: which roles the route policy demands for a verb/path
//! - [`intersect`]: which of those roles the verified token actually grants
//!
//! Both are total and side-effect free; an empty result always means "deny"
//! downstream, never "unprotected".

mod policy;
mod scope;

pub use policy::{resolve_roles, RoutePolicy};
pub use scope::intersect;
