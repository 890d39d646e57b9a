//! Accounts, roles and request-scoped session resolution.

pub mod model;
pub mod session;

pub use model::{Account, Role};
pub use session::{Caller, SessionResolver};
