//! Business logic services

pub mod auth;
pub mod cache;
pub mod employee;
pub mod lifecycle;
pub mod policy;
pub mod role;
pub mod ticket;

pub use auth::AuthService;
pub use cache::{Cache, CacheEntry, ViewCache};
pub use employee::EmployeeService;
pub use policy::{Capability, Operation};
pub use role::RoleService;
pub use ticket::{RemarkPath, TicketService};
