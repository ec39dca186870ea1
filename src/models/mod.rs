//! Data models

mod audit;
mod auth;
mod employee;
mod filter;
mod page;
mod role;
mod ticket;

pub use audit::*;
pub use auth::*;
pub use employee::*;
pub use filter::*;
pub use page::*;
pub use role::*;
pub use ticket::*;
