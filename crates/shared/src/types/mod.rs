//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;
pub mod policy;

pub use id::*;
pub use pagination::{PageRequest, PageResponse};
pub use policy::{AllocationOrder, BackdatePolicy};
