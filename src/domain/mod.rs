mod aggregate;
mod customer;
mod filter;
mod money;

pub use aggregate::*;
pub use customer::*;
pub use filter::*;
pub use money::*;
