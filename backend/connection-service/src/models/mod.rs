mod connection;
mod filter;
mod user;

pub use connection::*;
pub use filter::*;
pub use user::*;
