//! Host support utilities

pub mod os;

pub use os::{OsInfo, OsType};
