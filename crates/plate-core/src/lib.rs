mod classify;
mod core;
mod dispatch;
mod ops;
pub mod path;
mod plugin;
mod serde_value;
mod table;
mod transforms;
mod tree;

pub use crate::classify::*;
pub use crate::core::*;
pub use crate::ops::*;
pub use crate::path::Path;
pub use crate::plugin::*;
pub use crate::serde_value::*;
pub use crate::table::*;
pub use crate::transforms::*;
pub use crate::tree::*;
