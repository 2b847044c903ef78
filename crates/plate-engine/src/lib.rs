mod block;
mod core;
mod figure;
mod inline;
mod markup;
mod normalize;
mod ops;
mod plugin;
pub mod query;
pub mod range;
pub mod schema;
mod serde_value;
pub mod tree;

pub use crate::block::{set_alignment, set_block_type, toggle_list};
pub use crate::core::*;
pub use crate::figure::insert_figure;
pub use crate::inline::{set_link, toggle_inline, unset_link};
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::ListKind;
pub use crate::serde_value::*;
