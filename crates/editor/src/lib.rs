mod config;
mod core;
mod editor;
mod image_load;
mod ops;
mod plugin;
mod plugins;
mod schema;
mod toolbar;

pub mod html;

pub use crate::config::*;
pub use crate::core::*;
pub use crate::editor::*;
pub use crate::image_load::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::toolbar::*;
