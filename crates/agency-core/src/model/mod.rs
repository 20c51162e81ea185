pub mod entity;
pub mod level;

pub use entity::*;
pub use level::*;
