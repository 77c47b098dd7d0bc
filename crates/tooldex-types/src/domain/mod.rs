pub mod component;
pub mod details;
pub mod event;
pub mod scan;

pub use component::*;
pub use details::*;
pub use event::*;
pub use scan::*;
