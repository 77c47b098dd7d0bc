pub mod component;
pub mod event;
pub mod search;
