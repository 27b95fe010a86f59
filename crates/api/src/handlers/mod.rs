pub mod form;
pub mod videos;
