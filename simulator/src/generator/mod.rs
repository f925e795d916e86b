pub mod structure;
pub mod template;
