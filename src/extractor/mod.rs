pub mod path;
pub mod query;
pub mod validated;
