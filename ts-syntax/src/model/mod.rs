pub mod kind;
pub mod language;
pub mod span;
