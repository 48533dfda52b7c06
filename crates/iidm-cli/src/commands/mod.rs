pub mod convert;
pub mod demo;
pub mod validate;
pub mod versions;
