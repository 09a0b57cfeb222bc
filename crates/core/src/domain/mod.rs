pub mod digest;
pub mod tender;
