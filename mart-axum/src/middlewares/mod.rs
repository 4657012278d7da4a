pub mod multipart;
pub mod observability;
