pub mod backends;
pub mod surfaces;
