pub mod preference;
pub mod product;
pub mod signals;
