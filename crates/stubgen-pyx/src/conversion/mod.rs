//! Declaration-to-model conversion

mod converter;
pub mod signature;
pub mod utils;

pub use converter::{Converter, convert_enum};
