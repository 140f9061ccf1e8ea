mod default;
mod unauthorized;
mod unprocessable_entity;

pub use default::*;
pub use unauthorized::*;
pub use unprocessable_entity::*;
