pub mod error;
pub mod identifier;
pub mod types;
pub mod value;

pub use error::{Result, StoreError};
pub use identifier::Identifier;
pub use types::DataType;
pub use value::Value;
