//! Domain identifiers, credentials, key tokens, and filing records.

pub mod filing;
pub mod id;
pub mod secret;
pub mod token;

pub use filing::*;
pub use id::*;
pub use secret::*;
pub use token::*;
