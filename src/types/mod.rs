//! Shared primitive types.
mod credentials;
pub use credentials::*;

mod diff;
pub use diff::*;

mod gift;
pub use gift::*;

mod intent;
pub use intent::*;

mod link;
pub use link::*;

mod token;
pub use token::*;
