//! Request handlers.

pub mod attachments;
pub mod health;
pub mod images;
pub mod sessions;
pub mod status;
pub mod videos;

pub use attachments::*;
pub use health::*;
pub use images::*;
pub use sessions::*;
pub use status::*;
pub use videos::*;
