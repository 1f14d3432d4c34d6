//! Messaging transport: the Bitmessage adapter and an in-memory double.

pub mod bitmessage;
pub mod mock;
pub mod traits;

pub use bitmessage::{BitmessageConnection, BitmessageTransport};
pub use mock::{MockTransport, SentMessage};
pub use traits::Transport;
