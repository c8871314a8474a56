pub mod descriptor;
pub mod note;
pub mod remote;

pub use descriptor::{FeedDescriptor, FeedKind, FeedOptions, UnknownFeedKind};
pub use note::Note;
pub use remote::RemoteSession;
