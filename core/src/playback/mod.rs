pub mod cursor;
pub mod handle;
pub mod session;

pub use cursor::{CursorState, PlayState, PlaybackCursor};
pub use handle::SessionHandle;
pub use session::{PlaybackSession, SessionOptions};
