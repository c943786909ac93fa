mod cursor;
mod error;
mod types;

pub use cursor::Cursor;
pub use error::{CursorError, PageRequestError};
pub use types::{Page, PageRequest};
