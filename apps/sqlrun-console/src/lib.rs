//! Terminal shell for the SQL runner backend.

pub mod commands;
pub mod console;
pub mod editor;
pub mod render;

pub use console::{Console, Reply};
pub use editor::{Editor, EditorState, QueryRun, SubmitRejected};
