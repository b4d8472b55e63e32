//! Dispatcher: resolves decoded key events through the keymap trie into
//! [`core_keymap::Command`]s, then applies those commands against a
//! [`core_viewer::Cache`] plus the small bit of cursor/viewport/mode state
//! the cache itself doesn't own (current line, hex cursor, search prompt
//! buffer) — the same split the teacher keeps between its buffer state and
//! its `View`.

mod resolver;
mod session;

pub use resolver::KeyResolver;
pub use session::{DispatchOutcome, FindDirection, Mode, ViewerSession, ViewerView};
