// pagefaves state managers
// Managers handle stateful operations: the canonical bookmark list, session
// code, and share link.

pub mod state_manager;
