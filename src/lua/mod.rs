pub mod canvas;
pub mod host;
pub mod runtime;

pub use host::{find_scripts, is_script, HookGuard, ScriptHost, Untracked, SCRIPT_EXTENSION};
pub use runtime::{ScriptContext, ScriptEngine};
