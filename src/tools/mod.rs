pub mod console;
pub mod errors;
pub mod keys;
pub mod macros;
pub mod network;
pub mod prompt;
pub mod session;
pub mod shell_escape;
pub mod ssh;
pub mod types;
pub mod validation;
