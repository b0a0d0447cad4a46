mod commands;
mod handlers;

pub use commands::{Cli, Commands, Target};
pub use handlers::{handle_history, handle_init, handle_save, handle_show};
