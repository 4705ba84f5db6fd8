//! PTY (pseudo-terminal) handling for the wrapped child.
//!
//! - `spawn`: child process spawning with PTY setup
//! - `relay`: stdin/stdout/child-input pumps and window-size propagation

mod relay;
mod spawn;

pub use relay::{
    spawn_input_pump, spawn_output_pump, spawn_resize_watcher, spawn_writer_pump, ChildInput,
};
pub use spawn::{spawn_child, terminal_size, SpawnResult};
