mod exec;
mod info;
mod target;

pub use exec::cmd_exec;
pub use info::cmd_info;
pub use target::cmd_target;
