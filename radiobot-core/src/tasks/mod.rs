pub mod auto_fix;
pub mod presence_tick;
pub mod watchdog;

pub use auto_fix::{run_auto_fix, spawn_auto_fix_task};
pub use presence_tick::spawn_presence_task;
pub use watchdog::spawn_watchdog_task;
