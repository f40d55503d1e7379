mod create;
mod doctor;
mod exec;
mod fix;
mod lifecycle;
mod logs;
mod services;
mod validate;

pub use create::run_create;
pub use doctor::run_doctor;
pub use exec::run_exec;
pub use fix::run_fix;
pub use lifecycle::{run_delete, run_lifecycle, run_set_enabled, LifecycleCommand};
pub use logs::run_logs;
pub use services::{run_get, run_health, run_list};
pub use validate::{run_validate_data, run_validate_services};
