//! CLI command handlers, one file per subcommand.

mod list;
mod reset;
mod run;
mod serve;
mod status;
mod submit;

pub use list::run_list;
pub use reset::run_reset;
pub use run::{build_worker, run_worker};
pub use serve::run_serve;
pub use status::run_status;
pub use submit::run_submit;
