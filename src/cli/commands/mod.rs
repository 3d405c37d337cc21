mod config;
mod run;
mod status;

pub use config::ConfigCommand;
pub use run::RunArgs;

pub use config::handle_config;
pub use run::handle_run;
pub use status::handle_status;
