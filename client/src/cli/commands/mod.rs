mod configure;
mod status;
mod switch;
mod watch;

pub use configure::configure;
pub use status::status;
pub use switch::switch_command;
pub use watch::watch;
