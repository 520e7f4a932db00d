pub mod check;
pub mod parse_url;
pub mod show_plan;
pub mod watch;
