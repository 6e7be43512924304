//! Command-line interface and per-stage orchestration.

mod classify_users;
mod common;
mod filter_tools;
mod get_repo_users;
mod get_stats;
mod get_tools;
mod get_user_details;

pub use self::classify_users::{ClassifyUsersArgs, classify_users};
pub use self::common::{Common, CommonArgs};
pub use self::filter_tools::{FilterToolsArgs, filter_tools};
pub use self::get_repo_users::{GetRepoUsersArgs, get_repo_users};
pub use self::get_stats::{GetStatsArgs, get_stats};
pub use self::get_tools::{GetToolsArgs, get_tools};
pub use self::get_user_details::{GetUserDetailsArgs, get_user_details};
