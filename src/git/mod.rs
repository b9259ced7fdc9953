//! git process plumbing shared by the comparison and merge code

mod command;
mod workspace;

pub use command::GitCommand;
pub use workspace::Workspace;
