//! One module per subcommand, each exposing `execute`.

pub mod completions;
pub mod delete;
pub mod get;
pub mod init;
pub mod keyfile;
pub mod list;
pub mod mount;
pub mod password;
pub mod rotate;
pub mod set;
