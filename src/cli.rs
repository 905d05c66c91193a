// Command line surface of the `tape` binary. With no subcommand the
// interactive menu runs; `login` (alias `config`) and `upload` skip it.

use crate::api::ApiClient;
use crate::config::FileConfig;
use crate::ui::{main_menu, set_token, upload_file};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tape")]
#[command(about = "Upload files to tape")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Store the access token used for uploads
    #[command(visible_alias = "config")]
    Login,
    /// Upload one file and print its tape URL
    Upload {
        /// File to upload
        path: PathBuf,
    },
}

pub fn run(cli: Cli, api: &ApiClient<FileConfig>) -> Result<()> {
    match cli.command {
        None => main_menu(api),
        Some(Command::Login) => set_token(api.credentials()),
        Some(Command::Upload { path }) => upload_file(api, &path).map(|_| ()),
    }
}
