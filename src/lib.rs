// Library root
// -----------
// This crate exposes the upload protocol as a library; the binary
// (`main.rs`) wraps it in an interactive CLI.
//
// Module responsibilities:
// - `api`: the three upload calls (create slot, transfer, confirm).
// - `graphql`: per-call authenticated client and reply classification.
// - `config`: credential lookup and the on-disk key-value store.
// - `error`: the error type returned by `api` and `graphql`.
// - `format`: byte sizes for display.
// - `ui`: terminal menu and the end-to-end upload flow.
// - `cli`: subcommands of the `tape` binary.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod graphql;
pub mod ui;

pub use api::{transfer_file, ApiClient, ConfirmationResult, TransferOutcome, UploadSlot};
pub use config::{CredentialProvider, FileConfig};
pub use error::UploadError;
