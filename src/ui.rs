// UI layer: an interactive menu built with `dialoguer`.
// It owns the upload sequence (slot -> transfer -> confirm) and decides
// what gets printed; the `api` module itself never writes to stdout.

use crate::api::{transfer_file, ApiClient, UploadSlot};
use crate::config::{CredentialProvider, FileConfig, TOKEN_KEY};
use crate::error::UploadError;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Map;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Content type used when the file signature is not recognised.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Main interactive menu. Loops until the user chooses "Exit".
pub fn main_menu(api: &ApiClient<FileConfig>) -> Result<()> {
    loop {
        let items = vec!["Set access token", "Upload file", "Exit"];
        let selection = Select::new().items(&items).default(1).interact()?;
        match selection {
            0 => set_token(api.credentials())?,
            1 => {
                let path: String = Input::new().with_prompt("File path").interact_text()?;
                // Failures are shown and the menu continues.
                if let Err(e) = upload_file(api, Path::new(path.trim())) {
                    println!("Upload failed: {:#}", e);
                    if needs_login(&e)
                        && Confirm::new()
                            .with_prompt("Set an access token now?")
                            .default(true)
                            .interact()?
                    {
                        set_token(api.credentials())?;
                    }
                }
            }
            2 => break,
            _ => {}
        }
    }
    Ok(())
}

/// True when the upload failed for lack of a usable token.
fn needs_login(err: &anyhow::Error) -> bool {
    err.downcast_ref::<UploadError>()
        .is_some_and(UploadError::needs_login)
}

/// Ask for a token (hidden input) and store it for later runs.
/// Backs both the menu entry and `tape login` / `tape config`.
pub fn set_token(config: &FileConfig) -> Result<()> {
    let token: String = Password::new().with_prompt("Access token").interact()?;
    let token = token.trim();
    if token.is_empty() {
        config.remove(TOKEN_KEY)?;
        println!("Token cleared.");
    } else {
        config.set(TOKEN_KEY, token)?;
        println!("Token saved to {}", config.path().display());
    }
    Ok(())
}

/// Upload one file: request a slot, PUT the bytes, confirm, report.
///
/// A slot whose transfer fails is left as is on the server.
pub fn upload_file<C>(api: &ApiClient<C>, path: &Path) -> Result<UploadSlot>
where
    C: CredentialProvider,
{
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .context("File path has no usable file name")?;
    let content_type = detect_content_type(path, &content);

    let spinner = start_spinner("Requesting upload slot...");
    let slot = api.create_upload_slot(file_name, &content_type, &Map::new());
    spinner.finish_and_clear();
    let slot = slot?;

    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), content_type);

    let spinner = start_spinner("Uploading...");
    let transferred = transfer_file(content, &slot.url, &headers);
    spinner.finish_and_clear();
    if let Err(e) = transferred {
        warn!(id = %slot.id, "transfer failed, slot left unconfirmed");
        return Err(e.into());
    }

    let spinner = start_spinner("Confirming...");
    let confirmed = api.confirm_upload(&slot.id);
    spinner.finish_and_clear();
    let confirmed = confirmed?;

    confirmed.report(&mut std::io::stdout())?;
    println!("Tape URL: {}", slot.tape_url);
    Ok(slot)
}

/// Guess the MIME type from the file's leading bytes, then from its
/// extension for text formats that carry no signature.
pub fn detect_content_type(path: &Path, content: &[u8]) -> String {
    if let Some(kind) = infer::get(content) {
        return kind.mime_type().to_string();
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    mime_for_extension(&extension)
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "svg" => "image/svg+xml",
        "srt" => "application/x-subrip",
        "vtt" => "text/vtt",
        _ => return None,
    };
    Some(mime)
}

// Activity indicator only; it never shows how much has been sent.
fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
