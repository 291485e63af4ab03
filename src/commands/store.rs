use anyhow::{Context, Result};
use clap::Subcommand;
use std::io::BufRead;

use crosspost::config::store::{
    clear_credentials, load_credentials, load_settings, save_credentials, save_settings,
    SavedCredentials,
};
use crosspost::config::{Config, KeyValueStore, Settings};
use crosspost::models::CredentialPair;

#[derive(Subcommand, Debug)]
pub enum StoreAction {
    /// Remember the destination login and primary account
    ///
    /// The password is read from stdin with `--password-stdin`, otherwise
    /// from CROSSPOST_DEST_PASSWORD, otherwise from a hidden prompt.
    SaveCredentials {
        /// Primary source account (handle or URL)
        #[arg(short, long)]
        account: Option<String>,

        /// Destination login email
        #[arg(short, long)]
        email: String,

        /// Read the destination password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },

    /// Forget the saved login
    ClearCredentials,

    /// Change saved run settings; omitted options keep their saved value
    SaveSettings {
        /// Run the browser without a window (true/false)
        #[arg(long)]
        headless: Option<bool>,

        /// Publish immediately instead of enqueueing (true/false)
        #[arg(long)]
        auto_publish: Option<bool>,

        /// Navigation timeout in milliseconds
        #[arg(long)]
        page_timeout_ms: Option<u64>,

        /// Element wait timeout in milliseconds
        #[arg(long)]
        element_timeout_ms: Option<u64>,
    },

    /// Print saved settings and the saved login
    Settings,

    /// Remove everything in the store
    ClearAll,
}

pub fn store(config: &Config, action: StoreAction) -> Result<()> {
    let path = &config.storage.store_path;
    let mut store = config
        .storage
        .open_store()
        .context("Failed to open settings store")?;

    match action {
        StoreAction::SaveCredentials {
            account,
            email,
            password_stdin,
        } => {
            let password = if password_stdin {
                read_password_line(std::io::stdin().lock())?
            } else if !config.credentials.destination.password.is_empty() {
                config.credentials.destination.password.clone()
            } else {
                rpassword::prompt_password("Destination password: ")
                    .context("Failed to read password")?
            };

            let previous = load_credentials(&store)?.unwrap_or_default();
            let saved = SavedCredentials {
                account: account.unwrap_or(previous.account),
                destination: CredentialPair::new(email, password),
            };
            if !saved.destination.is_complete() {
                anyhow::bail!("email and password must not be empty");
            }
            save_credentials(&mut store, &saved)?;
            println!(
                "Saved login {} to {}",
                saved.destination.masked_username(),
                path.display()
            );
        }

        StoreAction::ClearCredentials => {
            clear_credentials(&mut store)?;
            println!("Saved login removed");
        }

        StoreAction::SaveSettings {
            headless,
            auto_publish,
            page_timeout_ms,
            element_timeout_ms,
        } => {
            let mut settings = load_settings(&store)?;
            update_settings(
                &mut settings,
                headless,
                auto_publish,
                page_timeout_ms,
                element_timeout_ms,
            )?;
            save_settings(&mut store, &settings)?;
            println!("Saved settings to {}", path.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }

        StoreAction::Settings => {
            let settings = load_settings(&store)?;
            println!("Store: {}", path.display());
            println!("================================");
            println!("{}", serde_json::to_string_pretty(&settings)?);
            match load_credentials(&store)? {
                Some(saved) => println!(
                    "login: {} (account: {})",
                    saved.destination.masked_username(),
                    if saved.account.is_empty() { "-" } else { saved.account.as_str() }
                ),
                None => println!("login: (none)"),
            }
        }

        StoreAction::ClearAll => {
            store.clear()?;
            println!("Store cleared");
        }
    }

    Ok(())
}

fn update_settings(
    settings: &mut Settings,
    headless: Option<bool>,
    auto_publish: Option<bool>,
    page_timeout_ms: Option<u64>,
    element_timeout_ms: Option<u64>,
) -> Result<()> {
    if page_timeout_ms == Some(0) || element_timeout_ms == Some(0) {
        anyhow::bail!("timeouts must be greater than 0");
    }
    if let Some(v) = headless {
        settings.headless = v;
    }
    if let Some(v) = auto_publish {
        settings.auto_publish = v;
    }
    if let Some(v) = page_timeout_ms {
        settings.page_timeout_ms = v;
    }
    if let Some(v) = element_timeout_ms {
        settings.element_timeout_ms = v;
    }
    Ok(())
}

/// First line of `reader` without its line ending
fn read_password_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
