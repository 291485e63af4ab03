use anyhow::{Context, Result};
use clap::Subcommand;

use crosspost::config::Config;
use crosspost::storage::SeenLedger;
use crosspost::utils::format_account_url;

#[derive(Subcommand, Debug)]
pub enum LedgerAction {
    /// List relayed item IDs per account
    Show {
        /// Only this account (handle or URL)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Forget relayed items so they are eligible again
    Clear {
        /// Only this account (handle or URL); all accounts when omitted
        #[arg(short, long)]
        account: Option<String>,
    },
}

pub fn ledger(config: &Config, action: LedgerAction) -> Result<()> {
    let path = &config.storage.ledger_path;
    let open = || {
        SeenLedger::try_load(path).with_context(|| format!("Failed to open ledger: {}", path.display()))
    };

    match action {
        LedgerAction::Show { account } => {
            let ledger = open()?;
            println!("Seen ledger: {}", path.display());
            println!("================================");

            let accounts: Vec<String> = match account {
                Some(account) => vec![format_account_url(&account)],
                None => ledger.accounts().map(str::to_string).collect(),
            };
            if accounts.is_empty() {
                println!("  (empty)");
            }
            for account in &accounts {
                let ids = ledger.ids(account);
                println!("{account} ({} item(s))", ids.len());
                for id in ids {
                    println!("  {id}");
                }
            }
        }

        LedgerAction::Clear { account } => match account {
            Some(account) => {
                let mut ledger = open()?;
                let account = format_account_url(&account);
                if ledger.clear_account(&account) {
                    ledger.flush()?;
                    println!("Cleared {account}");
                } else {
                    println!("Nothing recorded for {account}");
                }
            }
            None => {
                // A corrupt document is replaced rather than reported
                let mut ledger = SeenLedger::load(path);
                let count = ledger.len();
                ledger.clear();
                ledger.flush()?;
                println!("Cleared {count} item(s)");
            }
        },
    }

    Ok(())
}
