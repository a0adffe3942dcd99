use std::path::PathBuf;

use clap::Subcommand;

use crate::cli::output::{output, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::services::crm::CrmStorage;

#[derive(Subcommand)]
pub enum CrmCommands {
    #[command(about = "Seed the directory file when it runs low on contacts")]
    Seed {
        #[arg(long, help = "Directory file (defaults to CRM_STORAGE_PATH)")]
        path: Option<PathBuf>,
    },

    #[command(about = "List contacts")]
    Contacts {
        #[arg(long, help = "Directory file (defaults to CRM_STORAGE_PATH)")]
        path: Option<PathBuf>,
    },
}

async fn open(path: Option<PathBuf>) -> anyhow::Result<CrmStorage> {
    let mut crm_config = config().crm.clone();
    if path.is_some() {
        crm_config.storage_path = path;
    }
    if crm_config.storage_path.is_none() {
        anyhow::bail!("No CRM file configured; pass --path or set CRM_STORAGE_PATH");
    }
    Ok(CrmStorage::open(&crm_config).await?)
}

pub async fn handle(cmd: CrmCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CrmCommands::Seed { path } => {
            let storage = open(path).await?;
            let contacts = storage.contacts().await?;
            let workshops = storage.workshops().await?;
            output_success(
                output_format,
                &format!("Directory holds {} contacts and {} workshops", contacts.len(), workshops.len()),
                Some(serde_json::json!({ "contacts": contacts.len(), "workshops": workshops.len() })),
            )
        }
        CrmCommands::Contacts { path } => {
            let storage = open(path).await?;
            let contacts = storage.contacts().await?;
            output(output_format, &contacts, |contacts| {
                for contact in contacts {
                    let name = format!("{} {}", contact.first_name, contact.last_name);
                    println!(
                        "{}  {:<28} {:<11} {:>3}  {}",
                        contact.id,
                        name,
                        contact.level.as_str(),
                        contact.engagement_score,
                        contact.status
                    );
                }
            })
        }
    }
}
