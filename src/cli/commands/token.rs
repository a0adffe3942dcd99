use anyhow::Context;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{mint_token, Claims};
use crate::cli::output::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::memory::demo;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "User id (defaults to the demo organization owner)")]
    pub user: Option<Uuid>,

    #[arg(long, help = "Email claim")]
    pub email: Option<String>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let user_id = args.user.unwrap_or(demo::OWNER);

    let claims = Claims::new(user_id, args.email, security);
    let token = mint_token(&claims, security).context("minting token")?;

    match output_format {
        OutputFormat::Text => println!("{}", token),
        OutputFormat::Json => output_success(
            output_format,
            "Token minted",
            Some(json!({ "token": token, "user_id": user_id, "expires_at": claims.exp })),
        )?,
    }
    Ok(())
}
