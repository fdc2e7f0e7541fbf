use std::{path::PathBuf, slice, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{
    AdminConsole, ConfirmOutcome, Developer, DialogState, Entity, EntityGateway, FormError,
    GatewayConfig, GridRow, HttpGateway, ListController,
};
use shared::domain::{DeveloperId, Gender, LevelId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod settings;
mod terminal;

use settings::load_settings;
use terminal::{ask_confirmation, render_table, render_validation, TerminalNotifier};

#[derive(Parser, Debug)]
#[command(name = "admin-console", about = "Manage levels and developers")]
struct Args {
    #[arg(long, default_value = "console.toml")]
    config: PathBuf,
    /// Backend base URL; overrides settings and environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Confirm deletions without prompting.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Levels {
        #[command(subcommand)]
        action: LevelAction,
    },
    Developers {
        #[command(subcommand)]
        action: DeveloperAction,
    },
}

#[derive(Subcommand, Debug)]
enum LevelAction {
    List,
    Create {
        #[arg(long)]
        name: String,
    },
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum DeveloperAction {
    List,
    Create(DeveloperFlags),
    Edit {
        id: i64,
        #[command(flatten)]
        flags: DeveloperFlags,
    },
    Delete {
        id: i64,
    },
}

/// Fields left out keep the draft's value: empty on create, stored on edit.
#[derive(ClapArgs, Debug, Default)]
struct DeveloperFlags {
    #[arg(long = "level")]
    level_id: Option<i64>,
    #[arg(long)]
    name: Option<String>,
    /// `m`/`f` (or `male`/`female`).
    #[arg(long)]
    gender: Option<Gender>,
    /// `YYYY-MM-DD`.
    #[arg(long)]
    date_of_birth: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    age: Option<i64>,
    #[arg(long)]
    hobby: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(api_url) = args.api_url.clone() {
        settings.api_url = api_url;
    }
    info!(api_url = %settings.api_url, "using backend");

    let config = GatewayConfig::new(&settings.api_url)
        .with_context(|| format!("invalid api url '{}'", settings.api_url))?
        .with_timeout(settings.request_timeout());
    let gateway = Arc::new(HttpGateway::new(config)?);
    let console = AdminConsole::new(gateway, Arc::new(TerminalNotifier));

    match args.command {
        Command::Levels { action } => run_levels(&console, action, args.yes).await,
        Command::Developers { action } => run_developers(&console, action, args.yes).await,
    }
}

async fn run_levels(
    console: &AdminConsole<HttpGateway>,
    action: LevelAction,
    assume_yes: bool,
) -> Result<()> {
    console
        .open_levels()
        .await
        .context("failed to load levels")?;
    let page = console.levels();
    match action {
        LevelAction::List => print_rows(page).await,
        LevelAction::Create { name } => {
            page.request_create().await;
            page.form().edit(|draft| draft.name = name).await?;
            submit(page).await
        }
        LevelAction::Edit { id, name } => {
            page.request_edit(LevelId(id)).await?;
            if let Some(name) = name {
                page.form().edit(|draft| draft.name = name).await?;
            }
            submit(page).await
        }
        LevelAction::Delete { id } => {
            page.request_delete(LevelId(id)).await?;
            confirm_delete(console, assume_yes).await
        }
    }
}

async fn run_developers(
    console: &AdminConsole<HttpGateway>,
    action: DeveloperAction,
    assume_yes: bool,
) -> Result<()> {
    console
        .open_developers()
        .await
        .context("failed to load developers")?;
    let page = console.developers();
    match action {
        DeveloperAction::List => print_rows(page).await,
        DeveloperAction::Create(flags) => {
            page.request_create().await;
            apply_developer_flags(page, flags).await?;
            submit(page).await
        }
        DeveloperAction::Edit { id, flags } => {
            page.request_edit(DeveloperId(id)).await?;
            apply_developer_flags(page, flags).await?;
            submit(page).await
        }
        DeveloperAction::Delete { id } => {
            page.request_delete(DeveloperId(id)).await?;
            confirm_delete(console, assume_yes).await
        }
    }
}

async fn apply_developer_flags(
    page: &ListController<Developer, HttpGateway>,
    flags: DeveloperFlags,
) -> Result<()> {
    page.form()
        .edit(|draft| {
            if let Some(level_id) = flags.level_id {
                draft.level_id = Some(LevelId(level_id));
            }
            if let Some(name) = flags.name {
                draft.name = name;
            }
            if let Some(gender) = flags.gender {
                draft.gender = Some(gender);
            }
            if let Some(date_of_birth) = flags.date_of_birth {
                draft.date_of_birth = date_of_birth;
            }
            if let Some(age) = flags.age {
                draft.age = Some(age);
            }
            if let Some(hobby) = flags.hobby {
                draft.hobby = hobby;
            }
        })
        .await?;
    Ok(())
}

async fn print_rows<E, G>(page: &ListController<E, G>) -> Result<()>
where
    E: Entity,
    G: EntityGateway<E> + 'static,
{
    let rows = page
        .rows()
        .await
        .ok_or_else(|| anyhow!("list has not been loaded"))?;
    print!("{}", render_table(page.columns(), &rows));
    Ok(())
}

async fn submit<E, G>(page: &ListController<E, G>) -> Result<()>
where
    E: Entity,
    G: EntityGateway<E> + 'static,
{
    match page.form().submit().await {
        Ok(record) => {
            let context = page.store().context().await;
            let row = GridRow {
                id: record.id().to_string(),
                cells: record.cells(&context),
            };
            print!("{}", render_table(E::columns(), slice::from_ref(&row)));
            Ok(())
        }
        Err(FormError::Validation(errors)) => {
            eprint!("{}", render_validation(&errors));
            bail!("form has invalid fields")
        }
        Err(err) => Err(err.into()),
    }
}

async fn confirm_delete(console: &AdminConsole<HttpGateway>, assume_yes: bool) -> Result<()> {
    let dialog = console.dialog();
    let DialogState::Open(view) = dialog.state().await else {
        bail!("no deletion is pending");
    };

    let confirmed = assume_yes
        || tokio::task::spawn_blocking(move || ask_confirmation(&view.title, &view.message))
            .await
            .context("confirmation prompt panicked")??;
    if !confirmed {
        dialog.cancel().await;
        println!("cancelled");
        return Ok(());
    }

    match dialog.confirm().await {
        ConfirmOutcome::Completed => Ok(()),
        ConfirmOutcome::Failed(err) => Err(err.into()),
        ConfirmOutcome::NotOpen | ConfirmOutcome::InFlight => bail!("no deletion is pending"),
    }
}
