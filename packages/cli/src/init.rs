use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::Args;
use common::Capability;
use console::style;
use dialoguer::{Confirm, Input, Password};
use pixur_server::config::{AppConfig, CONFIG_FILE};
use pixur_server::database::init_db;
use pixur_server::state::AppState;
use pixur_server::tasks::{CreateUserTask, TaskContext};
use rand::RngCore;

#[derive(Args)]
pub struct InitArgs {
    /// Directory the server runs from; the config lands in its `config/` folder
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Accept every default and skip creating an administrator
    #[arg(short, long)]
    pub yes: bool,
}

struct Admin {
    ident: String,
    secret: String,
}

pub async fn run(args: InitArgs) -> anyhow::Result<()> {
    let path = config_path(&args.dir);
    if path.exists() && !args.force {
        bail!("{} already exists, pass --force to overwrite it", path.display());
    }

    let mut config = AppConfig::defaults().context("Can't build default config")?;
    config.backend.token_secret = generate_secret();
    let admin = if args.yes {
        None
    } else {
        prompt(&mut config)?
    };

    write_config(&path, &config, args.force)?;
    println!("{} Wrote {}", style("✔").green(), style(path.display()).bold());

    if let Some(admin) = admin {
        let user_id = create_admin(&config, &admin.ident, &admin.secret).await?;
        println!(
            "{} Created administrator {} ({})",
            style("✔").green(),
            style(&admin.ident).bold(),
            common::Varint(user_id).encode()
        );
    }
    Ok(())
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join(format!("{CONFIG_FILE}.toml"))
}

/// 32 random bytes, hex encoded.
fn generate_secret() -> String {
    let mut raw = [0u8; 32];
    rand::rng().fill_bytes(&mut raw);
    hex::encode(raw)
}

/// Ask for the deployment settings, then whether to bootstrap an administrator.
fn prompt(config: &mut AppConfig) -> anyhow::Result<Option<Admin>> {
    config.database.url = Input::new()
        .with_prompt("Database URL")
        .default(config.database.url.clone())
        .interact_text()?;
    config.server.host = Input::new()
        .with_prompt("Listen host")
        .default(config.server.host.clone())
        .interact_text()?;
    config.server.port = Input::new()
        .with_prompt("Listen port")
        .default(config.server.port)
        .interact_text()?;
    let pix: String = Input::new()
        .with_prompt("Pix directory")
        .default(config.backend.pix_path.display().to_string())
        .interact_text()?;
    config.backend.pix_path = PathBuf::from(pix);
    config.server.http_root = Input::new()
        .with_prompt("HTTP root")
        .default(config.server.http_root.clone())
        .interact_text()?;
    config.server.insecure_cookies = Confirm::new()
        .with_prompt("Serve cookies over plain HTTP?")
        .default(false)
        .interact()?;

    let create = Confirm::new()
        .with_prompt("Create the database schema and an administrator now?")
        .default(true)
        .interact()?;
    if !create {
        return Ok(None);
    }
    let ident = Input::new().with_prompt("Administrator ident").interact_text()?;
    let secret = Password::new()
        .with_prompt("Administrator secret")
        .with_confirmation("Repeat secret", "Secrets don't match")
        .interact()?;
    Ok(Some(Admin { ident, secret }))
}

fn write_config(path: &Path, config: &AppConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, pass --force to overwrite it", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Can't create {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("Can't serialize config")?;
    fs::write(path, text).with_context(|| format!("Can't write {}", path.display()))
}

/// Copy of `config` that lets anonymous callers sign up.
fn bootstrap_config(config: &AppConfig) -> AppConfig {
    let mut boot = config.clone();
    if !boot.backend.anonymous_capability.contains(&Capability::UserCreate) {
        boot.backend.anonymous_capability.push(Capability::UserCreate);
    }
    boot
}

async fn create_admin(config: &AppConfig, ident: &str, secret: &str) -> anyhow::Result<i64> {
    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    let state = AppState::new(bootstrap_config(config), db);

    let mut task = CreateUserTask::new(state.deps.clone(), ident, secret);
    task.capability = Some(Capability::admin_set());
    state
        .run(&TaskContext::anonymous(), &mut task)
        .await
        .map_err(|e| anyhow!("Can't create administrator: {}", e.0))?;
    let user = task
        .created_user
        .ok_or_else(|| anyhow!("Can't create administrator: no user returned"))?;
    Ok(user.user_id)
}
