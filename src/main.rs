use clap::Parser;
use lockbox::cli::commands::{add::AddArgs, generate::GenerateArgs};
use lockbox::cli::{commands, Cli, Commands};
use lockbox::errors::Result;
use lockbox::vault::{EntryPatch, SecretText};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Create { ref name } => commands::create::execute(&cli, name),
        Commands::Vaults => commands::vaults::execute(&cli),
        Commands::Rename {
            ref old_name,
            ref new_name,
        } => commands::rename::execute(&cli, old_name, new_name),
        Commands::Remove { ref name, force } => commands::remove::execute(&cli, name, force),
        Commands::Backup {
            ref name,
            ref destination,
        } => commands::backup::execute(&cli, name, destination),
        Commands::Restore {
            ref backup,
            ref name,
        } => commands::restore::execute(&cli, backup, name),
        Commands::Add {
            ref vault,
            ref service,
            ref username,
            ref password,
            ref url,
            ref notes,
            generate,
            length,
        } => commands::add::execute(
            &cli,
            vault,
            AddArgs {
                service,
                username,
                password: password.as_deref(),
                url,
                notes,
                generate,
                length,
            },
        ),
        Commands::Get { ref vault, id, show } => commands::get::execute(&cli, vault, id, show),
        Commands::List {
            ref vault,
            ref search,
        } => commands::list::execute(&cli, vault, search.as_deref()),
        Commands::Update {
            ref vault,
            id,
            ref service,
            ref username,
            ref password,
            ref url,
            ref notes,
            generate,
        } => {
            let patch = EntryPatch {
                service: service.clone(),
                username: username.clone(),
                password: password.as_deref().map(SecretText::new),
                url: url.clone(),
                notes: notes.clone(),
            };
            commands::update::execute(&cli, vault, id, patch, generate)
        }
        Commands::Delete {
            ref vault,
            id,
            force,
        } => commands::delete::execute(&cli, vault, id, force),
        Commands::Passwd { ref vault } => commands::passwd::execute(&cli, vault),
        Commands::Stats { ref vault } => commands::stats::execute(&cli, vault),
        Commands::Export {
            ref vault,
            ref output,
        } => commands::export::execute(&cli, vault, output.as_deref()),
        Commands::Import {
            ref vault,
            ref file,
            ref policy,
        } => commands::import_cmd::execute(&cli, vault, file, policy),
        Commands::Generate {
            length,
            no_uppercase,
            no_digits,
            no_symbols,
        } => commands::generate::execute(
            &cli,
            &GenerateArgs {
                length,
                no_uppercase,
                no_digits,
                no_symbols,
            },
        ),
        Commands::Audit { last, ref since } => run_audit(&cli, last, since.as_deref()),
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        lockbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `LOCKBOX_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOCKBOX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "audit-log")]
fn run_audit(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    commands::audit_cmd::execute(cli, last, since)
}

#[cfg(not(feature = "audit-log"))]
fn run_audit(_cli: &Cli, _last: usize, _since: Option<&str>) -> Result<()> {
    Err(lockbox::errors::LockboxError::AuditError(
        "this build was compiled without the audit-log feature".into(),
    ))
}
