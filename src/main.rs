use clap::{Parser, Subcommand};

use commands::GlobalArgs;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    Markdown,
}

mod commands;
mod output;
mod tty;

use commands::{package, transfer};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "caddie")]
#[command(version = VERSION)]
#[command(about = "Run deployment tasks over SSH against role-tagged hosts")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send files to server and restart webserver
    Deploy,
    /// Pull files from git to server
    Pull,
    /// Migrate database
    #[command(name = "sync_migrate_db", visible_alias = "sync-migrate-db")]
    SyncMigrateDb,
    /// Restart webserver
    Restart,
    /// Install package into the project environment
    Install(package::PackageArgs),
    /// Remove package from the project environment
    Uninstall(package::PackageArgs),
    /// Collect static files
    Collectstatic,
    /// Clear the thumbnail key/value store
    #[command(name = "clear_thumbs", visible_alias = "clear-thumbs")]
    ClearThumbs,
    /// Generate a backup file with the configured backup command
    Makedump,
    /// Run mysqldump and download the result
    Getdump(transfer::GetdumpArgs),
    /// Download a file from the server
    Getfile(transfer::GetfileArgs),
    /// List available tasks
    List,
    /// Show configured roles and their hosts
    Roles,
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::List => ResponseMode::Markdown,
        _ => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = response_mode(&cli.command);

    if let ResponseMode::Markdown = mode {
        return match commands::run_markdown(cli.command, &cli.global) {
            Ok((content, exit_code)) => {
                print!("{}", content);
                std::process::ExitCode::from(exit_code_to_u8(exit_code))
            }
            Err(err) => {
                let exit_code = output::exit_code_for_error(err.code);
                let _ = output::print_result::<serde_json::Value>(Err(err));
                std::process::ExitCode::from(exit_code_to_u8(exit_code))
            }
        };
    }

    tty::status("caddie is working...");
    let (json_result, exit_code) = commands::run_json(cli.command, &cli.global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
