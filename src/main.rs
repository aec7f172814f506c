//! shell-socket binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use shell_socket::api::{serve, AppState};
use shell_socket::cli;
use shell_socket::config::Config;
use shell_socket::security::{AuthCache, Gatekeeper, StaticPasswordVerifier};
use shell_socket::{logging, ShellEnv, ShellSocketError, WorkingDirectory};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'shell-socket --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if let ShellSocketError::PortPermissionDenied(port) = e {
                if port <= 1024 {
                    error!("ports up to 1024 usually require elevated privileges; try a higher port");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> shell_socket::Result<()> {
    if let Err(e) = logging::init_with_level(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    info!("shell-socket v{}", env!("CARGO_PKG_VERSION"));

    let server_config = config
        .to_server_config()
        .map_err(|e| ShellSocketError::Config(e.to_string()))?;

    let cwd = WorkingDirectory::from_process()?.with_prompt_suffix(&config.shell.prompt_suffix);
    let home = config.home_dir(&cwd.get());
    let executor = config.executor();
    info!(
        cwd = %cwd.get().display(),
        home = %home.display(),
        shell = executor.program(),
        "shell environment ready"
    );

    let mut state = AppState::new(ShellEnv::new(cwd, home, executor));

    let auth = config.auth_config();
    match config.password() {
        Some(password) if auth.enabled => {
            info!(user = %auth.user, "authentication enabled");
            let gate = Gatekeeper::new(
                auth,
                Arc::new(StaticPasswordVerifier::new(password)),
                Arc::new(AuthCache::default()),
            );
            state = state.with_gatekeeper(Arc::new(gate));
        }
        _ => warn!("authentication disabled, anyone who can reach the port gets a shell"),
    }

    serve(server_config, state).await
}
