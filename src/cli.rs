//! Command-line interface for shell-socket.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Options left unset fall through to the environment, the config file
/// and the built-in defaults, in that order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Password for the `admin` user; enables authentication.
    pub password: Option<String>,
    /// Directory a bare `cd` returns to.
    pub home: Option<PathBuf>,
    /// Shell program used to run commands.
    pub shell: Option<String>,
    /// Try the following ports when the requested one is taken.
    pub find_next_port: bool,
    /// Disable authentication.
    pub no_auth: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('P') | Long("password") => {
                let value: String = parser.value()?.parse()?;
                if value.is_empty() {
                    return Err(ArgsError::InvalidValue("password", value));
                }
                result.password = Some(value);
            }
            Short('d') | Long("home") => {
                result.home = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("shell") => {
                result.shell = Some(parser.value()?.parse()?);
            }
            Long("find-next-port") => {
                result.find_next_port = true;
            }
            Long("no-auth") => {
                result.no_auth = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"shell-socket {version}
Interactive remote shell over WebSocket

USAGE:
    shell-socket [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 0.0.0.0]
    -p, --port <PORT>       Port to listen on [default: 8099]
    -c, --config <FILE>     Path to configuration file (JSON)
    -P, --password <PASS>   Password for user 'admin' (enables authentication)
    -d, --home <DIR>        Directory a bare 'cd' returns to
    -s, --shell <PROGRAM>   Shell used to run commands [default: sh]
        --find-next-port    Use the next free port if the requested one is taken
        --no-auth           Disable authentication
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SHELL_SOCKET_HOST       Host address (overrides config)
    SHELL_SOCKET_PORT       Port number (overrides config)
    SHELL_SOCKET_PASSWORD   Password (overrides config, enables authentication)
    SHELL_SOCKET_HOME       Home directory (overrides config)
    SHELL_SOCKET_LOG_LEVEL  Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Start with defaults (0.0.0.0:8099, no auth)
    shell-socket

    # Local only, with a password
    shell-socket -H 127.0.0.1 -P my-secret

    # Start with config file
    shell-socket -c /etc/shell-socket/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("shell-socket {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("shell-socket")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(result.password.is_none());
        assert!(!result.no_auth);
        assert!(!result.find_next_port);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "127.0.0.1", "-p", "8080"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "127.0.0.1");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_long_options() {
        let result = parse_args_from(args(&[
            "--host",
            "192.168.1.1",
            "--port",
            "9000",
            "--home",
            "/srv",
            "--shell",
            "bash",
        ]))
        .unwrap();
        assert_eq!(result.host.unwrap().to_string(), "192.168.1.1");
        assert_eq!(result.port, Some(9000));
        assert_eq!(result.home, Some(PathBuf::from("/srv")));
        assert_eq!(result.shell.as_deref(), Some("bash"));
    }

    #[test]
    fn test_password() {
        let result = parse_args_from(args(&["-P", "my-secret"])).unwrap();
        assert_eq!(result.password.as_deref(), Some("my-secret"));

        assert!(parse_args_from(args(&["--password", ""])).is_err());
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/config.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/config.json")));
    }

    #[test]
    fn test_flags() {
        let result = parse_args_from(args(&["--no-auth", "--find-next-port"])).unwrap();
        assert!(result.no_auth);
        assert!(result.find_next_port);
    }

    #[test]
    fn test_help_flag() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
    }

    #[test]
    fn test_version_flag() {
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
        assert!(parse_args_from(args(&["--version"])).unwrap().version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_args_from(args(&["-p", "invalid"])).is_err());
        assert!(parse_args_from(args(&["-p", "70000"])).is_err());
        assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
    }

    #[test]
    fn test_unexpected_argument() {
        let err = parse_args_from(args(&["stray"])).unwrap_err();
        assert_eq!(err.to_string(), "unexpected argument: 'stray'");
    }
}
