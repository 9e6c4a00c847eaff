// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use painel_api::Client;
use painel_cli::config::Config;
use painel_cli::logging::{self, LogTarget};
use painel_cli::runtime::HttpRuntime;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `painel --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let target = if options.admin.is_some() || options.check_only {
        LogTarget::Stderr
    } else {
        LogTarget::File(config.log_file()?)
    };
    logging::init(config.log_level(), &target)?;

    let base_url = options.server.clone().unwrap_or_else(|| config.base_url());
    let client = Client::new(&base_url, config.timeout()?).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout or set PAINEL_BASE_URL",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    if let Some(command) = options.admin {
        let message = match command {
            AdminCommand::InitDb => client.initialize_database(),
            AdminCommand::Migrate => client.migrate_data(),
        }
        .with_context(|| format!("{} against {base_url}", command.label()))?;
        println!("{message}");
        return Ok(());
    }

    if let Err(error) = client.open_session() {
        tracing::warn!(%error, base_url = %base_url, "could not open a server session");
    }
    tracing::info!(base_url = %base_url, "starting dashboard");
    painel_tui::run_app(config.initial_state(), HttpRuntime::new(client))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminCommand {
    InitDb,
    Migrate,
}

impl AdminCommand {
    const fn label(self) -> &'static str {
        match self {
            Self::InitDb => "initialize database",
            Self::Migrate => "migrate data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    server: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    admin: Option<AdminCommand>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        server: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        admin: None,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--server" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--server requires a base URL"))?;
                options.server = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--init-db" | "--migrate" => {
                let command = if arg.as_ref() == "--init-db" {
                    AdminCommand::InitDb
                } else {
                    AdminCommand::Migrate
                };
                if options.admin.is_some_and(|existing| existing != command) {
                    return Err(anyhow::anyhow!(
                        "--init-db and --migrate cannot be combined; run them one at a time"
                    ));
                }
                options.admin = Some(command);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("painel: indicator dashboard client");
    println!("  --config <path>          Use a specific config path");
    println!("  --server <url>           Override the dashboard server base URL");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and server settings");
    println!("  --init-db                Ask the server to initialize its database");
    println!("  --migrate                Ask the server to migrate session data");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{AdminCommand, CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/painel-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                server: None,
                print_config_path: false,
                print_example: false,
                check_only: false,
                admin: None,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_and_server_overrides() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--config",
                "/custom/config.toml",
                "--server",
                "http://dash:5000",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(options.server.as_deref(), Some("http://dash:5000"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
        let error = parse_cli_args(vec!["--server"], default_options_path())
            .expect_err("missing server value should fail");
        assert!(error.to_string().contains("--server requires a base URL"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert_eq!(options.admin, None);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_picks_one_admin_command() -> Result<()> {
        let options = parse_cli_args(vec!["--init-db"], default_options_path())?;
        assert_eq!(options.admin, Some(AdminCommand::InitDb));
        let options = parse_cli_args(vec!["--migrate", "--migrate"], default_options_path())?;
        assert_eq!(options.admin, Some(AdminCommand::Migrate));

        let error = parse_cli_args(vec!["--init-db", "--migrate"], default_options_path())
            .expect_err("two admin commands should fail");
        assert!(error.to_string().contains("cannot be combined"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_accepts_short_help() -> Result<()> {
        let options = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(options.show_help);
        Ok(())
    }
}
