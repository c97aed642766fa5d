use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Session;
use crate::domain::models::SessionList;
use crate::infrastructure::backends::BackendManager;

const BOOL_VALUES: [&str; 2] = ["true", "false"];

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

fn format_session(session: &Session, current: Option<&str>) -> String {
    let mut res = format!("- (ID: {}) {}", session.id, session.display_title());
    if session.is_temporary {
        res = format!("{res} [temporary]");
    }
    if current == Some(session.id.as_str()) {
        res = format!("{res} *");
    }

    return res;
}

async fn list_sessions() -> Result<SessionList> {
    let backend = BackendManager::get();
    backend.health_check().await?;
    return backend.list_sessions().await;
}

async fn print_sessions_list() -> Result<()> {
    let list = list_sessions().await?;
    if list.sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
        return Ok(());
    }

    let lines = list
        .sessions
        .iter()
        .map(|session| return format_session(session, list.current_session_id.as_deref()))
        .collect::<Vec<String>>();

    println!("{}", lines.join("\n"));
    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn select_session_interactive() -> Result<bool> {
    let list = list_sessions().await?;
    if list.sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
        return Ok(false);
    }

    let session_options = list
        .sessions
        .iter()
        .map(|session| return format_session(session, list.current_session_id.as_deref()))
        .collect::<Vec<String>>();

    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which session would you like to open?")
        .default(0)
        .items(&session_options)
        .interact_opt()?;

    if let Some(idx) = idx {
        Config::set(ConfigKey::SessionID, &list.sessions[idx].id);
        return Ok(true);
    }

    return Ok(false);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn arg_session_id() -> Arg {
    return clap::Arg::new("id")
        .short('i')
        .long("id")
        .help("Session ID")
        .num_args(1);
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Manage chat sessions stored by the chat server.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all sessions with their ids and titles."))
        .subcommand(
            Command::new("open")
                .about("Open a session by ID. Omit passing any session ID to load an interactive selection.")
                .arg(arg_session_id().required(false)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a session.")
                .arg(arg_session_id().required(true)),
        )
        .subcommand(
            Command::new("rename")
                .about("Rename a session.")
                .arg(arg_session_id().required(true))
                .arg(
                    clap::Arg::new("title")
                        .short('t')
                        .long("title")
                        .help("New title")
                        .num_args(1)
                        .required(true),
                ),
        );
}

fn arg_config(key: ConfigKey, help: &str) -> Arg {
    let env_name = format!("IDLECHAT_{}", key.to_string().replace('-', "_").to_uppercase());
    let default = Config::default(key);
    let help = if default.is_empty() {
        help.to_string()
    } else {
        format!("{help} [default: {default}]")
    };

    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env_name)
        .num_args(1)
        .help(help)
        .global(true);
}

fn arg_config_bool(key: ConfigKey, help: &str) -> Arg {
    return arg_config(key, help).value_parser(PossibleValuesParser::new(BOOL_VALUES));
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nBuilt: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_BUILD_DATE")
    );

    return Command::new("idlechat")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about("Start chatting in the current or a new session."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .subcommand(subcommand_sessions())
        .arg(
            arg_config(ConfigKey::ConfigFile, "Path to configuration file")
                .short('c')
        )
        .arg(arg_config(ConfigKey::ServerURL, "Base URL of the chat server.").short('u'))
        .arg(arg_config(
            ConfigKey::RequestTimeout,
            "Time to wait in milliseconds before timing out health and model status checks.",
        ))
        .arg(arg_config(
            ConfigKey::MaxFileBytes,
            "Largest number of bytes read from an attached file. Larger files are truncated.",
        ))
        .arg(arg_config_bool(
            ConfigKey::StreamReassemble,
            "Buffer stream frames split across network reads instead of dropping them.",
        ))
        .arg(arg_config(ConfigKey::SessionID, "Session to open on start."))
        .arg(arg_config(
            ConfigKey::Transcript,
            "Write an HTML transcript of the conversation to this path on exit.",
        ))
        .arg(arg_config(ConfigKey::MaxNewTokens, "Maximum number of tokens generated per reply."))
        .arg(arg_config(ConfigKey::Temperature, "Sampling temperature."))
        .arg(arg_config(ConfigKey::TopP, "Nucleus sampling probability mass."))
        .arg(arg_config(ConfigKey::TopK, "Number of highest probability tokens sampled from."))
        .arg(arg_config(
            ConfigKey::RepetitionPenalty,
            "Penalty applied to repeated tokens.",
        ))
        .arg(arg_config_bool(ConfigKey::DoSample, "Sample tokens instead of greedy decoding."))
        .arg(arg_config(
            ConfigKey::MaxHistoryTurns,
            "Number of previous turns sent along with a prompt.",
        ))
        .arg(arg_config(ConfigKey::SystemPrompt, "System prompt for every conversation."))
        .arg(arg_config_bool(
            ConfigKey::EnableThinking,
            "Let models that support it reason before answering.",
        ));
}

/// Parses the command line. Returns true when the chat loop should start.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
            return Ok(false);
        }
        Some(("sessions", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("list", list_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, list_matches]).await?;
                print_sessions_list().await?;
                return Ok(false);
            }
            Some(("open", open_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, open_matches]).await?;
                if let Some(session_id) = open_matches.get_one::<String>("id") {
                    Config::set(ConfigKey::SessionID, session_id);
                } else {
                    return select_session_interactive().await;
                }
            }
            Some(("delete", delete_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, delete_matches]).await?;
                if let Some(session_id) = delete_matches.get_one::<String>("id") {
                    BackendManager::get().delete_session(session_id).await?;
                    println!("Deleted session {session_id}");
                }
                return Ok(false);
            }
            Some(("rename", rename_matches)) => {
                Config::load(build(), vec![&matches, subcmd_matches, rename_matches]).await?;
                let session_id = rename_matches.get_one::<String>("id");
                let title = rename_matches.get_one::<String>("title");
                if let (Some(session_id), Some(title)) = (session_id, title) {
                    if title.trim().is_empty() {
                        bail!("Session titles cannot be empty");
                    }
                    BackendManager::get()
                        .rename_session(session_id, title.trim())
                        .await?;
                    println!("Renamed session {session_id}");
                }
                return Ok(false);
            }
            _ => {
                subcommand_sessions().print_long_help()?;
                return Ok(false);
            }
        },
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
