use super::*;
use crate::core::transport::TransportDescriptor;
use clap::CommandFactory;
use std::time::Duration;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }
}

use test_helpers::parse_args;

#[test]
fn no_subcommand_defaults_to_chat() {
    let args = parse_args(&["citychat"]);
    assert!(args.command.is_none());
    assert!(!args.verbose);
}

#[test]
fn say_collects_multi_word_prompt() {
    let argv = ["citychat", "say", "What", "time", "is", "it", "in", "New", "York?"];
    let args = parse_args(&argv);
    match args.command {
        Some(Commands::Say { prompt }) => {
            assert_eq!(prompt.join(" "), "What time is it in New York?");
        }
        _ => panic!("expected say subcommand for argv={argv:?}"),
    }
}

#[test]
fn global_flags_parse_after_subcommand() {
    let argv = [
        "citychat",
        "say",
        "-t",
        "buffered",
        "--history",
        "latest",
        "--timeout",
        "15",
        "hello",
    ];
    let args = parse_args(&argv);
    assert_eq!(args.transport, Some(TransportKind::Buffered));
    assert_eq!(args.history, Some(HistoryPolicy::LatestMessage));
    assert_eq!(args.timeout, Some(15));
}

#[test]
fn unknown_transport_is_rejected() {
    assert!(Args::try_parse_from(["citychat", "--transport", "carrier-pigeon"]).is_err());
}

#[test]
fn config_subcommands_parse() {
    let args = parse_args(&["citychat", "config", "init", "--force"]);
    assert!(matches!(
        args.command,
        Some(Commands::Config {
            command: Some(ConfigCommands::Init { force: true })
        })
    ));

    let args = parse_args(&["citychat", "config"]);
    assert!(matches!(
        args.command,
        Some(Commands::Config { command: None })
    ));
}

#[test]
fn flags_override_file_values() {
    let mut config: Config = toml::from_str(
        r#"
transport = "streaming"
endpoint = "http://file.example/api"
agent = "fileAgent"
"#,
    )
    .expect("config should parse");
    let args = parse_args(&[
        "citychat",
        "--transport",
        "buffered",
        "--endpoint",
        "http://flag.example/api/",
        "--timeout",
        "5",
    ]);

    args.apply_overrides(&mut config);

    assert_eq!(config.transport_kind(), TransportKind::Buffered);
    assert_eq!(config.agent_name(), "fileAgent");
    assert_eq!(
        config.timeout_for(TransportKind::Buffered),
        Duration::from_secs(5)
    );
    assert_eq!(
        config.timeout_for(TransportKind::Streaming),
        Duration::from_secs(120)
    );
    match config.transport().expect("valid transport") {
        TransportDescriptor::BufferedRequest(target) => {
            assert_eq!(target.endpoint, "http://flag.example/api");
        }
        other => panic!("expected buffered transport, got {other:?}"),
    }
}

#[test]
fn help_lists_every_example_prompt() {
    let help = Args::command().render_long_help().to_string();
    for prompt in EXAMPLE_PROMPTS {
        assert!(help.contains(prompt), "missing example prompt: {prompt}");
    }
}

#[test]
fn build_session_starts_an_empty_conversation() {
    let config = Config {
        thread_prefix: Some("cli-test".to_string()),
        ..Default::default()
    };

    let session = build_session(&config, None).expect("session should build");

    assert!(session.conversation().is_empty());
    assert!(session.conversation().thread_id().starts_with("cli-test-"));
    assert_eq!(session.transport().name(), "streaming");
    assert_eq!(session.timeout(), Duration::from_secs(120));
    assert!(!session.transcript().is_active());
}
