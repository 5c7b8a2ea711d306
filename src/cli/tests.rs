use super::*;
use std::fs;
use tempfile::TempDir;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }

    pub(super) fn words(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    pub(super) fn config_in(dir: &TempDir) -> PathBuf {
        dir.path().join("config.toml")
    }
}

use test_helpers::{config_in, parse_args, words};

#[test]
fn no_subcommand_defaults_to_chat() {
    let args = parse_args(&["vastuchat"]);
    assert!(args.command.is_none());
    assert!(args.model.is_none());
    assert!(args.dialect.is_none());
}

#[test]
fn say_collects_prompt_words_and_global_flags() {
    let argv = [
        "vastuchat",
        "--model",
        "qwen2.5",
        "-d",
        "sse",
        "say",
        "3BHK",
        "30x40",
        "--east-facing",
    ];
    let args = parse_args(&argv);
    let overrides = args.overrides();
    assert_eq!(overrides.model.as_deref(), Some("qwen2.5"));
    assert_eq!(overrides.dialect, Some(Dialect::EventStream));
    match args.command {
        Some(Commands::Say { prompt }) => {
            assert_eq!(prompt, words(&["3BHK", "30x40", "--east-facing"]))
        }
        _ => panic!("expected say subcommand for argv={argv:?}"),
    }
}

#[test]
fn unknown_dialect_flag_is_rejected() {
    assert!(Args::try_parse_from(["vastuchat", "--dialect", "xml", "chat"]).is_err());
}

#[test]
fn validate_takes_a_path() {
    let args = parse_args(&["vastuchat", "validate", "plan.json", "-e", "http://gpu:8080"]);
    assert_eq!(args.endpoint.as_deref(), Some("http://gpu:8080"));
    match args.command {
        Some(Commands::Validate { path }) => assert_eq!(path, PathBuf::from("plan.json")),
        _ => panic!("expected validate subcommand"),
    }
}

#[test]
fn set_and_unset_round_trip_through_the_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_in(&temp_dir);

    let message = set_value("endpoint", &words(&["https://api.example.com/v1/"]), &config_path)
        .expect("set endpoint");
    assert_eq!(message, "✅ Set endpoint to: https://api.example.com/v1");
    set_value("stall_timeout_secs", &words(&["0"]), &config_path).expect("set stall");
    set_value("fallback-enabled", &words(&["yes"]), &config_path).expect("set fallback");
    set_value("dialect", &words(&["ndjson"]), &config_path).expect("set dialect");

    let config = Config::load_from_path(&config_path).expect("load");
    assert_eq!(config.endpoint.as_deref(), Some("https://api.example.com/v1"));
    assert_eq!(config.stall_timeout_secs, Some(0));
    assert_eq!(config.fallback_enabled, Some(true));
    assert_eq!(config.dialect, Some(Dialect::Ndjson));

    let message = unset_value("dialect", &config_path).expect("unset dialect");
    assert_eq!(
        message,
        "✅ Unset dialect (will use default: inferred, currently event-stream)"
    );
    let config = Config::load_from_path(&config_path).expect("reload");
    assert_eq!(config.dialect, None);
    assert_eq!(config.fallback_enabled, Some(true));
}

#[test]
fn invalid_values_leave_the_file_alone() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_in(&temp_dir);

    assert!(matches!(
        set_value("backend-url", &words(&["ftp://plans"]), &config_path),
        Err(SettingError::InvalidValue { key: "backend-url", .. })
    ));
    assert!(matches!(
        set_value("fallback-enabled", &words(&["maybe"]), &config_path),
        Err(SettingError::InvalidBoolean(_))
    ));
    assert!(matches!(
        set_value("fallback-timeout-secs", &words(&["0"]), &config_path),
        Err(SettingError::InvalidValue { .. })
    ));
    assert!(matches!(
        set_value("dialect", &words(&["xml"]), &config_path),
        Err(SettingError::InvalidValue { .. })
    ));
    let missing = set_value("model", &[], &config_path).expect_err("missing value");
    assert_eq!(missing.exit_code(), 2);
    assert!(matches!(
        set_value("theme", &words(&["dark"]), &config_path),
        Err(SettingError::UnknownKey(_))
    ));

    assert!(!config_path.exists());
}

#[test]
fn describe_config_lists_every_key_in_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = config_in(&temp_dir);
    fs::write(
        &config_path,
        "model = \"qwen2.5\"\nfallback_timeout_secs = 15\n",
    )
    .expect("write config");
    let config = Config::load_from_path(&config_path).expect("load");

    let lines = describe_config(&config, &config_path);
    assert!(lines[0].starts_with("Current configuration ("));
    assert_eq!(
        &lines[1..8],
        &[
            "  endpoint: (unset, default: http://localhost:11434)".to_string(),
            "  model: qwen2.5".to_string(),
            "  dialect: (unset, inferred: ndjson)".to_string(),
            "  backend-url: (unset, default: http://localhost:8000)".to_string(),
            "  stall-timeout-secs: (unset, default: 30s)".to_string(),
            "  fallback-enabled: (unset, default: off)".to_string(),
            "  fallback-timeout-secs: 15s".to_string(),
        ]
    );
    assert!(lines[8].starts_with("  VASTUCHAT_API_KEY: ("));
}
