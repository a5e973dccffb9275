use super::*;

fn valid_config() -> Config {
    let mut cfg = Config::default();
    cfg.owner.id = "61578706761898".to_string();
    cfg.owner.secret = "s3cret".to_string();
    cfg
}

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.herald.prefix, "!");
    assert_eq!(cfg.guard.rate_limit, 10);
    assert_eq!(cfg.guard.rate_window_secs, 60);
    assert_eq!(cfg.guard.abuse_threshold, 3);
    assert_eq!(cfg.guard.abuse_window_secs, 3600);
    assert_eq!(cfg.broadcast.min_delay_ms, 300);
    assert_eq!(cfg.broadcast.max_delay_ms, 600);
    assert!(cfg.channel.telegram.is_none());
}

#[test]
fn test_parse_partial_toml() {
    let toml_str = r#"
        [herald]
        data_dir = "/tmp/herald"

        [owner]
        id = "61578706761898"
        secret = "abc"

        [guard]
        rate_limit = 5
        admins = ["100000000001"]

        [channel.telegram]
        enabled = true
        bot_token = "123:abc"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.herald.prefix, "!");
    assert_eq!(cfg.guard.rate_limit, 5);
    assert_eq!(cfg.guard.rate_window_secs, 60);
    assert_eq!(cfg.guard.admins, vec!["100000000001".to_string()]);
    assert!(cfg.channel.telegram.as_ref().unwrap().enabled);
    assert_eq!(cfg.lines_dir(), PathBuf::from("/tmp/herald/linesets"));
    assert_eq!(cfg.owner_record_path(), PathBuf::from("/tmp/herald/owner.lock"));
    assert!(cfg.validate().is_empty());
}

#[test]
fn test_explicit_lines_dir_wins() {
    let mut cfg = valid_config();
    cfg.broadcast.lines_dir = "/srv/lines".to_string();
    assert_eq!(cfg.lines_dir(), PathBuf::from("/srv/lines"));
}

#[test]
fn test_validate_reports_each_problem() {
    let mut cfg = valid_config();
    assert!(cfg.validate().is_empty());

    cfg.herald.prefix = "ab".to_string();
    cfg.owner.secret.clear();
    cfg.guard.admins = vec!["12".to_string()];
    cfg.broadcast.min_delay_ms = 900;

    let errors = cfg.validate();
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("prefix")));
    assert!(errors.iter().any(|e| e.contains("secret")));
    assert!(errors.iter().any(|e| e.contains("index 0")));
    assert!(errors.iter().any(|e| e.contains("min_delay_ms")));
}

#[test]
fn test_alphanumeric_prefix_rejected() {
    let mut cfg = valid_config();
    cfg.herald.prefix = "x".to_string();
    assert_eq!(cfg.validate().len(), 1);
    cfg.herald.prefix = "#".to_string();
    assert!(cfg.validate().is_empty());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__herald_config__.toml").unwrap();
    assert_eq!(cfg.herald.name, "Herald");
}

#[test]
fn test_load_invalid_toml_is_config_error() {
    let path = std::env::temp_dir().join(format!("__herald_bad_config_{}.toml", std::process::id()));
    std::fs::write(&path, "[herald\nname=").unwrap();
    let err = load(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, HeraldError::Config(_)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_shellexpand_leaves_absolute_paths() {
    assert_eq!(shellexpand("/var/lib/herald"), "/var/lib/herald");
}
