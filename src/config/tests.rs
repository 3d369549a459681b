use super::*;

#[test]
fn defaults_resolve_to_valid_settings() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.feed.page_size.get(), 6);
    assert_eq!(settings.feed.signal_buffer.get(), 16);
    assert_eq!(settings.operator.display_name, "Admin");
    assert!(settings.operator.operator().is_none());
    assert!(settings.database.url.is_none());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.feed.page_size = Some(10);
    raw.logging.level = Some("info".to_string());

    let overrides = Overrides {
        feed_page_size: Some(3),
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.feed.page_size.get(), 3);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.feed.page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero page size");
    assert!(matches!(err, LoadError::Invalid { key: "feed.page_size", .. }));
}

#[test]
fn change_topic_matches_the_posts_trigger() {
    let migration = include_str!("../../migrations/0001_posts.sql");
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    let topic = settings.feed.change_feed().topic;
    assert_eq!(topic, crate::changefeed::DEFAULT_TOPIC);
    assert!(
        migration.contains(&format!("pg_notify('{topic}'")),
        "trigger must notify on `{topic}`"
    );
}

#[test]
fn nil_operator_id_is_rejected() {
    let mut raw = RawSettings::default();
    raw.operator.id = Some(Uuid::nil());

    let err = Settings::from_raw(raw).expect_err("nil operator");
    assert!(matches!(err, LoadError::Invalid { key: "operator.id", .. }));
}

#[test]
fn operator_id_override_signs_the_operator_in() {
    let id = Uuid::new_v4();
    let mut raw = RawSettings::default();
    raw.apply_overrides(&Overrides {
        operator_id: Some(id),
        operator_name: Some("Alice".into()),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    let operator = settings.operator.operator().expect("operator configured");
    assert_eq!(operator.id, id);
    assert_eq!(operator.display_name, "Alice");
}

#[test]
fn relative_urls_are_rejected() {
    let mut raw = RawSettings::default();
    raw.feed.public_site_url = Some("/blog".into());

    let err = Settings::from_raw(raw).expect_err("relative url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "feed.public_site_url",
            ..
        }
    ));
}

#[test]
fn blank_database_url_counts_as_unset() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".into());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn change_feed_config_follows_feed_settings() {
    let mut raw = RawSettings::default();
    raw.feed.signal_buffer = Some(4);
    let settings = Settings::from_raw(raw).expect("valid settings");

    let config = settings.feed.change_feed();
    assert_eq!(config.topic, "posts_changed");
    assert_eq!(config.signal_buffer_non_zero().get(), 4);
}

#[test]
fn parse_create_arguments() {
    let args = CliArgs::parse_from([
        "pressroom",
        "create",
        "--title",
        "A",
        "--description",
        "d",
        "--content",
        "c",
        "--draft",
        "--database-url",
        "postgres://example",
    ]);

    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://example")
    );
    match args.command {
        Command::Create(create) => {
            assert_eq!(create.title, "A");
            assert!(create.draft);
            assert!(create.author.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_delete_and_feed_arguments() {
    let id = Uuid::new_v4();
    let args = CliArgs::parse_from(["pressroom", "delete", &id.to_string(), "--yes"]);
    match args.command {
        Command::Delete(delete) => {
            assert_eq!(delete.id, id);
            assert!(delete.yes);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let args = CliArgs::parse_from(["pressroom", "feed"]);
    match args.command {
        Command::Feed(feed) => {
            assert_eq!(feed.page, 1);
            assert!(!feed.output.json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
