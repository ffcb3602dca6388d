use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_listing_cache_windows() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.cache.backend, CacheBackendSetting::Memory);
    assert_eq!(settings.cache.aggregate_ttl, Duration::from_secs(3600));
    assert_eq!(settings.cache.response_ttl, Duration::from_secs(900));
    assert!(settings.cache.enable_response_cache);
    assert_eq!(settings.cache.memory_max_entries.get(), 1024);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw.clone()).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.redis_url",
            ..
        }
    ));

    raw.cache.redis_url = Some("redis://127.0.0.1:6379".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.backend, CacheBackendSetting::Redis);
}

#[test]
fn unknown_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.backend",
            ..
        }
    ));
}

#[test]
fn zero_aggregate_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.aggregate_ttl_seconds = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.memory_max_entries = Some(0);

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.memory_max_entries",
            ..
        }
    ));
}

#[test]
fn cache_overrides_apply_to_serve() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache: CacheOverrides {
            cache_backend: Some("redis".to_string()),
            cache_redis_url: Some("redis://cache:6379".to_string()),
        },
        cache_aggregate_ttl_seconds: Some(120),
        cache_enable_response_cache: Some(false),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.backend, CacheBackendSetting::Redis);
    assert_eq!(
        settings.cache.redis_url.as_deref(),
        Some("redis://cache:6379")
    );
    assert_eq!(settings.cache.aggregate_ttl, Duration::from_secs(120));
    assert!(!settings.cache.enable_response_cache);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["property-listings"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "property-listings",
        "migrate",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_metrics_arguments() {
    let args = CliArgs::parse_from([
        "property-listings",
        "metrics",
        "--cache-backend",
        "redis",
        "--cache-redis-url",
        "redis://cache:6379",
    ]);

    match args.command.expect("metrics command") {
        Command::Metrics(metrics) => {
            assert_eq!(metrics.cache.cache_backend.as_deref(), Some("redis"));
            assert_eq!(
                metrics.cache.cache_redis_url.as_deref(),
                Some("redis://cache:6379")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "property-listings",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--cache-backend",
        "memory",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.cache.cache_backend.as_deref(), Some("memory"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
#[serial_test::serial]
fn environment_overrides_apply_before_cli() {
    const TTL_VAR: &str = "PROPERTIES__CACHE__AGGREGATE_TTL_SECONDS";
    const PORT_VAR: &str = "PROPERTIES__SERVER__PORT";

    // SAFETY: no other test in this binary mutates the environment concurrently.
    unsafe {
        std::env::set_var(TTL_VAR, "120");
        std::env::set_var(PORT_VAR, "5000");
    }

    let args = CliArgs::parse_from(["property-listings", "serve", "--server-port", "5100"]);
    let result = load(&args);

    unsafe {
        std::env::remove_var(TTL_VAR);
        std::env::remove_var(PORT_VAR);
    }

    let settings = result.expect("valid settings");
    assert_eq!(settings.cache.aggregate_ttl, Duration::from_secs(120));
    assert_eq!(settings.server.addr.port(), 5100);
}
