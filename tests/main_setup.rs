use blade_admin::{AppConfig, config::{Env, normalize_base}};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: [&str; 11] = [
    "APP_ENV",
    "DATABASE_URL",
    "JWT_SECRET",
    "ADMIN_PASSWORD",
    "API_BASE",
    "TOKEN_EXPIRED",
    "COMPANY",
    "API_DOC",
    "URL_EXPIRED",
    "SERVER_PORT",
    "DB_MAX_CONNECTIONS",
];

// --- Setup/Teardown Utilities ---

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T, cleanup_vars: &[&'static str]) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    // Run the test
    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

fn clear_config_vars() {
    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // JWT_SECRET and ADMIN_PASSWORD are missing, so loading must panic.
    let result = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("DATABASE_URL", "sqlite::memory:");
            }
            panic::catch_unwind(AppConfig::load)
        },
        &CONFIG_VARS,
    );

    assert!(
        result.is_err(),
        "Production config loading should panic on missing secrets"
    );
}

#[test]
#[serial]
fn test_app_config_production_with_secrets() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("JWT_SECRET", "prod-secret");
                env::set_var("ADMIN_PASSWORD", "prod-admin");
            }
            AppConfig::load()
        },
        &CONFIG_VARS,
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.admin_password, "prod-admin");
    // Swagger UI is off in production unless asked for.
    assert!(!config.api_doc);
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    // Local mode should not panic, and should use hardcoded defaults
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "local");
            }
            AppConfig::load()
        },
        &CONFIG_VARS,
    );

    let defaults = AppConfig::default();
    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_url, defaults.db_url);
    assert_eq!(config.jwt_secret, defaults.jwt_secret);
    assert_eq!(config.api_base, "/api");
    assert_eq!(config.token_expired, 86400);
    assert_eq!(config.url_expired, 600);
    assert!(config.company.is_empty());
    assert!(config.api_doc);
    assert!(config.ignored.is_empty());
}

#[test]
#[serial]
fn test_app_config_overrides() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("API_BASE", "backend/");
                env::set_var("TOKEN_EXPIRED", "120");
                env::set_var("COMPANY", "corp.example");
                env::set_var("API_DOC", "false");
            }
            AppConfig::load()
        },
        &CONFIG_VARS,
    );

    assert_eq!(config.api_base, "/backend");
    assert_eq!(config.token_expired, 120);
    assert_eq!(config.company, "corp.example");
    assert!(!config.api_doc);
}

#[test]
#[serial]
fn test_unparsable_number_keeps_default() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("TOKEN_EXPIRED", "one day");
            }
            AppConfig::load()
        },
        &CONFIG_VARS,
    );

    assert_eq!(config.token_expired, AppConfig::default().token_expired);
    assert_eq!(config.ignored, vec![r#"TOKEN_EXPIRED="one day""#.to_string()]);
}

#[test]
fn test_normalize_base() {
    assert_eq!(normalize_base("api"), "/api");
    assert_eq!(normalize_base("/api/"), "/api");
    assert_eq!(normalize_base(" /"), "");
}
