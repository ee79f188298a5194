use super::*;

// =============================================================================
// env_bool: unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on"].iter().enumerate() {
        let key = format!("__HS_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__HS_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_whitespace_and_case() {
    let key = "__HS_EB_WS_311__";
    unsafe { std::env::set_var(key, "  TRUE ") };
    assert_eq!(env_bool(key), Some(true));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__HS_EB_INVALID_312__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__HS_EB_SURELY_UNSET_313__"), None);
}

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_reads_value() {
    let key = "__HS_EP_VALUE_401__";
    unsafe { std::env::set_var(key, "42") };
    assert_eq!(env_parse::<u32>(key, 5), 42);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let key = "__HS_EP_GARBAGE_402__";
    unsafe { std::env::set_var(key, "forty-two") };
    assert_eq!(env_parse::<u32>(key, 5), 5);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_parse::<u64>("__HS_EP_UNSET_403__", 600), 600);
}

// =============================================================================
// parse_port / parse_session_backend
// =============================================================================

#[test]
fn parse_port_accepts_numbers() {
    assert_eq!(parse_port("8080").unwrap(), 8080);
    assert_eq!(parse_port(" 3000 ").unwrap(), 3000);
}

#[test]
fn parse_port_rejects_garbage() {
    let err = parse_port("http").unwrap_err();
    assert!(err.to_string().contains("PORT"));
    assert!(parse_port("70000").is_err());
}

#[test]
fn session_backend_defaults_to_postgres() {
    assert_eq!(parse_session_backend(None).unwrap(), SessionBackend::Postgres);
    assert_eq!(parse_session_backend(Some("")).unwrap(), SessionBackend::Postgres);
    assert_eq!(parse_session_backend(Some("Postgres")).unwrap(), SessionBackend::Postgres);
}

#[test]
fn session_backend_memory() {
    assert_eq!(parse_session_backend(Some("memory")).unwrap(), SessionBackend::Memory);
}

#[test]
fn session_backend_unknown_is_error() {
    assert!(parse_session_backend(Some("mongo")).is_err());
}
