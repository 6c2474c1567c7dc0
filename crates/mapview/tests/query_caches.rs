use mapview::{
    Error, ErrorKind, ErrorOrigin,
    core::{
        cache::{ExpressionKeyParts, KeyError},
        error::InternalError,
    },
    prelude::*,
};
use std::sync::Arc;

type Caches = QueryCaches<String, String, String>;

fn caches(source: &str) -> Caches {
    let config = CacheConfig::from_toml_str(source).expect("valid config");

    QueryCaches::with_sink(&config, Arc::new(mapview::core::obs::NoopMetricsSink))
}

fn customer_query(text: &str) -> CacheKey {
    let shape = ParameterShape::from_pairs([("id", "Int32")]).expect("valid shape");

    CacheKey::command(CommandKind::Text, text, &shape).expect("valid key")
}

#[test]
fn plans_default_to_first_writer_wins() {
    let caches = caches("");
    let text = "SELECT VALUE c FROM Customers AS c WHERE c.Id = @id";

    let first = caches
        .plans()
        .store(customer_query(text), "plan-a".to_string());
    let second = caches
        .plans()
        .store(customer_query(text), "plan-b".to_string());

    assert_eq!(*first, "plan-a");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(
        caches.plans().lookup(&customer_query(text)).as_deref(),
        Some(&"plan-a".to_string())
    );
}

#[test]
fn templates_can_be_configured_last_writer_wins() {
    let caches = caches("[templates]\nfill_policy = \"last_writer_wins\"\n");
    let key = || {
        CacheKey::expression(ExpressionKeyParts {
            fingerprint: "Where(Scan(Customers), Id = @id)".to_string(),
            parameters: ParameterShape::from_pairs([("id", "Int32")]).expect("valid shape"),
            result_type: "Customer".to_string(),
            ..ExpressionKeyParts::default()
        })
        .expect("valid key")
    };

    caches.templates().store(key(), "template-a".to_string());
    let latest = caches.templates().store(key(), "template-b".to_string());

    assert_eq!(*latest, "template-b");
    assert_eq!(caches.templates().policy(), FillPolicy::LastWriterWins);
    assert_eq!(caches.plans().policy(), FillPolicy::FirstWriterWins);
}

#[test]
fn command_text_is_compared_ordinally() {
    let caches = caches("");

    caches
        .plans()
        .store(customer_query("select 1"), "lower".to_string());

    assert!(caches.plans().lookup(&customer_query("SELECT 1")).is_none());
    assert!(caches.plans().lookup(&customer_query("select 1")).is_some());
}

#[test]
fn stores_are_independent() {
    let caches = caches("");
    let shaper = || CacheKey::shaper("Id,Name", MergeOption::NoTracking, false).expect("valid key");

    caches.shapers().store(shaper(), "shaper".to_string());

    assert!(caches.plans().is_empty());
    assert!(caches.templates().is_empty());
    assert_eq!(caches.shapers().len(), 1);

    let stats = caches.stats();
    assert_eq!(stats[2].0, StoreKind::Shaper);
    assert_eq!(stats[2].1.size, 1);

    caches.clear();
    assert!(caches.shapers().is_empty());
}

#[test]
fn bounded_plan_store_evicts_the_stalest_entry() {
    let caches = caches("[plans]\ncapacity = 2\n");

    caches.plans().store(customer_query("q1"), "1".to_string());
    caches.plans().store(customer_query("q2"), "2".to_string());
    assert!(caches.plans().lookup(&customer_query("q1")).is_some());

    caches.plans().store(customer_query("q3"), "3".to_string());

    assert_eq!(caches.plans().len(), 2);
    assert!(caches.plans().contains(&customer_query("q1")));
    assert!(!caches.plans().contains(&customer_query("q2")));
    assert!(caches.plans().contains(&customer_query("q3")));
}

#[test]
fn programmatic_config_matches_the_toml_form() {
    let config = CacheConfig {
        plans: StoreConfig::bounded(2, FillPolicy::FirstWriterWins),
        ..CacheConfig::default()
    };

    assert_eq!(
        CacheConfig::from_toml_str("[plans]\ncapacity = 2\n").expect("valid config"),
        config
    );
    assert!(config.validate().is_ok());

    let caches: Caches =
        QueryCaches::with_sink(&config, Arc::new(mapview::core::obs::NoopMetricsSink));
    caches.plans().store(customer_query("q1"), "1".to_string());
    caches.plans().store(customer_query("q2"), "2".to_string());
    caches.plans().store(customer_query("q3"), "3".to_string());

    assert_eq!(caches.plans().len(), 2);
}

#[test]
fn config_defects_map_to_the_config_kind() {
    let err = CacheConfig::from_toml_str("[plans]\ncapacity = 0\n").expect_err("zero capacity");
    let err = Error::from(InternalError::from(err));

    assert_eq!(err.kind, ErrorKind::Config);
    assert_eq!(err.origin, ErrorOrigin::Config);
    assert!(err.message.contains("plans"));
}

#[test]
fn key_defects_map_to_the_invalid_key_kind() {
    let err = CacheKey::command(CommandKind::Text, "", &ParameterShape::empty())
        .expect_err("empty text");
    assert_eq!(err, KeyError::EmptyQueryText);

    let err = Error::from(InternalError::from(err));

    assert_eq!(err.kind, ErrorKind::InvalidKey);
    assert_eq!(err.origin, ErrorOrigin::Key);
}
