mod common;
use common::TestEnv;

fn config_json(t: &TestEnv) -> serde_json::Value {
    let out = t
        .raw_bin()
        .args(["config", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn config_json_prints_paths() {
    let t = TestEnv::new();
    let v = config_json(&t);
    assert_eq!(v["storage"]["backend"], "memory");
    assert_eq!(v["collection"], "todos");
    let cfgdir = v["config_dir"].as_str().unwrap_or("");
    assert!(cfgdir.starts_with(t.cfg.to_str().unwrap()));
    assert!(cfgdir.contains("tudu"));
}

#[test]
fn token_is_redacted() {
    let t = TestEnv::new();
    t.write_settings(
        r#"
[storage]
backend = "rtdb"
url = "https://demo.firebaseio.com"
auth_token = "very-secret"
collection = "lists/home"
"#,
    );
    let v = config_json(&t);
    assert_eq!(v["storage"]["backend"], "rtdb");
    assert_eq!(v["storage"]["auth_token"], "***");
    assert_eq!(v["collection"], "lists/home");
    assert!(!v.to_string().contains("very-secret"));
}

#[test]
fn malformed_settings_fall_back_to_defaults() {
    let t = TestEnv::new();
    t.write_settings("this is = = not toml");
    let v = config_json(&t);
    assert_eq!(v["storage"]["backend"], "memory");
}

#[test]
fn collection_from_settings_is_used_by_memory_store() {
    let t = TestEnv::new();
    t.write_settings("[storage]\nbackend = \"memory\"\ncollection = \"groceries\"\n");
    t.raw_bin()
        .args(["--seed", "eggs", "list"])
        .assert()
        .success()
        .stdout(predicates::str::contains("eggs"));
}
