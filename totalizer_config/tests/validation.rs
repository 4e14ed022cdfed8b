use rstest::rstest;
use totalizer_config::{TotalMode, load_toml};

const BASE: &str = r#"
[store]
path = "totals.toml"

[[channel]]
capacity = 500.0
mode = "auto-normal"
rise_pct = 2.0
drop_pct = 1.0
min_stable_ms = 300

[channel.sensor]
decimals = 1
increment = 0.5
sample_rate_hz = 10
"#;

#[test]
fn accepts_minimal_channel() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    let ch = &cfg.channels[0];
    assert_eq!(ch.mode, TotalMode::AutoNormal);
    assert_eq!(ch.pending_ms, 1000, "default pending window");
    assert_eq!(ch.sensor.interval_ms(), 100);
}

#[test]
fn zero_percent_thresholds_are_valid() {
    let toml = r#"
[[channel]]
capacity = 100.0
mode = "auto-load"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("0% self-heals, not an error");
    assert_eq!(cfg.store.path, "totals.toml");
}

#[test]
fn rejects_missing_channels() {
    let cfg = load_toml("[store]\npath = \"t.toml\"\n").expect("parse TOML");
    let err = cfg.validate().expect_err("no channels");
    assert!(format!("{err}").contains("at least one [[channel]]"));
}

#[rstest]
#[case("capacity = 500.0", "capacity = 0.0", "capacity must be > 0")]
#[case("drop_pct = 1.0", "drop_pct = 5.0", "drop_pct must not exceed rise_pct")]
#[case("rise_pct = 2.0", "rise_pct = 150.0", "rise_pct must be in [0.0, 100.0]")]
#[case("sample_rate_hz = 10", "sample_rate_hz = 0", "sensor.sample_rate_hz must be > 0")]
#[case("increment = 0.5", "increment = 0.0", "sensor.increment must be > 0")]
#[case("min_stable_ms = 300", "min_stable_ms = 400000", "min_stable_ms is unreasonably large")]
fn rejects_bad_channel_fields(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let toml = BASE.replace(from, to);
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}");
    assert!(msg.contains("channel[0]."), "missing channel prefix: {msg}");
    assert!(msg.contains(needle), "unexpected error: {msg}");
}

#[test]
fn on_accept_requires_a_window() {
    let toml = r#"
[[channel]]
capacity = 100.0
mode = "on-accept"
accept_lower = 20.0
accept_upper = 10.0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("inverted window");
    assert!(format!("{err}").contains("accept_upper must be >= accept_lower"));

    let ok = toml.replace("accept_upper = 10.0", "accept_upper = 30.0");
    load_toml(&ok).unwrap().validate().expect("window ok");
}

#[rstest]
#[case("0.0")]
#[case("1.0")]
#[case("2.0")]
fn on_accept_window_must_clear_drop_threshold(#[case] lower: &str) {
    // drop 2 % of 100 = 2.0; a window reaching down to it would re-arm on the
    // load it just counted.
    let toml = format!(
        "[[channel]]\ncapacity = 100.0\nmode = \"on-accept\"\nrise_pct = 5.0\ndrop_pct = 2.0\naccept_lower = {lower}\naccept_upper = 30.0\n"
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("window overlaps drop band");
    assert!(format!("{err}").contains("accept_lower must exceed the drop threshold"));
}

#[test]
fn rejects_unknown_rotation() {
    let toml = format!("{BASE}\n[logging]\nrotation = \"weekly\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("bad rotation");
    assert!(format!("{err}").contains("logging.rotation"));
}

#[test]
fn unknown_mode_fails_to_parse() {
    let toml = BASE.replace("auto-normal", "sometimes");
    assert!(load_toml(&toml).is_err());
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/totalizer.toml")).expect("parse sample");
    cfg.validate().expect("sample config validates");
    assert_eq!(cfg.channels.len(), 2);
    assert_eq!(cfg.channels[1].mode, TotalMode::OnAccept);
    assert_eq!(cfg.channels[1].sensor.interval_ms(), 50);
}
