use std::sync::Mutex;

use tempfile::NamedTempFile;

use sentinel::config::SentinelConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SENTINEL_CONFIG",
        "SENTINEL_DEVICE",
        "SENTINEL_BASE_PATH",
        "SENTINEL_SMTP_PASSWORD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SentinelConfig::load(None).expect("load config");

    assert_eq!(cfg.device, "stub://camera");
    assert!(cfg.display);
    assert_eq!(cfg.framerate, 10);
    assert_eq!(cfg.delta_threshold, 5);
    assert_eq!(cfg.min_area, 5000);
    assert_eq!(cfg.smoothing, 0.5);
    assert_eq!(cfg.min_interval.as_secs(), 10);
    assert_eq!(cfg.image_ext, "png");
    assert!(!cfg.email.enabled);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "device": "/dev/video2",
        "display": false,
        "framerate": 15,
        "width": 800,
        "height": 600,
        "delta_threshold": 12,
        "min_area": 2500,
        "smoothing": 0.25,
        "min_interval": 5.0,
        "base_path": "/var/lib/sentinel",
        "image_ext": "jpg",
        "annotate": false,
        "warmup_frames": 10,
        "email": {
            "enabled": true,
            "from": "cam@example.com",
            "password": "file-secret",
            "host": "smtp.example.com",
            "port": 587,
            "to": "owner@example.com",
            "interval": 30.0
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTINEL_CONFIG", file.path());
    std::env::set_var("SENTINEL_DEVICE", "stub://override");
    std::env::set_var("SENTINEL_SMTP_PASSWORD", "env-secret");

    let cfg = SentinelConfig::load(None).expect("load config");

    assert_eq!(cfg.device, "stub://override");
    assert!(!cfg.display);
    assert_eq!(cfg.framerate, 15);
    assert_eq!(cfg.width, 800);
    assert_eq!(cfg.height, 600);
    assert_eq!(cfg.delta_threshold, 12);
    assert_eq!(cfg.min_area, 2500);
    assert_eq!(cfg.smoothing, 0.25);
    assert_eq!(cfg.min_interval.as_secs_f64(), 5.0);
    assert_eq!(cfg.base_path, std::path::PathBuf::from("/var/lib/sentinel"));
    assert_eq!(cfg.image_ext, "jpg");
    assert!(!cfg.annotate);
    assert_eq!(cfg.warmup_frames, 10);
    assert!(cfg.email.enabled);
    assert_eq!(cfg.email.from, "cam@example.com");
    assert_eq!(cfg.email.password, "env-secret");
    assert_eq!(cfg.email.host, "smtp.example.com");
    assert_eq!(cfg.email.port, 587);
    assert_eq!(cfg.email.to, "owner@example.com");
    assert_eq!(cfg.email.interval.as_secs(), 30);

    clear_env();
}

#[test]
fn explicit_path_beats_the_env_var() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut env_file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut env_file, br#"{"framerate": 1}"#).expect("write");
    let mut arg_file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut arg_file, br#"{"framerate": 30}"#).expect("write");

    std::env::set_var("SENTINEL_CONFIG", env_file.path());
    let cfg = SentinelConfig::load(Some(arg_file.path())).expect("load config");
    assert_eq!(cfg.framerate, 30);

    clear_env();
}

#[test]
fn invalid_smoothing_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"smoothing": 0.0}"#).expect("write");

    let err = SentinelConfig::load(Some(file.path())).expect_err("must reject");
    assert!(err.to_string().contains("smoothing"));

    clear_env();
}

#[test]
fn enabled_email_requires_addresses_and_host() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(
        &mut file,
        br#"{"email": {"enabled": true, "from": "cam@example.com"}}"#,
    )
    .expect("write");

    let err = SentinelConfig::load(Some(file.path())).expect_err("must reject");
    assert!(err.to_string().contains("email."));

    clear_env();
}

#[test]
fn negative_intervals_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"min_interval": -1.0}"#).expect("write");

    let err = SentinelConfig::load(Some(file.path())).expect_err("must reject");
    assert!(err.to_string().contains("min_interval"));

    clear_env();
}
