use nut_monitor::config::Config;

#[test]
fn test_config_load() {
    // This assumes config/Default.toml exists relative to where cargo test is run
    let config_res = Config::load("config/Default.toml");
    assert!(config_res.is_ok(), "Failed to load default config");
}

#[test]
fn test_shipped_config_validates() {
    let config = Config::load("config/Default.toml").expect("Failed to load default config");
    assert!(
        config.validate().is_ok(),
        "Shipped default config must pass validation"
    );
    assert!(!config.monitors.is_empty());
}
