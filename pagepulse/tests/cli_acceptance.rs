use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, content: &str) {
        let dir = self.xdg_config.join("pagepulse");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), content).expect("failed to write config");
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("pagepulse"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute pagepulse: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "pagepulse {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        output.status,
        stdout,
        stderr
    );
}

#[test]
fn classify_reports_device_browser_and_bot_verdict() {
    let env = CliTestEnv::new();
    let args = [
        "classify",
        "Mozilla/5.0 (Linux; Android 10; SM-T510) AppleWebKit/537.36 Chrome/120.0 Safari/537.36",
    ];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Device:   Tablet"), "got:\n{stdout}");
    assert!(stdout.contains("Browser:  Chrome"), "got:\n{stdout}");
    assert!(stdout.contains("Bot:      no"), "got:\n{stdout}");
}

#[test]
fn classify_flags_crawlers() {
    let env = CliTestEnv::new();
    let args = ["classify", "Mozilla/5.0 (compatible; Googlebot/2.1)"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Bot:      yes"), "got:\n{stdout}");
}

#[test]
fn status_shows_defaults_without_config_file() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Environment:     production"));
    assert!(stdout.contains("Relay URL:       https://user-events-api.azurewebsites.net/api/UserEvents"));
    assert!(stdout.contains("Organization:    Devfinity"));
    assert!(stdout.contains("Mode:            await"));
    assert!(stdout.contains("Client Endpoint: /tracker/v1/log/"));
    assert!(stdout.contains("Status: Ready to relay"));
}

#[test]
fn status_reads_config_file() {
    let env = CliTestEnv::new();
    env.write_config(
        r#"
[tracking]
environment = "staging"
enabled = false

[relay]
url = "http://127.0.0.1:9/events"
organization = "Acme"
api_key = "secret"
mode = "detached"
"#,
    );

    let output = run_bin(&env, &["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Environment:     staging"));
    assert!(stdout.contains("Identity:        off"));
    assert!(stdout.contains("Organization:    Acme"));
    assert!(stdout.contains("API Key:         <set>"));
    assert!(!stdout.contains("secret"));
    assert!(stdout.contains("Mode:            detached"));
}

#[test]
fn status_rejects_invalid_config() {
    let env = CliTestEnv::new();
    env.write_config(
        r#"
[relay]
timeout_secs = 0
"#,
    );

    let output = run_bin(&env, &["status"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load configuration"), "got:\n{stderr}");
}
