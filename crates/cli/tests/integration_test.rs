use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CHAIN: &str = "\
strike,opt_kind,dte_calc,volm,open_interest,delta_contract,gamma_contract,vega_contract,theta_contract,iv,value_bs,volm_bs
445,C,2,900,5200,0.71,0.021,0.18,-0.25,0.19,120000,300
445,P,2,700,6100,-0.29,0.021,0.18,-0.22,0.21,-80000,-200
450,C,2,1800,9400,0.52,0.034,0.25,-0.31,0.17,260000,650
450,P,2,1500,8800,-0.48,0.034,0.25,-0.29,0.18,-150000,-400
455,C,2,1100,7000,0.31,0.025,0.20,-0.24,0.18,90000,210
455,P,2,600,4300,-0.69,0.025,0.20,-0.21,0.20,-40000,-90
";

const UNDERLYING: &str = r#"{
    "symbol": "SPY",
    "timestamp": "2026-10-16T15:30:00Z",
    "price": 451.2,
    "day_open_price_und": 449.0,
    "day_high_price_und": 452.0,
    "day_low_price_und": 448.1,
    "prev_day_close_price_und": 447.5,
    "u_volatility": 0.17,
    "day_volume": 41000000.0,
    "value_bs": 5200000.0,
    "volm_bs": 12000.0,
    "net_value_flow_5m_und": 900000.0,
    "net_value_flow_15m_und": 1800000.0,
    "net_value_flow_30m_und": 2500000.0,
    "net_value_flow_60m_und": 3300000.0,
    "net_vol_flow_5m_und": 3000.0,
    "net_vol_flow_15m_und": 7000.0
}"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("SPY_chain.csv"), CHAIN).unwrap();
        fs::write(data.join("SPY_underlying.json"), UNDERLYING).unwrap();

        let config = format!(
            "[data]\nsymbol = \"SPY\"\noptions_path = {:?}\nunderlying_path = {:?}\nhistory_path = {:?}\noutput_dir = {:?}\n",
            path_str(&data.join("{symbol}_chain.csv")),
            path_str(&data.join("{symbol}_underlying.json")),
            path_str(&data.join("{symbol}_history.json")),
            path_str(&dir.path().join("output")),
        );
        fs::write(dir.path().join("Config.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn eots(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_eots"))
            .arg("--config")
            .arg(self.path("Config.toml"))
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .unwrap()
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn process_writes_bundle_and_strike_table() {
    let fx = Fixture::new();
    let bundle_path = fx.path("bundle.json");
    let csv_path = fx.path("strikes.csv");

    let out = fx.eots(&[
        "process",
        "--quiet",
        "--output",
        bundle_path.to_str().unwrap(),
        "--strikes-csv",
        csv_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let bundle: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&bundle_path).unwrap()).unwrap();
    assert_eq!(bundle["strike_level_data_with_metrics"].as_array().unwrap().len(), 3);
    assert_eq!(bundle["underlying_data_enriched"]["symbol"], "SPY");
    let score = bundle["underlying_data_enriched"]["elite_impact_score_und"]
        .as_f64()
        .unwrap();
    assert!((-100.0..=100.0).contains(&score));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 4);

    // History now holds today's bar and one observation per flow metric.
    let history = fs::read_to_string(fx.path("data/SPY_history.json")).unwrap();
    assert!(history.contains("SPY:vapi_fa"));
    assert!(history.contains("2026-10-16"));
}

#[test]
fn invalid_underlying_fails_the_process_command() {
    let fx = Fixture::new();
    fs::write(
        fx.path("data/SPY_underlying.json"),
        UNDERLYING.replace("\"price\": 451.2", "\"price\": -1.0"),
    )
    .unwrap();

    let out = fx.eots(&["process", "--quiet", "--output", fx.path("b.json").to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("price"));
    assert!(!fx.path("b.json").exists());
    assert!(!fx.path("data/SPY_history.json").exists());
}

#[test]
fn run_keeps_going_after_failed_cycles() {
    let fx = Fixture::new();
    fs::remove_file(fx.path("data/SPY_chain.csv")).unwrap();

    let out = fx.eots(&["run", "--interval-secs", "1", "--cycles", "2"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.matches("Cycle failed, continuing").count(), 2);
}

#[test]
fn show_config_prints_merged_configuration() {
    let fx = Fixture::new();
    let out = fx.eots(&["--symbol", "qqq", "show-config"]);
    assert!(out.status.success());

    let config: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(config["data"]["symbol"], "QQQ");
    assert_eq!(config["metrics"]["dte_max"], 45.0);
}
