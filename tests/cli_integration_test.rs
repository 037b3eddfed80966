//! CLI integration tests: argument parsing, config loading and whole runs
//! against INI and CSV files on disk.

mod common;

use clap::Parser;
use common::*;
use ensemble_trader::cli::{self, Cli, Command};
use ensemble_trader::domain::config_validation::{pipeline_config, validate_config};
use ensemble_trader::domain::features::FillPolicy;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_prices(dir: &Path, ticker: &str, bars: &[OhlcvBar]) {
    let mut file = fs::File::create(dir.join(format!("{ticker}.csv"))).unwrap();
    writeln!(file, "date,open,high,low,close,volume").unwrap();
    for bar in bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        )
        .unwrap();
    }
}

/// A data directory with one tradeable and one untradeable ticker, plus an
/// INI pointing at it.
fn workspace(notify: &str) -> (TempDir, tempfile::NamedTempFile) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    write_prices(&data, "SYN", &uptrend_with_dips(300));
    write_prices(&data, "DOWN", &downtrend(200));

    let ini = format!(
        "[pipeline]\ntickers = SYN, DOWN\nperiod = max\n\n\
         [data]\ndir = {}\n\n\
         [trade_log]\npath = {}\n\n\
         [notify]\n{}\n\n\
         [retry]\nattempts = 2\ndelay_secs = 0\n",
        data.display(),
        dir.path().join("trade_log.csv").display(),
        notify,
    );
    let file = write_temp_ini(&ini);
    (dir, file)
}

mod argument_parsing {
    use super::*;

    #[test]
    fn run_with_flags() {
        let cli = Cli::try_parse_from(["ensemble-trader", "run", "--config", "a.ini", "--ticker", "AAPL", "--dry-run"])
            .unwrap();
        match cli.command {
            Command::Run {
                config,
                ticker,
                dry_run,
            } => {
                assert_eq!(config.to_str(), Some("a.ini"));
                assert_eq!(ticker.as_deref(), Some("AAPL"));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn schedule_accepts_time_override() {
        let cli = Cli::try_parse_from(["ensemble-trader", "schedule", "-c", "a.ini", "--at", "16:00"]).unwrap();
        assert!(matches!(cli.command, Command::Schedule { at: Some(ref t), .. } if t == "16:00"));
    }

    #[test]
    fn backtest_requires_ticker() {
        assert!(Cli::try_parse_from(["ensemble-trader", "backtest", "--config", "a.ini"]).is_err());
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn load_valid_ini() {
        let file = write_temp_ini("[pipeline]\ntickers = AAPL, msft\nfill_policy = drop\nseed = 3\n");
        let adapter = cli::load_config(file.path()).unwrap();
        validate_config(&adapter).unwrap();
        let config = pipeline_config(&adapter).unwrap();
        assert_eq!(config.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(config.fill_policy, FillPolicy::DropIncomplete);
        assert_eq!(config.seed, 3);
    }

    #[test]
    fn missing_file_is_config_error() {
        let code = cli::load_config(Path::new("/nonexistent/config.ini")).err().unwrap();
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn trade_log_path_defaults() {
        let file = write_temp_ini("[pipeline]\ntickers = AAPL\n");
        let adapter = cli::load_config(file.path()).unwrap();
        let log = cli::build_trade_log(&adapter).unwrap();
        assert_eq!(log.path().to_str(), Some("trade_log.csv"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_good_config() {
        let (_dir, ini) = workspace("kind = none");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn validate_rejects_bad_config() {
        let ini = write_temp_ini("[pipeline]\ntickers = AAPL\nrsi_threshold = 140\n");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn run_writes_trade_log_and_messages() {
        let dir = TempDir::new().unwrap();
        let messages = dir.path().join("messages.txt");
        let (work, ini) = workspace(&format!("kind = file\npath = {}", messages.display()));

        let code = cli::run(Cli {
            command: Command::Run {
                config: ini.path().to_path_buf(),
                ticker: None,
                dry_run: false,
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);

        let log = fs::read_to_string(work.path().join("trade_log.csv")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        // DOWN never trades, so only SYN is logged
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(",SYN,"));

        let sent = fs::read_to_string(&messages).unwrap();
        assert!(sent.contains("Stock: SYN"));
        assert!(!sent.contains("Stock: DOWN"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let messages = dir.path().join("messages.txt");
        let (work, ini) = workspace(&format!("kind = file\npath = {}", messages.display()));

        let code = cli::run(Cli {
            command: Command::Run {
                config: ini.path().to_path_buf(),
                ticker: Some("syn".into()),
                dry_run: true,
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!work.path().join("trade_log.csv").exists());
        assert!(!messages.exists());
    }

    #[test]
    fn run_fails_when_every_asset_is_skipped() {
        let (_dir, ini) = workspace("kind = none");
        let code = cli::run(Cli {
            command: Command::Run {
                config: ini.path().to_path_buf(),
                ticker: Some("DOWN".into()),
                dry_run: true,
            },
        });
        assert_eq!(code, ExitCode::from(5));
    }

    #[test]
    fn backtest_command_prints_results() {
        let (_dir, ini) = workspace("kind = none");
        let code = cli::run(Cli {
            command: Command::Backtest {
                config: ini.path().to_path_buf(),
                ticker: "SYN".into(),
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn backtest_command_reports_missing_ticker() {
        let (_dir, ini) = workspace("kind = none");
        let code = cli::run(Cli {
            command: Command::Backtest {
                config: ini.path().to_path_buf(),
                ticker: "NOPE".into(),
            },
        });
        assert_eq!(code, ExitCode::from(5));
    }
}
