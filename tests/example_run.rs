//! Integration tests for the `example run` command.
use drought_rh::cli::example::handle_example_run_command;
use drought_rh::settings::Settings;
use tempfile::tempdir;

/// Settings with logging switched off
fn quiet_settings() -> Settings {
    Settings {
        log_level: "off".to_string(),
        ..Settings::default()
    }
}

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("three_bus_results");
    handle_example_run_command("three_bus", Some(&output_dir), Some(quiet_settings())).unwrap();

    for network_dir in ["base", "base_rh", "drought", "drought_roll"] {
        assert!(
            output_dir.join(network_dir).join("generators-p.csv").is_file(),
            "No dispatch written for {network_dir}"
        );
    }

    let results_dir = output_dir.join("results");
    for name in [
        "DE_1.0_base_solved",
        "DE_1.0_base_roll_solved",
        "drought_DE_3_1.0_0.5_14_inv",
        "drought_DE_3_1.0_0.5_14_invroll",
    ] {
        for prefix in ["cap", "gen", "capex", "syscost"] {
            let path = results_dir.join(format!("{prefix}_{name}.csv"));
            assert!(path.is_file(), "{} missing", path.display());
        }
    }
}
