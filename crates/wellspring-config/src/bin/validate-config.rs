//! Config validation CLI tool
//!
//! Validates a wellspring configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;
use wellspring_api::ComplianceKind;
use wellspring_util::default_config_path;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a wellspring configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match wellspring_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", wellspring_config::CURRENT_CONFIG_VERSION);
            println!();
            println!("Billing:");
            println!("  status:   {}", settings.billing.check_subscription_url());
            println!("  checkout: {}", settings.billing.create_checkout_url());
            println!("  portal:   {}", settings.billing.customer_portal_url());
            println!(
                "  poll every {}s, timeout {}s",
                settings.billing.poll_interval.as_secs(),
                settings.billing.request_timeout.as_secs()
            );
            println!();
            println!("Compliance:");
            for kind in [ComplianceKind::Audit, ComplianceKind::Consent, ComplianceKind::Waiver] {
                println!("  {:<8} {}", kind.as_str(), settings.compliance_url(kind));
            }
            println!();
            println!(
                "Sessions: join opens {} min early, default length {} min",
                settings.sessions.join_lead_minutes, settings.sessions.default_duration_minutes
            );
            match &settings.auth {
                Some(auth) => println!("Token refresh: {}", auth.token_url()),
                None => println!("Token refresh: disabled (no [auth] section)"),
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                wellspring_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                wellspring_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                wellspring_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                wellspring_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        wellspring_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
