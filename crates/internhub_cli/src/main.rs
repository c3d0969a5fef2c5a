//! Status probe for the data-access layer.
//!
//! # Responsibility
//! - Load configuration from `INTERNHUB_*` environment variables.
//! - Acquire one factory, print a platform snapshot, release the factory.
//! - Exit non-zero when the relational store or configuration is unusable.
//!   A downed document store is reported, not fatal.

use internhub_core::{
    default_log_level, init_logging, AccessConfig, AccessContext, PlatformSnapshot, ReportService,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(snapshot) => {
            println!("internhub_core version={}", internhub_core::core_version());
            println!("students={}", snapshot.student_count);
            println!("live_opportunities={}", snapshot.live_opportunity_count);
            println!(
                "document_store={}",
                if snapshot.document_store_available {
                    "available"
                } else {
                    "degraded"
                }
            );
            println!("breaker={}", snapshot.breaker_state.as_str());
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("event=status_probe module=cli status=error error={message}");
            eprintln!("internhub status probe failed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<PlatformSnapshot, String> {
    let config = AccessConfig::from_env().map_err(|err| err.to_string())?;
    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, config.log_dir.as_deref())?;

    let context = AccessContext::new(config).map_err(|err| err.to_string())?;
    context
        .with_factory(|factory| ReportService::new(factory).snapshot())
        .map_err(|err| err.to_string())
}
