use std::sync::Arc;
use std::time::Duration;

use barberia_agent::{BookingOrchestrator, CompletionClient, ProxyCompletionClient, TurnOutcome};

use crate::commands::{load_config, open_stores, runtime, CommandResult, StepFailure};

/// Runs one booking turn against the configured completion endpoint.
pub fn run(message: &str) -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let stores = open_stores(&config).await?;
        let turn_timeout = Duration::from_secs(config.llm.timeout_secs);
        let completion: Arc<dyn CompletionClient> = Arc::new(
            ProxyCompletionClient::new(config.llm.endpoint.clone(), turn_timeout)
                .map_err(|error| ("completion_client", error.to_string(), 7u8))?,
        );
        let orchestrator = BookingOrchestrator::new(
            stores.catalog,
            stores.appointments,
            completion,
            config.llm.api_key.clone(),
        )
        .with_turn_timeout(turn_timeout);

        let submitted = orchestrator.submit(message).await;
        stores.pool.close().await;
        let report =
            submitted.map_err(|rejected| ("invalid_input", rejected.to_string(), 2u8))?;
        Ok::<_, StepFailure>(report)
    });

    match result {
        Ok(report) => match report.outcome {
            TurnOutcome::MissingCredential => {
                CommandResult::failure("chat", "credential_missing", report.reply, 8)
            }
            TurnOutcome::RemoteFailed => CommandResult::failure("chat", "completion", report.reply, 7),
            TurnOutcome::PersistenceFailed => {
                CommandResult::failure("chat", "persistence", report.reply, 5)
            }
            TurnOutcome::Booked { .. } | TurnOutcome::Replied | TurnOutcome::UnknownService { .. } => {
                CommandResult::success("chat", report.reply)
            }
        },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}
