//! Long-running demonstration task

use std::time::Duration;

use outfitter_contracts::{
    ActionSpec, CliOption, CliSpec, HandlerContext, InputSchema, McpSpec, ProgressUpdate, Result,
    SpecError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_STEPS: u32 = 3;
const DEFAULT_DELAY_MS: u64 = 100;

fn default_steps() -> u32 {
    DEFAULT_STEPS
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountdownInput {
    #[serde(default = "default_steps")]
    steps: u32,
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct CountdownOutput {
    completed: u32,
}

async fn countdown(input: CountdownInput, ctx: HandlerContext) -> Result<CountdownOutput> {
    let total = f64::from(input.steps);
    let delay = Duration::from_millis(input.delay_ms);

    for step in 0..input.steps {
        ctx.check_cancelled()?;
        let remaining = input.steps - step;
        ctx.report_progress(
            ProgressUpdate::new(f64::from(step))
                .total(total)
                .message(format!("{remaining} remaining")),
        );
        ctx.logger().debug(&format!("Countdown at {remaining}"));

        match ctx.signal() {
            Some(signal) => {
                tokio::select! {
                    _ = signal.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
    ctx.check_cancelled()?;
    ctx.report_progress(ProgressUpdate::new(total).total(total).message("done"));

    Ok(CountdownOutput {
        completed: input.steps,
    })
}

/// `tasks.countdown`: sleeps `steps` times, reporting progress after each
/// step and stopping early when cancelled.
pub fn countdown_action() -> Result<ActionSpec, SpecError> {
    let schema = InputSchema::new(json!({
        "type": "object",
        "properties": {
            "steps": {
                "type": "integer",
                "minimum": 1,
                "maximum": 100,
                "default": DEFAULT_STEPS,
                "description": "Number of steps"
            },
            "delayMs": {
                "type": "integer",
                "minimum": 0,
                "maximum": 10000,
                "default": DEFAULT_DELAY_MS,
                "description": "Delay between steps in milliseconds"
            }
        }
    }))?;

    Ok(ActionSpec::new(
        "tasks.countdown",
        "Count down with progress reporting",
        schema,
        countdown,
    )
    .cli(
        CliSpec::new()
            .command("countdown")
            .option(CliOption::new("--steps <n>", "Number of steps").default_value(DEFAULT_STEPS))
            .option(
                CliOption::new("--delay-ms <ms>", "Delay between steps in milliseconds")
                    .default_value(DEFAULT_DELAY_MS),
            ),
    )
    .mcp(McpSpec::new().tool("countdown").defer_loading(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use outfitter_contracts::{ErrorCategory, ProgressSink};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressUpdate>>);

    impl ProgressSink for Collect {
        fn report(&self, update: ProgressUpdate) {
            self.0.lock().unwrap().push(update);
        }
    }

    #[tokio::test]
    async fn reports_each_step() {
        let sink = Arc::new(Collect::default());
        let ctx = HandlerContext::builder().progress(sink.clone()).build();
        let out = countdown_action()
            .unwrap()
            .invoke(json!({"steps": 2, "delayMs": 0}), ctx)
            .await
            .unwrap();

        assert_eq!(out, json!({"completed": 2}));
        let updates = sink.0.lock().unwrap();
        let progress: Vec<f64> = updates.iter().map(|u| u.progress).collect();
        assert_eq!(progress, vec![0.0, 1.0, 2.0]);
        assert!(updates.iter().all(|u| u.total == Some(2.0)));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = HandlerContext::builder().signal(token).build();
        let err = countdown_action()
            .unwrap()
            .invoke(json!({"steps": 5, "delayMs": 10}), ctx)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Cancelled);
    }

    #[tokio::test]
    async fn cancelled_mid_sleep() {
        let token = CancellationToken::new();
        let ctx = HandlerContext::builder().signal(token.clone()).build();
        let action = countdown_action().unwrap();
        let run = tokio::spawn(async move {
            action
                .invoke(json!({"steps": 3, "delayMs": 10000}), ctx)
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let err = run.await.unwrap().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Cancelled);
    }

    #[tokio::test]
    async fn out_of_range_steps_rejected() {
        let err = countdown_action()
            .unwrap()
            .invoke(json!({"steps": 0}), HandlerContext::builder().build())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
