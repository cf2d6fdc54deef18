use std::sync::Arc;

use common::Status;
use common::retry::RetryPolicy;
use tracing::{debug, info_span, warn, Instrument};

use super::{ConfigCell, Task, TaskContext};

/// Runs tasks, rerunning them from scratch after a retryable failure.
#[derive(Clone)]
pub struct TaskRunner {
    config: Arc<ConfigCell>,
    policy: Option<RetryPolicy>,
}

impl TaskRunner {
    pub fn new(config: Arc<ConfigCell>) -> Self {
        Self {
            config,
            policy: None,
        }
    }

    /// Use a fixed policy instead of `max_task_retries` from the config.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    async fn policy(&self, ctx: &TaskContext) -> Result<RetryPolicy, Status> {
        match self.policy {
            Some(p) => Ok(p),
            None => {
                let config = self.config.get(&ctx.cancel).await?;
                Ok(RetryPolicy::with_max_retries(config.max_task_retries))
            }
        }
    }

    pub async fn run<T: Task + ?Sized>(&self, ctx: &TaskContext, task: &mut T) -> Result<(), Status> {
        let span = info_span!("task", name = task.name());
        let res = self.run_attempts(ctx, task).instrument(span.clone()).await;
        task.clean_up().instrument(span).await;
        res
    }

    async fn run_attempts<T: Task + ?Sized>(
        &self,
        ctx: &TaskContext,
        task: &mut T,
    ) -> Result<(), Status> {
        let policy = self.policy(ctx).await?;
        let mut attempt: u8 = 0;
        loop {
            ctx.check_cancelled()?;
            let res = tokio::select! {
                res = task.run(ctx) => res,
                _ = ctx.cancel.cancelled() => Err(Status::cancelled("request cancelled")),
            };
            let sts = match res {
                Ok(()) => {
                    debug!(attempt, "Task finished");
                    return Ok(());
                }
                Err(sts) => sts,
            };
            if !sts.is_retryable() || !policy.should_retry(attempt) {
                return Err(sts);
            }
            attempt += 1;
            warn!(attempt, error = %sts, "Task hit a lock conflict, retrying");
            tokio::select! {
                _ = tokio::time::sleep(policy.backoff(attempt)) => {}
                _ = ctx.cancel.cancelled() => return Err(Status::cancelled("request cancelled")),
            }
            task.reset_for_retry();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use common::Code;
    use common::config::BackendConfig;

    use super::*;

    struct Flaky {
        failures: u8,
        runs: u8,
        resets: u8,
        cleanups: u8,
        fatal: bool,
    }

    impl Flaky {
        fn new(failures: u8) -> Self {
            Self {
                failures,
                runs: 0,
                resets: 0,
                cleanups: 0,
                fatal: false,
            }
        }
    }

    #[async_trait]
    impl Task for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn run(&mut self, _ctx: &TaskContext) -> Result<(), Status> {
            self.runs += 1;
            if self.fatal {
                return Err(Status::invalid_argument("bad input"));
            }
            if self.runs <= self.failures {
                return Err(Status::aborted("deadlock detected").retryable());
            }
            Ok(())
        }

        fn reset_for_retry(&mut self) {
            self.resets += 1;
        }

        async fn clean_up(&mut self) {
            self.cleanups += 1;
        }
    }

    fn runner(max_retries: u8) -> TaskRunner {
        TaskRunner::new(Arc::new(ConfigCell::with_config(BackendConfig::default()))).with_policy(
            RetryPolicy {
                max_retries,
                base_ms: 1,
                max_ms: 2,
            },
        )
    }

    #[tokio::test]
    async fn retries_lock_conflicts_until_success() {
        let mut task = Flaky::new(2);
        runner(3).run(&TaskContext::anonymous(), &mut task).await.unwrap();
        assert_eq!(task.runs, 3);
        assert_eq!(task.resets, 2);
        assert_eq!(task.cleanups, 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let mut task = Flaky::new(10);
        let err = runner(2)
            .run(&TaskContext::anonymous(), &mut task)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Aborted);
        assert_eq!(task.runs, 3);
        assert_eq!(task.cleanups, 1);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let mut task = Flaky::new(0);
        task.fatal = true;
        let err = runner(3)
            .run(&TaskContext::anonymous(), &mut task)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(task.runs, 1);
        assert_eq!(task.resets, 0);
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_running() {
        let ctx = TaskContext::anonymous();
        ctx.cancel.cancel();
        let mut task = Flaky::new(0);
        let err = runner(3).run(&ctx, &mut task).await.unwrap_err();
        assert_eq!(err.code(), Code::Cancelled);
        assert_eq!(task.runs, 0);
        assert_eq!(task.cleanups, 1);
    }

    #[tokio::test]
    async fn retry_budget_comes_from_config() {
        let config = BackendConfig {
            max_task_retries: 0,
            ..BackendConfig::default()
        };
        let runner = TaskRunner::new(Arc::new(ConfigCell::with_config(config)));
        let mut task = Flaky::new(1);
        assert!(runner.run(&TaskContext::anonymous(), &mut task).await.is_err());
        assert_eq!(task.runs, 1);
    }
}
