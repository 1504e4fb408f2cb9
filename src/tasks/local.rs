use super::{Job, JobHandler, QueueName, TaskDescriptor, TaskQueue};
use crate::config::TaskConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug)]
struct Envelope {
    job: Job,
    attempt: u32,
}

fn schedule(tx: &UnboundedSender<Envelope>, envelope: Envelope, delay: Duration) {
    if delay.is_zero() {
        if tx.send(envelope).is_err() {
            log::error!("Task queue closed, job dropped");
        }
        return;
    }
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if tx.send(envelope).is_err() {
            log::error!("Task queue closed, delayed job dropped");
        }
    });
}

/// 进程内任务队列：每个命名队列一个 channel
#[derive(Clone)]
pub struct LocalTaskQueue {
    senders: HashMap<QueueName, UnboundedSender<Envelope>>,
}

/// 队列的消费端，服务组装完成后调用 [`QueueWorkers::spawn`] 启动
pub struct QueueWorkers {
    channels: Vec<(QueueName, UnboundedSender<Envelope>, UnboundedReceiver<Envelope>)>,
}

impl LocalTaskQueue {
    pub fn new() -> (Self, QueueWorkers) {
        let mut senders = HashMap::new();
        let mut channels = Vec::new();
        for queue in QueueName::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(queue, tx.clone());
            channels.push((queue, tx, rx));
        }
        (Self { senders }, QueueWorkers { channels })
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn enqueue(&self, task: TaskDescriptor) -> AppResult<()> {
        let tx = self
            .senders
            .get(&task.queue)
            .ok_or_else(|| AppError::InternalError(format!("unknown queue {}", task.queue)))?;
        if tx.is_closed() {
            return Err(AppError::InternalError(format!(
                "queue {} is closed",
                task.queue
            )));
        }
        log::debug!("Enqueue {:?} on {} (delay {:?})", task.job, task.queue, task.delay);
        schedule(
            tx,
            Envelope {
                job: task.job,
                attempt: 1,
            },
            task.delay,
        );
        Ok(())
    }
}

impl QueueWorkers {
    pub fn spawn(self, handler: Arc<dyn JobHandler>, config: TaskConfig) {
        for (queue, tx, rx) in self.channels {
            let handler = handler.clone();
            let config = config.clone();
            tokio::spawn(worker_loop(queue, tx, rx, handler, config));
        }
    }
}

async fn worker_loop(
    queue: QueueName,
    tx: UnboundedSender<Envelope>,
    mut rx: UnboundedReceiver<Envelope>,
    handler: Arc<dyn JobHandler>,
    config: TaskConfig,
) {
    let timeout = Duration::from_secs(config.timeout_seconds.max(1));
    log::info!("Task worker started for queue {queue}");

    while let Some(envelope) = rx.recv().await {
        let started = Instant::now();
        let error = match tokio::time::timeout(timeout, handler.handle(&envelope.job)).await {
            Ok(Ok(())) => {
                log::debug!(
                    "Job {:?} on {queue} done in {:?}",
                    envelope.job,
                    started.elapsed()
                );
                continue;
            }
            Ok(Err(e)) if !e.is_retryable() => {
                log::warn!("Job {:?} on {queue} failed permanently: {e}", envelope.job);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {timeout:?}"),
        };

        if envelope.attempt >= config.max_attempts {
            log::error!(
                "Dead-lettered job {:?} on {queue} after {} attempt(s): {error}",
                envelope.job,
                envelope.attempt
            );
            continue;
        }

        let backoff = Duration::from_secs(config.retry_backoff_seconds * envelope.attempt as u64);
        log::warn!(
            "Job {:?} on {queue} failed (attempt {}), retrying in {backoff:?}: {error}",
            envelope.job,
            envelope.attempt
        );
        schedule(
            &tx,
            Envelope {
                job: envelope.job,
                attempt: envelope.attempt + 1,
            },
            backoff,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 前 `fail_times` 次返回可重试错误
    struct FlakyHandler {
        fail_times: u32,
        calls: Mutex<u32>,
        done: UnboundedSender<(Job, u32)>,
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        async fn handle(&self, job: &Job) -> AppResult<()> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call <= self.fail_times {
                return Err(AppError::UpstreamPush("flaky".into()));
            }
            let _ = self.done.send((job.clone(), call));
            Ok(())
        }
    }

    fn config(max_attempts: u32) -> TaskConfig {
        TaskConfig {
            max_attempts,
            timeout_seconds: 5,
            retry_backoff_seconds: 0,
        }
    }

    #[tokio::test]
    async fn test_job_retried_until_success() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let (queue, workers) = LocalTaskQueue::new();
        workers.spawn(
            Arc::new(FlakyHandler {
                fail_times: 2,
                calls: Mutex::new(0),
                done: done_tx,
            }),
            config(3),
        );

        queue
            .enqueue(TaskDescriptor::new(Job::RebuildProductPrices { product_id: 5 }))
            .await
            .unwrap();

        let (job, call) = tokio::time::timeout(Duration::from_secs(2), done_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job, Job::RebuildProductPrices { product_id: 5 });
        assert_eq!(call, 3);
    }

    #[tokio::test]
    async fn test_job_dead_lettered_after_max_attempts() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let (queue, workers) = LocalTaskQueue::new();
        workers.spawn(
            Arc::new(FlakyHandler {
                fail_times: 5,
                calls: Mutex::new(0),
                done: done_tx,
            }),
            config(2),
        );

        queue
            .enqueue(TaskDescriptor::new(Job::ProcessOrderItems { order_id: 1 }))
            .await
            .unwrap();

        let res = tokio::time::timeout(Duration::from_millis(300), done_rx.recv()).await;
        assert!(res.is_err(), "job should never succeed");
    }
}
