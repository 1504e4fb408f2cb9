use super::{Job, QueueName, TaskDescriptor, TaskQueue};
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Mutex;

/// Queue that only records what was enqueued.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<TaskDescriptor>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<TaskDescriptor> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn jobs_on(&self, queue: QueueName) -> Vec<Job> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.queue == queue)
            .map(|t| t.job.clone())
            .collect()
    }

    pub fn take(&self) -> Vec<TaskDescriptor> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, task: TaskDescriptor) -> AppResult<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}
