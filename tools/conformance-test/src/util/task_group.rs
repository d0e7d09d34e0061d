/*!
   Structured groups of concurrently running tasks.

   All tasks of a group run to completion, even after one of them failed.
   The first failure is only surfaced once the whole group has settled, so
   a task that already started is never observed half-way through.
*/

use core::future::Future;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, trace};

use crate::error::Error;

pub struct TaskGroup<T> {
    name: String,
    labels: Vec<String>,
    tasks: JoinSet<(usize, Result<T, Error>)>,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            tasks: JoinSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Spawn a task in the group. It starts running immediately.
    pub fn spawn<F>(&mut self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let index = self.labels.len();
        let label = label.into();

        trace!(group = %self.name, task = %label, "spawning task");

        let task_label = label.clone();
        self.tasks.spawn(async move {
            let result = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(Error::task_join(task_label, panic_message(panic))),
            };

            (index, result)
        });

        self.labels.push(label);
    }

    /// Wait for every task and return each result in spawn order.
    pub async fn join_settled(self) -> Vec<Result<T, Error>> {
        self.settle().await.0
    }

    /**
       Wait for every task. Returns the values in spawn order if all tasks
       succeeded, or else the error of the task that failed first.
    */
    pub async fn join(self) -> Result<Vec<T>, Error> {
        let (results, first_failure) = self.settle().await;

        let mut values = Vec::with_capacity(results.len());
        let mut failure = None;

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(value) => values.push(value),
                Err(e) if first_failure == Some(index) => failure = Some(e),
                Err(_) => {}
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(values),
        }
    }

    async fn settle(mut self) -> (Vec<Result<T, Error>>, Option<usize>) {
        let mut slots: Vec<Option<Result<T, Error>>> = self.labels.iter().map(|_| None).collect();
        let mut first_failure = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if result.is_err() && first_failure.is_none() {
                        debug!(
                            group = %self.name,
                            task = %self.labels[index],
                            "first task failure in group"
                        );

                        first_failure = Some(index);
                    }

                    slots[index] = Some(result);
                }
                Err(e) => {
                    debug!(group = %self.name, "task was cancelled: {e}");
                }
            }
        }

        let results: Vec<_> = slots
            .into_iter()
            .zip(self.labels.iter())
            .map(|(slot, label)| {
                slot.unwrap_or_else(|| {
                    Err(Error::task_join(label.clone(), "task was cancelled".to_string()))
                })
            })
            .collect();

        // A cancelled task counts as failed when nothing else failed before.
        let first_failure = first_failure.or_else(|| results.iter().position(Result::is_err));

        (results, first_failure)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::time::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use tokio::time::sleep;

    use crate::error::ErrorDetail;

    #[test_log::test(tokio::test(start_paused = true))]
    async fn join_returns_values_in_spawn_order() {
        let mut group = TaskGroup::new("ordering");

        group.spawn("slow", async {
            sleep(Duration::from_secs(2)).await;
            Ok(1)
        });
        group.spawn("fast", async { Ok(2) });

        assert_eq!(group.join().await.unwrap(), vec![1, 2]);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn first_failure_wins_after_siblings_complete() {
        let sibling_done = Arc::new(AtomicBool::new(false));
        let mut group = TaskGroup::<()>::new("failures");

        {
            let sibling_done = sibling_done.clone();
            group.spawn("sibling", async move {
                sleep(Duration::from_secs(5)).await;
                sibling_done.store(true, Ordering::SeqCst);
                Ok(())
            });
        }

        group.spawn("late-failure", async {
            sleep(Duration::from_secs(2)).await;
            Err(Error::assertion("late".to_string()))
        });

        group.spawn("early-failure", async {
            sleep(Duration::from_secs(1)).await;
            Err(Error::assertion("early".to_string()))
        });

        let err = group.join().await.unwrap_err();

        match err.detail() {
            ErrorDetail::Assertion(e) => assert_eq!(e.message, "early"),
            e => panic!("unexpected error: {e:?}"),
        }

        assert!(sibling_done.load(Ordering::SeqCst));
    }

    async fn boom() -> Result<u8, Error> {
        panic!("boom")
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn panics_are_reported_as_task_failures() {
        let mut group = TaskGroup::<u8>::new("panics");

        group.spawn("ok", async { Ok(1) });
        group.spawn("panicking", boom());

        let results = group.join_settled().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());

        match results[1].as_ref().map_err(|e| e.detail()) {
            Err(ErrorDetail::TaskJoin(e)) => {
                assert_eq!(e.task, "panicking");
                assert!(e.reason.contains("boom"));
            }
            _ => panic!("expected a task join error"),
        }
    }
}
