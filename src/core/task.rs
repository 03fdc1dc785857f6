// ─── Task Context ───
// Named, nested units of work. Events from every level reach the listener
// attached to the root context.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::core::error::LauncherResult;

/// Lifecycle and progress notifications, keyed by the dotted task path
/// (`install.libraries.org.lwjgl:lwjgl:3.3.3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started {
        path: String,
    },
    /// `total` is `None` when the size of the work is not known up front.
    Progress {
        path: String,
        current: u64,
        total: Option<u64>,
        label: String,
    },
    Succeeded {
        path: String,
    },
    Failed {
        path: String,
        error: String,
    },
}

pub type TaskListener = Arc<dyn Fn(&TaskEvent) + Send + Sync>;

/// Execution context handed to every unit of work.
#[derive(Clone, Default)]
pub struct TaskContext {
    path: Vec<String>,
    listener: Option<TaskListener>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("path", &self.path())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl TaskContext {
    /// Root context without a listener.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn with_listener<F>(listener: F) -> Self
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        Self {
            path: Vec::new(),
            listener: Some(Arc::new(listener)),
        }
    }

    pub fn path(&self) -> String {
        self.path.join(".")
    }

    fn child(&self, name: &str) -> Self {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Self {
            path,
            listener: self.listener.clone(),
        }
    }

    fn emit(&self, event: TaskEvent) {
        if let Some(listener) = &self.listener {
            listener(&event);
        }
    }

    /// Report `(current, total, label)` for this context.
    pub fn update(&self, current: u64, total: Option<u64>, label: impl Into<String>) {
        self.emit(TaskEvent::Progress {
            path: self.path(),
            current,
            total,
            label: label.into(),
        });
    }

    /// Run `work` as a child unit named `name`.
    ///
    /// The returned result is the unit's own; whether a failure aborts the
    /// caller is up to the caller.
    pub async fn execute<T, F, Fut>(&self, name: &str, work: F) -> LauncherResult<T>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = LauncherResult<T>>,
    {
        let child = self.child(name);
        let path = child.path();
        child.emit(TaskEvent::Started { path: path.clone() });

        let result = work(child.clone()).await;

        match &result {
            Ok(_) => {
                debug!("Task {} succeeded", path);
                child.emit(TaskEvent::Succeeded { path });
            }
            Err(e) => {
                debug!("Task {} failed: {}", path, e);
                child.emit(TaskEvent::Failed {
                    path,
                    error: e.to_string(),
                });
            }
        }

        result
    }

    /// Run named units in waves of at most `concurrency`.
    ///
    /// Wave N+1 starts only after every unit of wave N settled. Results are
    /// returned in input order; progress `(settled, total)` is reported on
    /// this context after each wave.
    pub async fn execute_all<T, F, Fut>(
        &self,
        units: Vec<(String, F)>,
        concurrency: usize,
    ) -> Vec<LauncherResult<T>>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = LauncherResult<T>>,
    {
        let concurrency = concurrency.max(1);
        let total = units.len() as u64;
        let mut results = Vec::with_capacity(units.len());
        let mut pending = units.into_iter();

        loop {
            let wave: Vec<(String, F)> = pending.by_ref().take(concurrency).collect();
            if wave.is_empty() {
                break;
            }

            let settled = join_all(
                wave.into_iter()
                    .map(|(name, work)| async move { self.execute(&name, work).await }),
            )
            .await;
            results.extend(settled);

            self.update(results.len() as u64, Some(total), self.path());
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::core::error::LauncherError;

    fn recording() -> (TaskContext, Arc<Mutex<Vec<TaskEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let ctx = TaskContext::with_listener(move |e| sink.lock().unwrap().push(e.clone()));
        (ctx, events)
    }

    #[tokio::test]
    async fn nested_events_bubble_to_root_listener() {
        let (ctx, events) = recording();

        let value = ctx
            .execute("install", |install| async move {
                install
                    .execute("jar", |jar| async move {
                        jar.update(5, Some(10), "client.jar");
                        Ok(42)
                    })
                    .await
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                TaskEvent::Started { path: "install".into() },
                TaskEvent::Started { path: "install.jar".into() },
                TaskEvent::Progress {
                    path: "install.jar".into(),
                    current: 5,
                    total: Some(10),
                    label: "client.jar".into()
                },
                TaskEvent::Succeeded { path: "install.jar".into() },
                TaskEvent::Succeeded { path: "install".into() },
            ]
        );
    }

    #[tokio::test]
    async fn failure_rejects_only_its_own_execute() {
        let (ctx, events) = recording();

        let result: LauncherResult<()> = ctx
            .execute("broken", |_| async { Err(LauncherError::Other("boom".into())) })
            .await;

        assert!(result.is_err());
        assert!(events.lock().unwrap().contains(&TaskEvent::Failed {
            path: "broken".into(),
            error: "boom".into()
        }));
    }

    #[tokio::test]
    async fn waves_never_exceed_concurrency() {
        let ctx = TaskContext::root();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let units: Vec<_> = (0..10)
            .map(|i| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                let unit = move |_ctx: TaskContext| async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    if i == 3 {
                        Err(LauncherError::Other("unit 3".into()))
                    } else {
                        Ok::<_, LauncherError>(i)
                    }
                };
                (format!("unit{i}"), unit)
            })
            .collect();

        let results = ctx.execute_all(units, 3).await;

        assert_eq!(results.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(results[3].is_err());
        assert_eq!(*results[9].as_ref().unwrap(), 9);
    }

    #[tokio::test]
    async fn wave_progress_is_reported_per_wave() {
        let (ctx, events) = recording();
        let units: Vec<_> = (0..5)
            .map(|i| (format!("u{i}"), move |_ctx: TaskContext| async move { Ok::<_, LauncherError>(i) }))
            .collect();

        ctx.execute("batch", |batch| async move {
            let results = batch.execute_all(units, 2).await;
            assert_eq!(results.len(), 5);
            Ok(())
        })
        .await
        .unwrap();

        let progress: Vec<(u64, Option<u64>)> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                TaskEvent::Progress { current, total, .. } => Some((*current, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(2, Some(5)), (4, Some(5)), (5, Some(5))]);
    }
}
