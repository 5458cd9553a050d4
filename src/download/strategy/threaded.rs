use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use tokio::sync::oneshot;

use crate::download::download_task::{fetch, FetchOptions, FetchRequest, FetchResult};
use crate::download::error::FetchErrorKind;
use crate::download::scheduler::Scheduler;

/// One named OS thread per request, each driving its fetch on a private
/// single-threaded runtime.
#[derive(Debug, Default)]
pub struct ThreadedScheduler;

enum Worker {
    Running {
        identifier: String,
        receiver: oneshot::Receiver<FetchResult>,
        handle: thread::JoinHandle<()>,
    },
    NotStarted(FetchResult),
}

#[async_trait]
impl Scheduler for ThreadedScheduler {
    async fn execute(&self, requests: Vec<FetchRequest>, options: Arc<FetchOptions>) -> Vec<FetchResult> {
        let workers: Vec<Worker> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| spawn_worker(index, request, options.clone()))
            .collect();

        let mut results = Vec::with_capacity(workers.len());
        let mut handles = Vec::with_capacity(workers.len());
        for worker in workers {
            match worker {
                Worker::Running { identifier, receiver, handle } => {
                    // The sender only drops unsent when the thread panicked
                    let result = receiver.await.unwrap_or_else(|_| {
                        FetchResult::failure(identifier, FetchErrorKind::WorkerFailed, "Worker thread panicked")
                    });
                    results.push(result);
                    handles.push(handle);
                }
                Worker::NotStarted(result) => results.push(result),
            }
        }

        // Every thread has already handed off its result, so reaping is short
        let reaped = tokio::task::spawn_blocking(move || reap(handles)).await;
        if let Err(err) = reaped {
            warn!("Failed to reap worker threads: {}", err);
        }

        results
    }
}

/// Joins every worker thread, returning how many of them panicked
fn reap(handles: Vec<thread::JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for handle in handles {
        let name = handle.thread().name().unwrap_or("fetch-worker").to_string();
        if handle.join().is_err() {
            warn!("Worker thread {} exited with a panic", name);
            panicked += 1;
        }
    }
    panicked
}

fn spawn_worker(index: usize, request: FetchRequest, options: Arc<FetchOptions>) -> Worker {
    let identifier = request.identifier().to_string();
    let (sender, receiver) = oneshot::channel();

    let spawned = thread::Builder::new()
        .name(format!("fetch-worker-{}", index))
        .spawn(move || {
            let result = fetch_on_thread(request, &options);
            result.log();
            let _ = sender.send(result);
        });

    match spawned {
        Ok(handle) => Worker::Running { identifier, receiver, handle },
        Err(err) => {
            let result = FetchResult::failure(identifier, FetchErrorKind::WorkerFailed, format!("Failed to spawn thread: {}", err));
            result.log();
            Worker::NotStarted(result)
        }
    }
}

fn fetch_on_thread(request: FetchRequest, options: &FetchOptions) -> FetchResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            return FetchResult::failure(
                request.into_identifier(),
                FetchErrorKind::WorkerFailed,
                format!("Failed to start thread runtime: {}", err),
            );
        }
    };

    // Pooled connections belong to the runtime that opened them, so each thread gets its own client
    let client = Client::new();
    runtime.block_on(fetch(&client, request, options))
}
