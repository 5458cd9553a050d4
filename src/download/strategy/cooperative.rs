use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;

use crate::download::download_task::{fetch, FetchOptions, FetchRequest, FetchResult};
use crate::download::error::FetchErrorKind;
use crate::download::scheduler::Scheduler;

/// Every fetch is a future on one private current-thread event loop; they
/// interleave at I/O boundaries and no other thread does their work.
#[derive(Debug, Default)]
pub struct CooperativeScheduler;

#[async_trait]
impl Scheduler for CooperativeScheduler {
    async fn execute(&self, requests: Vec<FetchRequest>, options: Arc<FetchOptions>) -> Vec<FetchResult> {
        let identifiers: Vec<String> = requests.iter().map(|request| request.identifier().to_string()).collect();

        // Off the caller's executor, so connection tasks land on the loop's runtime
        let joined = tokio::task::spawn_blocking(move || run_event_loop(requests, &options)).await;

        let message = match joined {
            Ok(Ok(results)) => return results,
            Ok(Err(err)) => format!("Failed to start event loop: {}", err),
            Err(err) => format!("Event loop stopped: {}", err),
        };

        identifiers
            .into_iter()
            .map(|identifier| {
                let result = FetchResult::failure(identifier, FetchErrorKind::WorkerFailed, message.clone());
                result.log();
                result
            })
            .collect()
    }
}

fn run_event_loop(requests: Vec<FetchRequest>, options: &FetchOptions) -> io::Result<Vec<FetchResult>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let client = Client::new();
    let client = &client;

    let futures = requests.into_iter().map(|request| async move {
        let result = fetch(client, request, options).await;
        result.log();
        result
    });

    Ok(runtime.block_on(join_all(futures)))
}
