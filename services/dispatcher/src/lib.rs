//! Dispatcher daemon (§4): owns the API ingress listener, the worker ingress
//! listener, the Worker Registry, and the Task Registry. `services/worker`
//! is the only thing that ever connects to the worker listener; any HTTP
//! client is free to connect to the API listener.

pub mod api_handler;
pub mod config;
pub mod credential_pool;
pub mod http_response;
pub mod routes;
pub mod task_registry;
pub mod worker_handler;
pub mod worker_registry;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use config::DispatcherConfig;
use credential_pool::CredentialPool;
use task_registry::TaskRegistry;
use worker_registry::{SharedWorkerRegistry, WorkerRegistry};

pub struct Dispatcher {
    config: DispatcherConfig,
    tasks: TaskRegistry,
    workers: SharedWorkerRegistry,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let tasks = TaskRegistry::new(config.task_deadline);
        let workers = Arc::new(Mutex::new(WorkerRegistry::new(CredentialPool::new(
            config.credentials.clone(),
        ))));
        Dispatcher {
            config,
            tasks,
            workers,
        }
    }

    pub async fn run(self) -> std::io::Result<()> {
        self.bind().await?.serve().await
    }

    /// Binds both listeners and returns a handle exposing their resolved
    /// addresses, without yet accepting connections. Production `main.rs`
    /// just chains this into [`BoundDispatcher::serve`] via [`Self::run`];
    /// tests that need to discover an ephemeral port (`:0` in the config)
    /// call this directly.
    pub async fn bind(self) -> std::io::Result<BoundDispatcher> {
        let worker_listener = TcpListener::bind(&self.config.worker_bind).await?;
        let api_listener = TcpListener::bind(&self.config.api_bind).await?;
        let worker_addr = worker_listener.local_addr()?;
        let api_addr = api_listener.local_addr()?;
        info!(addr = %worker_addr, "worker ingress listening");
        info!(addr = %api_addr, "api ingress listening");
        Ok(BoundDispatcher {
            worker_listener,
            api_listener,
            worker_addr,
            api_addr,
            tasks: self.tasks,
            workers: self.workers,
        })
    }
}

pub struct BoundDispatcher {
    worker_listener: TcpListener,
    api_listener: TcpListener,
    worker_addr: SocketAddr,
    api_addr: SocketAddr,
    tasks: TaskRegistry,
    workers: SharedWorkerRegistry,
}

impl BoundDispatcher {
    pub fn worker_addr(&self) -> SocketAddr {
        self.worker_addr
    }

    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let BoundDispatcher {
            worker_listener,
            api_listener,
            tasks,
            workers,
            ..
        } = self;

        let worker_tasks = tasks.clone();
        let worker_workers = workers.clone();
        let worker_loop = tokio::spawn(async move {
            loop {
                let (stream, addr) = match worker_listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "worker listener accept failed");
                        continue;
                    }
                };
                let workers = worker_workers.clone();
                let tasks = worker_tasks.clone();
                tokio::spawn(async move {
                    worker_handler::handle_worker_connection(stream, addr, workers, tasks).await;
                });
            }
        });

        let api_loop = tokio::spawn(async move {
            loop {
                let (stream, _addr) = match api_listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "api listener accept failed");
                        continue;
                    }
                };
                let workers = workers.clone();
                let tasks = tasks.clone();
                tokio::spawn(async move {
                    api_handler::handle_api_connection(stream, workers, tasks).await;
                });
            }
        });

        let _ = tokio::join!(worker_loop, api_loop);
        Ok(())
    }
}
