use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use ccexec::config::{CliArgs, Config};
use ccexec::diagnostic::Interpreter;
use ccexec::engine::{DockerRunner, JobQueue, LocalEngine, worker};
use ccexec::routes::AppState;
use ccexec::task::{DEFAULT_IMAGE, TaskBuilder};
use ccexec::web_server::build_server;

const DEFAULT_WORKERS: u8 = 2;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let Config {
        server: server_config,
        engine: engine_config,
        toolchain,
    } = cli.to_config().expect("Failed to load configuration");

    let n_workers = engine_config.workers.unwrap_or(DEFAULT_WORKERS);
    if n_workers == 0 {
        panic!("The number of worker threads must not be 0");
    }

    let work_dir = match engine_config.work_dir {
        Some(dir) => dir,
        None => DockerRunner::default_work_dir().expect("Failed to locate work dir"),
    };
    let runner = Arc::new(
        DockerRunner::build(engine_config.docker.unwrap_or("docker".to_string()), work_dir)
            .expect("Failed to initialize task runner"),
    );

    let mode = toolchain.capture_mode;
    log::info!("Capture mode: {mode:?}");

    let job_queue = Arc::new(JobQueue::new());
    let state = AppState {
        engine: Arc::new(LocalEngine::new(job_queue.clone())),
        builder: TaskBuilder::new(toolchain.image.unwrap_or(DEFAULT_IMAGE.to_string()), mode),
        interpreter: Interpreter::new(mode),
        request_timeout: server_config.request_timeout(),
    };
    let shutdown_token = CancellationToken::new();

    // ======= PREPARATION END, EXECUTION START =======

    let mut workers = JoinSet::new();
    for i in 1..=n_workers {
        workers.spawn(worker(
            i,
            runner.clone(),
            job_queue.clone(),
            shutdown_token.clone(),
        ));
    }

    let server = build_server(server_config, state).expect("Failed to build server");

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
        Some(res_worker) = workers.join_next() => {
            log::error!("A worker terminated unexpectedly: {:?}", res_worker);
        }
    }

    // 1. Shutdown actix-web server gracefully
    server_handle.stop(true).await;

    // 2. Refuse new jobs and release requests still waiting in the queue
    job_queue.close();

    // 3. Broadcast shutdown signal to workers
    shutdown_token.cancel();
    log::info!("Shutdown signal sent to workers, waiting for them to finish...");

    // 4. Wait until every worker terminates
    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            if e.is_panic() {
                log::error!("Worker handle panicked: {:?}", e);
            } else {
                log::error!("Worker handle finished with error: {:?}", e);
            }
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}
