// /////////////////////////////////////////////////////////////////////////////
// Streaming Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Entry Point
//!
//! Wires the bootstrap crate's CLI, signal handling and shutdown
//! coordination to the runtime crate's core: configuration, buffer
//! manager, task queue, pipeline registry, worker pool, and - when a
//! `tcp_source` is configured - a source runtime pulling off its own OS
//! thread per `spec.md` §5's thread-pool-for-compute /
//! `tokio`-for-transport split.

use std::process::ExitCode;
use std::sync::Arc;

use streaming_engine_bootstrap::cli::ValidatedCommand;
use streaming_engine_bootstrap::shutdown::ShutdownCoordinator;
use streaming_engine_bootstrap::{bootstrap_cli, result_to_exit_code, ExitCode as EngineExitCode};
use streaming_engine_domain::entities::HandlerTable;
use streaming_engine_domain::error::{EngineError, EngineResult};
use streaming_engine_domain::value_objects::{OriginId, PipelineId};

use streaming_engine_runtime::buffer::BufferManager;
use streaming_engine_runtime::config::{self, EngineConfig};
use streaming_engine_runtime::logging;
use streaming_engine_runtime::pipeline::{PipelineContextImpl, PipelineRegistry, SinkPipeline};
use streaming_engine_runtime::sink::{FileSink, NullSink};
use streaming_engine_runtime::source::{RateLimiter, RawCopyParser, SourceRuntime, TcpSource};
use streaming_engine_runtime::task::{TaskQueue, WorkerPool};
use streaming_engine_runtime::windowing::pipeline::INPUT_TUPLE_SIZE;
use streaming_engine_runtime::windowing::{WindowOperator, WindowPipeline, WindowSpec};

const SOURCE_ORIGIN: OriginId = OriginId(0);
const WINDOW_PIPELINE: PipelineId = PipelineId(1);
const SINK_PIPELINE: PipelineId = PipelineId(2);
const DEFAULT_TUPLE_SIZE: usize = INPUT_TUPLE_SIZE;
/// Demo dataflow's window: 1s tumbling over the `{ts, key, value}` tuples
/// `RawCopyParser` hands up from the wire, matching `windowing::pipeline`'s
/// fixed input layout (`spec.md` §4.5, §8 scenario 1).
const DEMO_WINDOW_MILLIS: i64 = 1000;

fn main() -> ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("argument error: {err}");
            return EngineExitCode::UsageError.into();
        }
    };

    match &cli.command {
        ValidatedCommand::Validate { config } => {
            let result = config::validate_file(config);
            if let Err(err) = &result {
                eprintln!("configuration invalid: {err}");
            }
            result_to_exit_code(result)
        }
        ValidatedCommand::Run { config: config_path, workers } => {
            let config = match config::load(Some(config_path)) {
                Ok(c) => c,
                Err(err) => {
                    eprintln!("failed to load configuration: {err}");
                    return EngineExitCode::Config.into();
                }
            };
            logging::init(config.log_level);
            let workers = workers.unwrap_or(config.worker.num_workers);
            result_to_exit_code(run(config, workers))
        }
    }
}

fn run(config: EngineConfig, num_workers: usize) -> EngineResult<()> {
    let buffer_config = config.buffer.to_domain()?;
    let buffers = Arc::new(BufferManager::new(buffer_config, SOURCE_ORIGIN)?);
    let queue = TaskQueue::new();

    let sink_ctx = Arc::new(PipelineContextImpl::new(buffers.clone(), queue.clone(), SOURCE_ORIGIN, SINK_PIPELINE));
    let sink_pipeline: Arc<dyn streaming_engine_domain::ports::Pipeline> = match config.sink.target.as_deref() {
        None | Some("null") => Arc::new(SinkPipeline::new(NullSink::new())),
        Some(path) => Arc::new(SinkPipeline::new(FileSink::new(path))),
    };

    // source -> window -> sink: the window stage aggregates the raw
    // tuples the source hands up before they reach the sink, per
    // `SPEC_FULL.md`'s demo dataflow.
    let window_ctx = Arc::new(PipelineContextImpl::new(buffers.clone(), queue.clone(), SOURCE_ORIGIN, WINDOW_PIPELINE));
    let mut window_handlers = HandlerTable::new();
    let window_handler = window_handlers.register(Box::new(WindowOperator::new(WindowSpec::tumbling(DEMO_WINDOW_MILLIS))));
    window_ctx.install_handlers(window_handlers);
    let window_pipeline: Arc<dyn streaming_engine_domain::ports::Pipeline> = Arc::new(WindowPipeline::new(window_handler, SINK_PIPELINE));

    let mut registry = PipelineRegistry::new();
    registry.register(WINDOW_PIPELINE, window_pipeline, window_ctx);
    registry.register(SINK_PIPELINE, sink_pipeline, sink_ctx);
    registry.set_topological_order(vec![WINDOW_PIPELINE, SINK_PIPELINE]);
    registry.setup_all()?;
    let registry = Arc::new(registry);

    let pool = WorkerPool::start(num_workers.max(1), queue.clone(), registry.clone());
    tracing::info!(workers = pool.worker_count(), "worker pool started");

    let source_handle = config.tcp_source.clone().map(|tcp_config| {
        let buffers = buffers.clone();
        let queue = queue.clone();
        std::thread::Builder::new()
            .name("engine-tcp-source".into())
            .spawn(move || -> EngineResult<()> {
                let parser = Box::new(RawCopyParser { tuple_size: DEFAULT_TUPLE_SIZE });
                let source = Box::new(TcpSource::new(tcp_config, parser));
                let mut runtime =
                    SourceRuntime::new(source, buffers, queue, WINDOW_PIPELINE, SOURCE_ORIGIN, RateLimiter::unlimited());
                runtime.run()
            })
            .expect("failed to spawn tcp source thread")
    });

    let shutdown = ShutdownCoordinator::default();
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|e| EngineError::io(e.to_string(), false))?;
    rt.block_on(async {
        let handler = streaming_engine_bootstrap::signals::create_signal_handler();
        let shutdown = shutdown.clone();
        handler.wait_for_signal(Box::new(move || shutdown.initiate_shutdown())).await;
    });

    tracing::info!("shutdown signal received, draining task queue");
    queue.begin_drain();
    pool.join();
    registry.graceful_stop()?;

    if let Some(handle) = source_handle {
        if let Err(err) = handle.join().unwrap_or_else(|_| Err(EngineError::fatal("tcp source thread panicked"))) {
            tracing::warn!(error = %err, "tcp source runtime exited with an error");
        }
    }

    Ok(())
}
