//! The running node: store, backlog, admission and background tasks.

use std::sync::Arc;
use std::time::Duration;

use fedchain_ledger::{init_genesis, AdmissionValidator, BacklogManager, ReassignReport};
use fedchain_nullables::NullStore;
use fedchain_store::{BackendKind, BacklogStore, LedgerStore, QueryRegistry};
use fedchain_store_lmdb::LmdbStore;
use fedchain_types::{Block, Clock, KeyPair, SystemClock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{NodeConfig, NodeError, NodeMetrics, ShutdownController, WorkerPool};

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry with every backend this build knows about.
pub fn default_registry() -> Result<QueryRegistry, NodeError> {
    let mut registry = QueryRegistry::new();
    registry.register(BackendKind::Lmdb, LmdbStore::factory())?;
    registry.register(BackendKind::Memory, NullStore::factory())?;
    Ok(registry)
}

pub struct FedNode {
    pub config: NodeConfig,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: Arc<ShutdownController>,
    pub(crate) store: Arc<dyn LedgerStore>,
    pub(crate) backlog: Arc<BacklogManager>,
    pub(crate) validator: Arc<AdmissionValidator>,
    pub(crate) pool: WorkerPool,
    pub(crate) clock: Arc<dyn Clock>,
    keypair: Arc<KeyPair>,
    genesis: Block,
    task_handles: Vec<JoinHandle<()>>,
}

impl FedNode {
    /// Open the configured backend and write genesis on first start.
    pub async fn new(config: NodeConfig, keypair: KeyPair) -> Result<Self, NodeError> {
        let registry = default_registry()?;
        Self::with_parts(config, keypair, &registry, Arc::new(SystemClock)).await
    }

    /// As [`new`](Self::new), with an explicit registry and clock.
    pub async fn with_parts(
        config: NodeConfig,
        keypair: KeyPair,
        registry: &QueryRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let store = registry.open(&config.backend_config())?;

        let mut federation = config.federation.clone();
        if !federation.contains(&keypair.public) {
            warn!(node = %keypair.public, "node key missing from federation, adding it");
            federation.push(keypair.public);
        }

        let pool = WorkerPool::new(config.pool_size);
        let keypair = Arc::new(keypair);

        let genesis = {
            let store = Arc::clone(&store);
            let keypair = Arc::clone(&keypair);
            let voters = federation.clone();
            let now = clock.now();
            pool.run(move || init_genesis(&*store, &keypair, voters, now))
                .await??
        };

        let backlog = Arc::new(BacklogManager::new(
            Arc::clone(&store),
            federation,
            config.reassign_delay_secs,
        ));
        let validator = Arc::new(AdmissionValidator::new(Arc::clone(&store)));

        info!(
            backend = %config.backend,
            node = %keypair.public,
            federation = backlog.federation().len(),
            genesis = %genesis.id,
            "fedchain node ready"
        );

        Ok(Self {
            config,
            metrics: Arc::new(NodeMetrics::new()?),
            shutdown: Arc::new(ShutdownController::new()),
            store,
            backlog,
            validator,
            pool,
            clock,
            keypair,
            genesis,
            task_handles: Vec::new(),
        })
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn public_key(&self) -> fedchain_types::PublicKey {
        self.keypair.public
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    pub fn federation(&self) -> &[fedchain_types::PublicKey] {
        self.backlog.federation()
    }

    /// One reassignment sweep at the clock's current time.
    pub async fn reassign_once(&self) -> Result<ReassignReport, NodeError> {
        sweep(&self.backlog, &self.pool, &self.metrics, self.clock.now()).await
    }

    /// Start background tasks.
    pub fn start(&mut self) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let backlog = Arc::clone(&self.backlog);
        let pool = self.pool.clone();
        let metrics = Arc::clone(&self.metrics);
        let clock = Arc::clone(&self.clock);
        let period = Duration::from_secs(self.config.reassign_interval_secs);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("reassignment task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = sweep(&backlog, &pool, &metrics, clock.now()).await {
                            warn!(error = %e, kind = ?e.kind(), "backlog reassignment failed");
                        }
                    }
                }
            }
        });
        self.task_handles.push(handle);
        info!(
            interval_secs = self.config.reassign_interval_secs,
            "backlog reassignment task started"
        );
    }

    /// Signal every task and wait for them to finish.
    pub async fn stop(&mut self) {
        info!("fedchain node stopping");
        self.shutdown.shutdown();
        for handle in self.task_handles.drain(..) {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                warn!("background task did not stop in time");
            }
        }
    }

    /// Run until SIGINT/SIGTERM.
    pub async fn run(&mut self) {
        self.start();
        let shutdown = Arc::clone(&self.shutdown);
        shutdown.wait_for_signal().await;
        self.stop().await;
    }
}

async fn sweep(
    backlog: &Arc<BacklogManager>,
    pool: &WorkerPool,
    metrics: &NodeMetrics,
    now: fedchain_types::Timestamp,
) -> Result<ReassignReport, NodeError> {
    let worker = Arc::clone(backlog);
    let (report, pending) = pool
        .run(move || -> Result<_, NodeError> {
            let report = worker.reassign_stale(now)?;
            let pending = worker.store().count_backlog()?;
            Ok((report, pending))
        })
        .await??;
    metrics.backlog_reassigned.inc_by(report.reassigned as u64);
    metrics.backlog_size.set(pending as i64);
    if report.examined > 0 {
        info!(
            examined = report.examined,
            reassigned = report.reassigned,
            lost_race = report.lost_race,
            "backlog sweep finished"
        );
    }
    Ok(report)
}
