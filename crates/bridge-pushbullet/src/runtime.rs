use std::{sync::Arc, time::Duration};

use bridge_core::{
    ActionSink, BridgeChannelError, BridgeChannels, BridgeCommand, BridgeError,
    BridgeErrorCategory, BridgeInitConfig, EventStream, OutboundOutcome, StatusSink,
    normalize_outbound_outcome, truncate_status,
};
use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    engine::{ReconciliationEngine, SharedWatermark},
    http::PushApiClient,
    listener::StreamListener,
    websocket::WsConnector,
};

type ChannelEngine = ReconciliationEngine<PushApiClient, BridgeChannels, BridgeChannels>;

#[derive(Clone, Debug)]
pub struct BridgeRuntimeHandle {
    channels: BridgeChannels,
}

impl BridgeRuntimeHandle {
    pub async fn send(&self, command: BridgeCommand) -> Result<(), BridgeChannelError> {
        self.channels.send_command(command).await
    }

    pub fn subscribe(&self) -> EventStream {
        self.channels.subscribe()
    }

    pub async fn initialize(
        &self,
        access_token: impl Into<String>,
    ) -> Result<(), BridgeChannelError> {
        self.send(BridgeCommand::Initialize {
            access_token: access_token.into(),
        })
        .await
    }

    /// Ring the doorbell and return the generated transaction id.
    pub async fn doorbell(&self) -> Result<String, BridgeChannelError> {
        let client_txn_id = Uuid::new_v4().to_string();
        self.send(BridgeCommand::Doorbell {
            client_txn_id: client_txn_id.clone(),
        })
        .await?;
        Ok(client_txn_id)
    }

    pub async fn reconcile(&self) -> Result<(), BridgeChannelError> {
        self.send(BridgeCommand::Reconcile).await
    }
}

/// Spawn the bridge runtime on the current tokio runtime.
pub fn spawn_runtime(config: BridgeInitConfig) -> BridgeRuntimeHandle {
    let (channels, command_rx) = BridgeChannels::new(64, 512);
    let runtime = BridgeRuntime::new(config, channels.clone(), command_rx);
    tokio::spawn(async move {
        runtime.run().await;
    });

    BridgeRuntimeHandle { channels }
}

struct RunningListener {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

struct BridgeRuntime {
    config: BridgeInitConfig,
    channels: BridgeChannels,
    command_rx: mpsc::Receiver<BridgeCommand>,
    engine: Option<Arc<ChannelEngine>>,
    access_token: Option<String>,
    watermark: SharedWatermark,
    listener: Option<RunningListener>,
    host_passes: JoinSet<()>,
}

impl BridgeRuntime {
    fn new(
        config: BridgeInitConfig,
        channels: BridgeChannels,
        command_rx: mpsc::Receiver<BridgeCommand>,
    ) -> Self {
        Self {
            config,
            channels,
            command_rx,
            engine: None,
            access_token: None,
            watermark: SharedWatermark::default(),
            listener: None,
            host_passes: JoinSet::new(),
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            debug!(?command, "bridge command");
            if let Err(err) = self.handle_command(command).await {
                self.report_error(&err);
            }
        }
        self.stop_listener().await;
    }

    async fn handle_command(&mut self, command: BridgeCommand) -> Result<(), BridgeError> {
        match command {
            BridgeCommand::Initialize { access_token } => {
                self.handle_initialize(access_token).await
            }
            BridgeCommand::Doorbell { client_txn_id } => {
                self.handle_doorbell(client_txn_id);
                Ok(())
            }
            BridgeCommand::Reconcile => self.handle_reconcile(),
        }
    }

    async fn handle_initialize(&mut self, access_token: String) -> Result<(), BridgeError> {
        let access_token = access_token.trim().to_owned();
        if access_token.is_empty() {
            return Err(BridgeError::new(
                BridgeErrorCategory::Config,
                "missing_access_token",
                "access token is empty",
            ));
        }

        self.stop_listener().await;

        let engine = match (&self.engine, &self.access_token) {
            (Some(engine), Some(current)) if *current == access_token => Arc::clone(engine),
            _ => {
                let client =
                    PushApiClient::new(&self.config.api_base, &*access_token, self.timeout())?;
                Arc::new(ReconciliationEngine::with_watermark(
                    client,
                    self.channels.clone(),
                    self.channels.clone(),
                    Arc::clone(&self.watermark),
                ))
            }
        };
        self.engine = Some(Arc::clone(&engine));
        self.access_token = Some(access_token.clone());
        engine.report("initialize");

        let connector = WsConnector::new(&self.config.stream_base, self.timeout());
        let stop = CancellationToken::new();
        let stop_child = stop.child_token();
        let task = tokio::spawn(async move {
            let initial_pass = async {
                tokio::select! {
                    biased;
                    _ = stop_child.cancelled() => {}
                    _ = engine.reconcile() => {}
                }
            };
            let listen = async {
                let mut listener = StreamListener::new(connector);
                if let Err(err) = listener
                    .run(Arc::clone(&engine), &access_token, stop_child.clone())
                    .await
                {
                    engine.report_error(&err);
                }
            };
            tokio::join!(initial_pass, listen);
        });

        self.listener = Some(RunningListener { stop, task });
        Ok(())
    }

    fn handle_doorbell(&self, client_txn_id: String) {
        let Some(engine) = self.engine.clone() else {
            let error = BridgeError::not_initialized("doorbell");
            self.report_error(&error);
            self.channels.on_outbound_complete(&normalize_outbound_outcome(
                client_txn_id,
                &OutboundOutcome::Failure { error },
            ));
            return;
        };

        tokio::spawn(async move {
            engine.notify_doorbell(&client_txn_id).await;
        });
    }

    fn handle_reconcile(&mut self) -> Result<(), BridgeError> {
        let engine = self
            .engine
            .clone()
            .ok_or_else(|| BridgeError::not_initialized("reconcile"))?;

        while self.host_passes.try_join_next().is_some() {}
        self.host_passes.spawn(async move {
            let _ = engine.reconcile().await;
        });
        Ok(())
    }

    /// Cancel the stream task and any host-requested pass. Both end at their
    /// next await point, so this never waits on a silent service.
    async fn stop_listener(&mut self) {
        self.host_passes.abort_all();
        if let Some(running) = self.listener.take() {
            running.stop.cancel();
            let _ = running.task.await;
        }
        while self.host_passes.join_next().await.is_some() {}
    }

    fn report_error(&self, err: &BridgeError) {
        match &self.engine {
            Some(engine) => engine.report_error(err),
            None => {
                warn!(category = ?err.category, code = %err.code, "{}", err.message);
                self.channels.on_status(false, truncate_status(&err.message));
            }
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.request_timeout_ms.map(Duration::from_millis)
    }
}
