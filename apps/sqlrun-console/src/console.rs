use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use sqlrun_client::RequestClient;
use sqlrun_core::{FileStorage, MemoryStorage, QueryHistory, Settings};
use sqlrun_telemetry::{LogLevel, LogSink, Logger, MemorySink, SessionId, TracingSink};
use tracing::info;

use crate::commands::{Command, HELP};
use crate::editor::Editor;
use crate::render;

const LOG_CAPACITY: usize = 200;
const LOG_SHOWN: usize = 20;

/// What the REPL should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Silent,
    Quit,
}

/// The interactive shell: owns the client, the editor and the history.
#[derive(Debug)]
pub struct Console {
    client: RequestClient,
    editor: Editor,
    history: Arc<QueryHistory>,
    logger: Logger,
    log: Arc<MemorySink>,
    tables: Vec<String>,
}

impl Console {
    /// Wire everything up from resolved settings and load the table list.
    ///
    /// The session id lives in process-scoped storage; history is durable
    /// under `settings.storage_dir`. A failure to list tables aborts startup.
    pub async fn start(settings: &Settings) -> Result<Self> {
        let min_level: LogLevel = settings
            .min_level
            .parse()
            .with_context(|| format!("telemetry.min_level {:?}", settings.min_level))?;
        let session = SessionId::get_or_create(&MemoryStorage::new())
            .context("creating session id")?;
        let log = Arc::new(MemorySink::new(LOG_CAPACITY));
        let logger = Logger::builder(session)
            .environment(settings.environment.clone())
            .user_agent(settings.user_agent.clone())
            .url(settings.base_url.clone())
            .min_level(min_level)
            .sink(Arc::new(TracingSink))
            .sink(log.clone() as Arc<dyn LogSink>)
            .build();

        let client = RequestClient::new(&settings.base_url, settings.timeout, logger.clone())
            .map_err(|e| anyhow!("building HTTP client: {e}"))?;
        let history = Arc::new(QueryHistory::new(Arc::new(FileStorage::new(
            settings.storage_dir.clone(),
        ))));
        let editor = Editor::new(client.clone(), history.clone(), logger.clone());

        let mut console = Console {
            client,
            editor,
            history,
            logger,
            log,
            tables: Vec::new(),
        };
        console.refresh_tables().await?;
        info!(
            session_id = %console.logger.session_id(),
            tables = console.tables.len(),
            "console ready"
        );
        Ok(console)
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn refresh_tables(&mut self) -> Result<()> {
        let response = self
            .client
            .list_tables()
            .await
            .context("loading tables from backend")?;
        if !response.success {
            bail!(
                "backend refused to list tables: {}",
                response.error.as_deref().unwrap_or("Unknown error")
            );
        }
        self.tables = response.tables;
        Ok(())
    }

    pub async fn handle(&mut self, line: &str) -> Reply {
        let Some(command) = Command::parse(line) else {
            return Reply::Silent;
        };
        match command {
            Command::Sql(sql) => Reply::Output(self.run(&sql).await),
            Command::Rerun(n) => {
                let history = self.history.get_history();
                match history.get(n - 1) {
                    Some(entry) => {
                        let sql = entry.query.clone();
                        Reply::Output(format!("{sql}\n{}", self.run(&sql).await))
                    }
                    None => Reply::Output(format!(
                        "Error: no history entry {n} ({} stored)",
                        history.len()
                    )),
                }
            }
            Command::Tables => match self.refresh_tables().await {
                Ok(()) => Reply::Output(render::render_tables(&self.tables)),
                Err(err) => Reply::Output(format!("Error: {err:#}")),
            },
            Command::Describe(table) => {
                self.logger
                    .log_user_action("VIEW_TABLE", json!({ "tableName": table }));
                match self.client.table_detail(&table).await {
                    Ok(detail) => Reply::Output(render::render_table_detail(&table, &detail)),
                    Err(err) => Reply::Output(format!("Error: {}", err.user_message())),
                }
            }
            Command::History => {
                Reply::Output(render::render_history(&self.history.get_history()))
            }
            Command::HistoryClear => {
                self.history.clear_history();
                self.logger.log_user_action("CLEAR_HISTORY", json!({}));
                Reply::Output("History cleared".to_string())
            }
            Command::Health => match self.client.health().await {
                Ok(health) => Reply::Output(match health.message {
                    Some(message) => format!("{} ({message})", health.status),
                    None => health.status,
                }),
                Err(err) => Reply::Output(format!("Error: {}", err.user_message())),
            },
            Command::Log => {
                let entries = self.log.entries();
                let skip = entries.len().saturating_sub(LOG_SHOWN);
                Reply::Output(render::render_log(&entries[skip..]))
            }
            Command::Help => Reply::Output(HELP.to_string()),
            Command::Quit => Reply::Quit,
            Command::Invalid(message) => Reply::Output(message),
        }
    }

    async fn run(&self, sql: &str) -> String {
        let outcome = self.editor.submit(sql).await;
        self.editor.reset();
        match outcome {
            Ok(run) => render::render_run(&run),
            Err(rejected) => format!("Error: {rejected}"),
        }
    }
}
