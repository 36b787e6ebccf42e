//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::SourceConfig;
use crate::cursor::{bson_order, encode_cursor_value};
use crate::error::{Error, Result};
use crate::schema::TableInfo;
use crate::source::{CheckResult, DocumentSource};
use crate::store::{DocumentStore, MongoStore};
use crate::types::{SyncMode, ID_FIELD};
use bson::Bson;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check { config_json } => self.check(config_json.as_deref()).await,
            Commands::Discover {
                config_json,
                sample,
            } => self.discover(config_json.as_deref(), *sample).await,
            Commands::Streams { config_json } => self.streams(config_json.as_deref()).await,
            Commands::Read {
                config_json,
                streams,
                sync_mode,
                cursor_field,
                cursor,
                max_records,
            } => {
                let options = ReadOptions {
                    sync_mode: SyncMode::from(*sync_mode),
                    cursor_field: cursor_field.as_deref(),
                    cursor: cursor.as_deref(),
                    max_records: *max_records,
                };
                self.read(config_json.as_deref(), streams.as_deref(), &options)
                    .await
            }
        }
    }

    /// Load configuration
    fn load_config(&self, inline: Option<&str>) -> Result<SourceConfig> {
        // Inline config takes precedence
        if let Some(json_str) = inline {
            return SourceConfig::from_json_str(json_str);
        }

        if let Some(path) = &self.cli.config {
            return SourceConfig::from_file(path);
        }

        Err(Error::config(
            "Config not specified (use --config or --config-json)",
        ))
    }

    /// Connect and build a source with the configured sample bound
    async fn open_source(&self, config: &SourceConfig) -> Result<DocumentSource> {
        let store = MongoStore::connect(config).await?;
        Ok(DocumentSource::with_sample_size(
            Box::new(store),
            config.sample_size,
        ))
    }

    /// Check connection
    async fn check(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking connection to database '{}'", config.database)
            }
        }));

        let result = match self.open_source(&config).await {
            Ok(source) => source.check().await,
            Err(e) => CheckResult::failure(format!("Unable to connect: {e}")),
        };

        let status = if result.success { "SUCCEEDED" } else { "FAILED" };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": status,
                "message": result.message
            }
        }));

        Ok(())
    }

    /// Discover collections
    async fn discover(&self, config_json: Option<&str>, sample: Option<u32>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let sample_size = resolve_sample_size(sample, &config)?;
        let store = MongoStore::connect(&config).await?;
        let source = DocumentSource::with_sample_size(Box::new(store), sample_size);

        let catalog = source.discover().await?;

        for failure in &catalog.failures {
            self.output_message(&json!({
                "type": "LOG",
                "log": {
                    "level": "WARN",
                    "message": format!(
                        "Skipping collection '{}': {}",
                        failure.collection, failure.error
                    )
                }
            }));
        }

        let streams: Vec<Value> = catalog.tables.iter().map(catalog_stream).collect();

        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": {
                "streams": streams
            }
        }));

        Ok(())
    }

    /// List collection names (no sampling)
    async fn streams(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let store = MongoStore::connect(&config).await?;
        let names = store.list_collection_names().await?;

        self.output_message(&json!({
            "type": "STREAMS",
            "streams": names,
            "database": config.database
        }));

        Ok(())
    }

    /// Read records
    async fn read(
        &self,
        config_json: Option<&str>,
        streams: Option<&str>,
        options: &ReadOptions<'_>,
    ) -> Result<()> {
        if options.sync_mode == SyncMode::FullRefresh && options.cursor.is_some() {
            return Err(Error::config("--cursor requires --sync-mode incremental"));
        }

        let sync_start = Instant::now();
        let config = self.load_config(config_json)?;
        let source = self.open_source(&config).await?;

        let catalog = source.discover().await?;
        for failure in &catalog.failures {
            self.output_message(&json!({
                "type": "LOG",
                "log": {
                    "level": "WARN",
                    "message": format!(
                        "Skipping collection '{}': {}",
                        failure.collection, failure.error
                    )
                }
            }));
        }

        // Explicit selection of an undiscovered stream is an error; with no
        // selection every discovered collection syncs.
        let selected: Vec<&TableInfo> = match streams {
            Some(list) => {
                let mut tables = Vec::new();
                for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    let table = catalog.table(name).ok_or_else(|| Error::StreamNotFound {
                        stream: name.to_string(),
                    })?;
                    tables.push(table);
                }
                tables
            }
            None => catalog.tables.iter().collect(),
        };

        let mut stream_results: Vec<Value> = Vec::new();
        let mut total_records = 0usize;

        for table in selected {
            let stream_start = Instant::now();

            self.output_message(&json!({
                "type": "LOG",
                "log": {
                    "level": "INFO",
                    "message": format!("Starting sync for stream: {}", table.name)
                }
            }));

            let mut progress = StreamProgress::default();
            let outcome = self
                .sync_stream(&source, table, options, &mut progress)
                .await;
            let stream_duration_ms = stream_start.elapsed().as_millis() as u64;
            total_records += progress.records_synced;

            // Both outcomes report the records actually emitted; a failed
            // stream keeps its partial count and any high-water it reached.
            let mut stream_result = json!({
                "stream": table.name,
                "status": if outcome.is_ok() { "SUCCESS" } else { "FAILED" },
                "records_synced": progress.records_synced,
                "duration_ms": stream_duration_ms
            });
            if let Some(cursor_value) = progress.cursor_value() {
                stream_result["cursor_value"] = json!(cursor_value);
            }

            match outcome {
                Ok(()) => {
                    self.output_message(&json!({
                        "type": "LOG",
                        "log": {
                            "level": "INFO",
                            "message": format!(
                                "Completed sync for {}: {} records",
                                table.name, progress.records_synced
                            )
                        }
                    }));
                }
                Err(e) => {
                    self.output_message(&json!({
                        "type": "LOG",
                        "log": {
                            "level": "ERROR",
                            "message": format!("Error syncing stream {}: {}", table.name, e)
                        }
                    }));
                    stream_result["error"] = json!(e.to_string());
                }
            }
            stream_results.push(stream_result);
        }

        let total_duration_ms = sync_start.elapsed().as_millis() as u64;
        let successful_streams = stream_results
            .iter()
            .filter(|r| r["status"] == "SUCCESS")
            .count();
        let failed_streams = stream_results
            .iter()
            .filter(|r| r["status"] == "FAILED")
            .count();

        self.output_message(&json!({
            "type": "SYNC_SUMMARY",
            "summary": {
                "status": if failed_streams == 0 { "SUCCEEDED" } else if successful_streams == 0 { "FAILED" } else { "PARTIAL" },
                "database": config.database,
                "total_records": total_records,
                "total_streams": stream_results.len(),
                "successful_streams": successful_streams,
                "failed_streams": failed_streams,
                "duration_ms": total_duration_ms,
                "streams": stream_results
            }
        }));

        Ok(())
    }

    /// Sync one stream, emitting RECORD messages.
    ///
    /// The record count and, for incremental mode, the highest cursor
    /// value observed accumulate through `progress`, so a mid-stream
    /// failure still reports what was emitted before it.
    async fn sync_stream(
        &self,
        source: &DocumentSource,
        table: &TableInfo,
        options: &ReadOptions<'_>,
        progress: &mut StreamProgress,
    ) -> Result<()> {
        let field = options.cursor_field.unwrap_or(ID_FIELD);

        let mut stream = match options.sync_mode {
            SyncMode::FullRefresh => source.read_full_refresh(table).await?,
            SyncMode::Incremental => match options.cursor {
                Some(checkpoint) => source.read_incremental(table, field, checkpoint).await?,
                // First incremental sync has no checkpoint yet
                None => source.read_full_refresh(table).await?,
            },
        };

        let emitted_at = chrono::Utc::now().timestamp_millis();

        while let Some(record) = stream.next().await? {
            if options.sync_mode == SyncMode::Incremental {
                if let Some(value) = record.get(field) {
                    progress.advance(value);
                }
            }

            self.output_message(&json!({
                "type": "RECORD",
                "record": {
                    "stream": table.name,
                    "data": record.into_json(),
                    "emitted_at": emitted_at
                }
            }));
            progress.records_synced += 1;

            if options
                .max_records
                .is_some_and(|max| progress.records_synced >= max)
            {
                stream.close();
                break;
            }
        }

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Options shared by every stream of one `read` invocation.
struct ReadOptions<'a> {
    sync_mode: SyncMode,
    cursor_field: Option<&'a str>,
    cursor: Option<&'a str>,
    max_records: Option<usize>,
}

/// Per-stream progress, accumulated outside the fallible sync so a
/// mid-stream failure cannot discard it.
#[derive(Default)]
struct StreamProgress {
    records_synced: usize,
    high_water: Option<Bson>,
}

impl StreamProgress {
    /// Raise the high-water mark if `value` orders above it.
    fn advance(&mut self, value: &Bson) {
        let raised = match &self.high_water {
            Some(current) => bson_order(value, current) == Some(Ordering::Greater),
            None => true,
        };
        if raised {
            self.high_water = Some(value.clone());
        }
    }

    /// Encoded checkpoint for the highest cursor value observed.
    fn cursor_value(&self) -> Option<String> {
        self.high_water.as_ref().map(encode_cursor_value)
    }
}

/// Resolve the discovery sample bound, preferring the CLI override.
///
/// The override bypasses config validation, so it gets the same floor:
/// MongoDB treats `limit: 0` as unlimited, which would turn a bounded
/// sample into a full collection scan.
fn resolve_sample_size(sample: Option<u32>, config: &SourceConfig) -> Result<u32> {
    match sample {
        Some(0) => Err(Error::config("sample_size must be at least 1")),
        Some(bound) => Ok(bound),
        None => Ok(config.sample_size),
    }
}

/// Project a discovered table into a catalog stream entry
fn catalog_stream(table: &TableInfo) -> Value {
    let primary_key: Vec<Vec<String>> = table
        .primary_keys
        .iter()
        .map(|k| vec![k.clone()])
        .collect();

    json!({
        "name": table.name,
        "namespace": table.namespace,
        "json_schema": table.json_schema(),
        "supported_sync_modes": ["full_refresh", "incremental"],
        "source_defined_primary_key": primary_key
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn test_runner() -> Runner {
        Runner::new(Cli {
            config: None,
            format: OutputFormat::Json,
            verbose: false,
            command: Commands::Streams { config_json: None },
        })
    }

    fn orders_store() -> MemoryStore {
        let mut store = MemoryStore::new("shop");
        store.insert("orders", doc! { "_id": 1, "amount": 10 });
        store.insert("orders", doc! { "_id": 2, "amount": 20 });
        store.insert("orders", doc! { "_id": 3, "amount": 30 });
        store
    }

    fn incremental() -> ReadOptions<'static> {
        ReadOptions {
            sync_mode: SyncMode::Incremental,
            cursor_field: None,
            cursor: None,
            max_records: None,
        }
    }

    #[tokio::test]
    async fn test_interrupted_stream_keeps_partial_progress() {
        let mut store = orders_store();
        store.fail_scan_after("orders", 1);
        let source = DocumentSource::new(Box::new(store));
        let catalog = source.discover().await.unwrap();
        let table = catalog.table("orders").unwrap();

        let mut progress = StreamProgress::default();
        let err = test_runner()
            .sync_stream(&source, table, &incremental(), &mut progress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StreamDecode { .. }));

        // The record emitted before the failure stays counted, and the
        // cursor value it carried survives as the resume point
        assert_eq!(progress.records_synced, 1);
        assert_eq!(progress.cursor_value(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_completed_stream_reports_count_and_high_water() {
        let source = DocumentSource::new(Box::new(orders_store()));
        let catalog = source.discover().await.unwrap();
        let table = catalog.table("orders").unwrap();

        let options = ReadOptions {
            cursor: Some("1"),
            ..incremental()
        };
        let mut progress = StreamProgress::default();
        test_runner()
            .sync_stream(&source, table, &options, &mut progress)
            .await
            .unwrap();

        assert_eq!(progress.records_synced, 2);
        assert_eq!(progress.cursor_value(), Some("3".to_string()));
    }

    #[test]
    fn test_progress_high_water_ignores_regressions() {
        let mut progress = StreamProgress::default();
        progress.advance(&Bson::Int32(5));
        progress.advance(&Bson::Int32(3));
        progress.advance(&Bson::Int32(9));
        assert_eq!(progress.cursor_value(), Some("9".to_string()));
    }

    #[test]
    fn test_sample_override_rejects_zero() {
        let config = SourceConfig::from_json_str(
            r#"{"connection_string": "mongodb://localhost:27017", "database": "shop"}"#,
        )
        .unwrap();

        assert_eq!(
            resolve_sample_size(None, &config).unwrap(),
            config.sample_size
        );
        assert_eq!(resolve_sample_size(Some(25), &config).unwrap(), 25);

        let err = resolve_sample_size(Some(0), &config).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("at least 1"));
    }
}
