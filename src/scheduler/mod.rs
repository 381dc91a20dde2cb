//! Concurrent per-sample scheduling with fault isolation.
//!
//! Every sample gets its own five-agent session and its own task; a bounded
//! number run at once. A failing sample never takes down the run: model and
//! parse failures are folded into that sample's result record, and even a
//! panicking worker is reduced to an error record written by the
//! coordinator. Exactly one result file per scheduled sample exists when the
//! run finishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::agents::{AgentResult, AgentSession, SessionStore};
use crate::dataset::{Dataset, DatasetFormat, Sample, SampleQuery};
use crate::llm::ModelBackend;
use crate::pipeline::{run_multi_turn, run_protocol, PipelineConfig};

/// Where and how a run persists its artifacts.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrent sample limit.
    pub num_workers: usize,
    /// Directory receiving one result file per sample.
    pub results_dir: PathBuf,
    /// Directory for mirrored session transcripts, if transcript files are
    /// wanted at all.
    pub mems_dir: Option<PathBuf>,
    /// Keep transcript files after the sample completes.
    pub keep_transcripts: bool,
    /// Filename prefix for result and transcript files.
    pub run_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: 10,
            results_dir: PathBuf::from("res"),
            mems_dir: None,
            keep_transcripts: false,
            run_prefix: String::new(),
        }
    }
}

/// Tally of one completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Drives a dataset through the pipeline with bounded concurrency.
pub struct Scheduler {
    backend: Arc<dyn ModelBackend>,
    pipeline: PipelineConfig,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        pipeline: PipelineConfig,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            backend,
            pipeline,
            config,
        }
    }

    /// Processes every sample and returns the run tally.
    ///
    /// Fails only on environment problems (result directory not writable);
    /// per-sample failures are recorded in that sample's result file and
    /// counted in the tally.
    pub async fn run(&self, dataset: Dataset) -> AgentResult<RunStats> {
        let started = Instant::now();
        tokio::fs::create_dir_all(&self.config.results_dir).await?;

        let store = Arc::new(SessionStore::new(self.config.mems_dir.clone()));
        let semaphore = Arc::new(Semaphore::new(self.config.num_workers));
        let format = dataset.format;
        let total = dataset.len();
        info!(
            total,
            workers = self.config.num_workers,
            "Scheduling samples"
        );

        let mut handles = Vec::with_capacity(total);
        for sample in dataset.samples {
            let sample_id = sample.id.unwrap_or_default();
            let semaphore = Arc::clone(&semaphore);
            let backend = Arc::clone(&self.backend);
            let store = Arc::clone(&store);
            let pipeline = self.pipeline.clone();
            let config = self.config.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("scheduler semaphore closed");
                process_sample(sample, format, backend, store, pipeline, &config).await
            });
            handles.push((sample_id, handle));
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let (ids, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        for (sample_id, joined) in ids.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(sample_failed) => {
                    if sample_failed {
                        failed += 1;
                    } else {
                        succeeded += 1;
                    }
                }
                Err(join_error) => {
                    // A panicked worker still gets its result file, written
                    // here so no scheduled sample goes unaccounted.
                    error!(sample = sample_id, %join_error, "Worker panicked");
                    let record = json!({
                        "id": sample_id,
                        "edit_error": format!("worker panicked: {join_error}"),
                    });
                    self.write_record(sample_id, &record).await?;
                    failed += 1;
                }
            }
        }

        let stats = RunStats {
            total,
            succeeded,
            failed,
            elapsed: started.elapsed(),
        };
        info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            elapsed_secs = stats.elapsed.as_secs_f64(),
            "Run finished"
        );
        Ok(stats)
    }

    async fn write_record(&self, sample_id: u64, record: &Value) -> AgentResult<()> {
        write_result_file(&self.config, sample_id, record).await
    }
}

/// Processes one sample end to end; returns whether it failed.
async fn process_sample(
    sample: Sample,
    format: DatasetFormat,
    backend: Arc<dyn ModelBackend>,
    store: Arc<SessionStore>,
    pipeline: PipelineConfig,
    config: &SchedulerConfig,
) -> bool {
    let sample_id = sample.id.unwrap_or_default();
    let session_id = format!("{}{sample_id}", config.run_prefix);
    let mut session = AgentSession::new(
        session_id.clone(),
        backend,
        Arc::clone(&store),
        &pipeline.agent_names,
        pipeline.agent_window_size,
    );

    let mut record = match serde_json::to_value(&sample) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            error!(sample = sample_id, "Sample is not a JSON object");
            return true;
        }
    };

    let mut sample_failed = false;
    if sample.is_multi_turn(format) {
        let outcome = run_multi_turn(&mut session, &sample, &pipeline).await;
        sample_failed = outcome.edit_error.is_some();
        merge_outcome(&mut record, serde_json::to_value(&outcome));
    } else {
        let query = SampleQuery::single_turn(&sample, format);
        match run_protocol(&mut session, &query, &pipeline).await {
            Ok(outcome) => merge_outcome(&mut record, serde_json::to_value(&outcome)),
            Err(error) => {
                // The original response stays in place; only the error is
                // recorded alongside it.
                warn!(sample = sample_id, %error, "Sample editing failed");
                record.insert("edit_error".to_string(), Value::String(error.to_string()));
                sample_failed = true;
            }
        }
    }

    let history = store.take(&session_id);
    match serde_json::to_value(&history) {
        Ok(history) => {
            record.insert("memory_history".to_string(), history);
        }
        Err(error) => {
            error!(sample = sample_id, %error, "Serializing memory history failed");
            sample_failed = true;
        }
    }

    if !config.keep_transcripts {
        if let Err(error) = store.remove_file(&session_id).await {
            warn!(sample = sample_id, %error, "Removing transcript file failed");
        }
    }

    if let Err(error) = write_result_file(config, sample_id, &Value::Object(record)).await {
        error!(sample = sample_id, %error, "Writing result file failed");
        return true;
    }
    sample_failed
}

fn merge_outcome(record: &mut serde_json::Map<String, Value>, outcome: serde_json::Result<Value>) {
    match outcome {
        Ok(Value::Object(fields)) => {
            for (key, value) in fields {
                record.insert(key, value);
            }
        }
        Ok(other) => {
            record.insert("edit_result".to_string(), other);
        }
        Err(error) => {
            record.insert(
                "edit_error".to_string(),
                Value::String(format!("serializing edit result failed: {error}")),
            );
        }
    }
}

async fn write_result_file(
    config: &SchedulerConfig,
    sample_id: u64,
    record: &Value,
) -> AgentResult<()> {
    let path = config
        .results_dir
        .join(format!("{}{sample_id}.json", config.run_prefix));
    let json = serde_json::to_vec(record)?;
    tokio::fs::write(&path, json).await?;
    info!(sample = sample_id, path = %path.display(), "Result saved");
    Ok(())
}
