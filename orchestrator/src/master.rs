use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use comms::specs::{
    ExportModelArgs, GetScoreValueArgs, GetThetaMatrixArgs, GetTopicModelArgs, ImportModelArgs,
    InitializeModelArgs, MergeModelArgs, ModelConfig, NormalizeModelArgs, ProcessBatchesArgs,
    ProcessBatchesResult, RegularizeModelArgs, ThetaMatrixType, WaitIdleArgs,
};
use log::{debug, info, warn};
use model::{DenseMatrix, PhiMatrix, ScoreData, ThetaMatrix, TopicModelChunk};
use parameter_server::{
    InstanceSchema, ThetaCache,
    synchronization::{BatchTracker, Versioned},
};
use tokio::time;
use uuid::Uuid;
use worker::{BatchOutput, BatchProcessor, BatchRequest, ProcessorInput};

use crate::{
    MasterErr, Result,
    configs::{MasterConfig, RegularizerConfig, resolve_model_config, validate_model_config},
    instance::Instance,
    persistence,
    plugins::{PluginFactory, build_schema},
};

/// The entry point of a master instance.
///
/// Every call blocks the calling thread until it's done, so it must not be
/// called from within an async runtime.
pub struct MasterComponent {
    config: Versioned<MasterConfig>,
    factory: Arc<dyn PluginFactory>,
    instance: Instance,
}

impl MasterComponent {
    /// Creates a new `MasterComponent` and starts its processors.
    ///
    /// # Arguments
    /// * `config` - The configuration of the instance.
    /// * `factory` - Creates the configured regularizers and score calculators.
    /// * `kernel` - The numeric kernel the processors run over each batch.
    ///
    /// # Returns
    /// The new master, or an error if `config` is invalid or a plugin can't be created.
    pub fn new(
        config: MasterConfig,
        factory: Arc<dyn PluginFactory>,
        kernel: Arc<dyn BatchProcessor>,
    ) -> Result<Self> {
        config.validate()?;

        let schema = build_schema(&config, factory.as_ref(), None)?;
        let instance = Instance::new(schema, kernel, config.processors_count)?;

        info!(
            "master component created: processors={} scores={} regularizers={}",
            config.processors_count,
            config.score_config.len(),
            config.regularizer_config.len()
        );

        Ok(Self {
            config: Versioned::new(config),
            factory,
            instance,
        })
    }

    /// The current configuration.
    pub fn config(&self) -> Arc<MasterConfig> {
        self.config.get()
    }

    /// Replaces the whole configuration of the live instance.
    ///
    /// The plugins are recreated, the processor pool is resized and the theta
    /// cache is dropped when caching gets disabled.
    ///
    /// # Returns
    /// An `InvalidOperation` error if `config` is invalid or changes `disk_path`.
    pub fn reconfigure(&self, config: MasterConfig) -> Result<()> {
        config.validate()?;

        if self.config.get().disk_path != config.disk_path {
            return Err(MasterErr::InvalidOperation(
                "changing MasterConfig.disk_path is not supported".into(),
            ));
        }

        self.instance.schema.update(|schema| -> Result<()> {
            *schema = build_schema(&config, self.factory.as_ref(), Some(&*schema))?;
            Ok(())
        })?;

        if !config.cache_theta {
            self.instance.cache.clear();
        }

        self.instance.pool.lock().resize(config.processors_count);
        let version = self.config.set(config);
        info!("master component reconfigured: version={version}");
        Ok(())
    }

    /// Registers or replaces the inner loop settings of a model.
    pub fn create_or_reconfigure_model(&self, config: ModelConfig) -> Result<()> {
        let config = validate_model_config(config)?;
        info!(model = config.name.as_str(); "model configured");

        self.instance.schema.update(|schema| -> Result<()> {
            schema.set_model_config(config);
            Ok(())
        })?;

        Ok(())
    }

    /// Forgets everything known about `name`: its matrix, scores, cached theta and settings.
    pub fn dispose_model(&self, name: &str) -> Result<()> {
        info!(model = name; "disposing model");

        self.instance.merger.dispose(name);
        self.instance.scores.reset(Some(name));
        self.instance.cache.dispose(name);
        self.instance.schema.update(|schema| -> Result<()> {
            schema.remove_model_config(name);
            Ok(())
        })?;

        Ok(())
    }

    /// Registers or replaces a regularizer without reconfiguring the whole instance.
    pub fn create_or_reconfigure_regularizer(&self, config: RegularizerConfig) -> Result<()> {
        if config.name.is_empty() {
            return Err(MasterErr::InvalidOperation("RegularizerConfig.name is missing".into()));
        }

        let regularizer = self.factory.create_regularizer(&config)?;
        let name = config.name.clone();
        info!(regularizer = name.as_str(); "regularizer configured");

        self.config.update(|master| -> Result<()> {
            master.set_regularizer(config);
            Ok(())
        })?;

        self.instance.schema.update(|schema| -> Result<()> {
            schema.set_regularizer(name, regularizer);
            Ok(())
        })?;

        Ok(())
    }

    /// Removes a regularizer, doing nothing if it doesn't exist.
    pub fn dispose_regularizer(&self, name: &str) -> Result<()> {
        info!(regularizer = name; "disposing regularizer");

        self.config.update(|master| -> Result<()> {
            master.remove_regularizer(name);
            Ok(())
        })?;

        self.instance.schema.update(|schema| -> Result<()> {
            schema.remove_regularizer(name);
            Ok(())
        })?;

        Ok(())
    }

    /// Processes a set of batches against a model and waits for all of them.
    ///
    /// Every batch becomes one work item reading the model probabilities as they
    /// are now, later updates to the model don't affect the round.
    ///
    /// # Returns
    /// One entry per configured score that has a value for the model, and the
    /// theta rows when they were requested in dense or sparse form. A
    /// `ModelNotFound` error if the model doesn't exist, or an `InvalidOperation`
    /// error if the request is inconsistent.
    pub fn process_batches(&self, args: &ProcessBatchesArgs) -> Result<ProcessBatchesResult> {
        let model_name = &args.pwt_source_name;
        info!(
            "processing batches: model={model_name} batches={} theta={:?}",
            args.batch_filenames.len(),
            args.theta_matrix_type
        );

        let pwt = self
            .instance
            .merger
            .get_latest(model_name)
            .ok_or_else(|| MasterErr::ModelNotFound(model_name.clone()))?;

        let config = self.config.get();
        let schema = self.instance.schema.get();
        let model_config =
            resolve_model_config(schema.model_config(model_name), args, pwt.pwt().topic_names())?;

        if let Some(target) = &args.nwt_target_name {
            if target.is_empty() {
                return Err(MasterErr::InvalidOperation(
                    "ProcessBatchesArgs.nwt_target_name is empty".into(),
                ));
            }

            if target == model_name {
                return Err(MasterErr::InvalidOperation(format!(
                    "ProcessBatchesArgs.nwt_target_name must differ from the source model {model_name}"
                )));
            }

            let nwt = DenseMatrix::zeros_like(target, pwt.pwt())?;
            self.instance.merger.set_matrix(target, nwt);
        }

        if args.reset_scores {
            self.instance.scores.reset(Some(model_name));
        }

        let cache = match args.theta_matrix_type {
            ThetaMatrixType::None => None,
            ThetaMatrixType::Cache => config.cache_theta.then(|| Arc::clone(&self.instance.cache)),
            ThetaMatrixType::Dense | ThetaMatrixType::Sparse => Some(Arc::new(ThetaCache::new())),
        };

        let tracker = Arc::new(BatchTracker::new());
        for batch in &args.batch_filenames {
            let task_id = Uuid::new_v4();
            if !tracker.add(task_id, model_name) {
                return Err(MasterErr::Internal(format!("task {task_id} registered twice")));
            }

            self.instance.queue.push(ProcessorInput {
                task_id,
                model_name: model_name.clone(),
                batch_filename: resolve_batch(&config, batch),
                model_config: model_config.clone(),
                pwt: pwt.clone(),
                nwt_target_name: args.nwt_target_name.clone(),
                schema: Arc::clone(&schema),
                merger: Arc::clone(&self.instance.merger),
                scores: Arc::clone(&self.instance.scores),
                cache: cache.clone(),
                tracker: Arc::clone(&tracker),
            });
        }

        if self.instance.pool.lock().is_empty() {
            warn!("no processor is running, batches of {model_name} wait for one");
        }

        let interval = Duration::from_millis(config.idle_loop_interval_ms);
        self.instance
            .runtime
            .block_on(tracker.wait(model_name, interval));
        debug!("all batches processed: model={model_name}");

        let mut score_data = Vec::new();
        for score_name in schema.score_names() {
            if let Some(score) = self.score_snapshot(&schema, model_name, score_name)? {
                score_data.push(score);
            }
        }

        let theta_matrix = match (args.theta_matrix_type, &cache) {
            (ThetaMatrixType::Dense | ThetaMatrixType::Sparse, Some(cache)) => {
                let sparse = args.theta_matrix_type == ThetaMatrixType::Sparse;
                let theta = cache
                    .request(model_name, sparse, 0.)
                    .unwrap_or_else(|| ThetaMatrix::new(model_name.clone(), pwt.topic_names().to_vec()));
                Some(theta)
            }
            _ => None,
        };

        Ok(ProcessBatchesResult {
            score_data,
            theta_matrix,
        })
    }

    /// Publishes the weighted sum of several count matrices.
    pub fn merge_model(&self, args: &MergeModelArgs) -> Result<()> {
        info!(
            "merging model: target={} sources={:?}",
            args.nwt_target_name, args.nwt_source_names
        );

        self.instance.merger.merge(args)?;
        Ok(())
    }

    /// Publishes the regularization term of a model.
    pub fn regularize_model(&self, args: &RegularizeModelArgs) -> Result<()> {
        info!(
            "regularizing model: pwt={} nwt={} target={}",
            args.pwt_source_name, args.nwt_source_name, args.rwt_target_name
        );

        let schema = self.instance.schema.get();
        self.instance.merger.regularize(args, schema.regularizers())?;
        Ok(())
    }

    /// Publishes the probabilities derived from counts and an optional regularization term.
    pub fn normalize_model(&self, args: &NormalizeModelArgs) -> Result<()> {
        info!(
            "normalizing model: nwt={} rwt={:?} target={}",
            args.nwt_source_name, args.rwt_source_name, args.pwt_target_name
        );

        self.instance.merger.normalize(args)?;
        Ok(())
    }

    /// Replaces the topic model named after `chunk` with the counts it holds.
    pub fn overwrite_topic_model(&self, chunk: &TopicModelChunk) -> Result<()> {
        info!(model = chunk.name.as_str(); "overwriting topic model: tokens={}", chunk.len());
        self.instance.merger.overwrite(chunk)?;
        Ok(())
    }

    /// Creates a topic model over a given vocabulary with uniform probabilities.
    pub fn initialize_model(&self, args: &InitializeModelArgs) -> Result<()> {
        info!(model = args.model_name.as_str(); "initializing model: tokens={}", args.tokens.len());
        self.instance.merger.initialize(args)?;
        Ok(())
    }

    /// Writes a model to a new file.
    ///
    /// Topic models are written as their probabilities, plain matrices as they are.
    ///
    /// # Returns
    /// A `DiskWrite` error if the file already exists, checked before anything
    /// else. A `ModelNotFound` error if the model doesn't exist, or an
    /// `InvalidOperation` error if it has no tokens.
    pub fn export_model(&self, args: &ExportModelArgs) -> Result<()> {
        if args.file_name.exists() {
            return Err(MasterErr::DiskWrite(format!(
                "file already exists: {}",
                args.file_name.display()
            )));
        }

        let snapshot = self
            .instance
            .merger
            .get_latest(&args.model_name)
            .ok_or_else(|| MasterErr::ModelNotFound(args.model_name.clone()))?;

        let matrix = snapshot.pwt();
        if matrix.token_size() == 0 {
            return Err(MasterErr::InvalidOperation(format!(
                "model {} has no tokens, export failed",
                args.model_name
            )));
        }

        info!(
            "exporting model: model={} file={}",
            args.model_name,
            args.file_name.display()
        );

        let per_chunk = persistence::tokens_per_chunk(matrix.token_size(), matrix.topic_size());
        self.instance
            .runtime
            .block_on(persistence::export(&args.file_name, matrix, per_chunk))?;

        Ok(())
    }

    /// Reads a model back from a file written by `export_model`.
    ///
    /// The model is registered under `args.model_name`, whatever the name it was
    /// exported with. Nothing is registered when reading fails.
    pub fn import_model(&self, args: &ImportModelArgs) -> Result<()> {
        if args.model_name.is_empty() {
            return Err(MasterErr::InvalidOperation("ImportModelArgs.model_name is missing".into()));
        }

        info!(
            "importing model: model={} file={}",
            args.model_name,
            args.file_name.display()
        );

        let matrix = self
            .instance
            .runtime
            .block_on(persistence::import(&args.file_name, &args.model_name))?;

        self.instance.merger.set_matrix(&args.model_name, matrix);
        Ok(())
    }

    /// Reads (a slice of) a model back in its external representation.
    pub fn request_topic_model(&self, args: &GetTopicModelArgs) -> Result<TopicModelChunk> {
        Ok(self.instance.merger.request_topic_model(args)?)
    }

    /// Reads one score of a model.
    ///
    /// With a batch the score is computed on the spot by the first processor,
    /// without affecting the accumulated value.
    ///
    /// # Returns
    /// `None` if the score has no value, or an `Internal` error if a batch is
    /// given and no processor exists.
    pub fn request_score(&self, args: &GetScoreValueArgs) -> Result<Option<ScoreData>> {
        let Some(batch) = &args.batch else {
            let schema = self.instance.schema.get();
            return self.score_snapshot(&schema, &args.model_name, &args.score_name);
        };

        let output = self.process_now(&args.model_name, batch, false)?;
        Ok(output
            .scores
            .into_iter()
            .find(|score| score.name == args.score_name))
    }

    /// Reads per document topic distributions.
    ///
    /// Without a batch the instance cache answers, with one the batch is
    /// processed on the spot by the first processor.
    ///
    /// # Returns
    /// The rows, empty if nothing is cached, or an `Internal` error if a batch is
    /// given and no processor exists.
    pub fn request_theta_matrix(&self, args: &GetThetaMatrixArgs) -> Result<ThetaMatrix> {
        let topic_names = || {
            self.instance
                .merger
                .get_latest(&args.model_name)
                .map(|snapshot| snapshot.topic_names().to_vec())
                .unwrap_or_default()
        };

        let Some(batch) = &args.batch else {
            let theta = self
                .instance
                .cache
                .request(&args.model_name, args.use_sparse_format, args.eps)
                .unwrap_or_else(|| ThetaMatrix::new(args.model_name.clone(), topic_names()));
            return Ok(theta);
        };

        let output = self.process_now(&args.model_name, batch, true)?;
        let mut theta = output
            .theta
            .unwrap_or_else(|| ThetaMatrix::new(args.model_name.clone(), topic_names()));
        theta.model_name = args.model_name.clone();

        Ok(match args.use_sparse_format {
            true => theta.into_sparse(args.eps),
            false => theta,
        })
    }

    /// Waits until the queue is drained and every processor is done.
    ///
    /// The time spent waiting for the queue is taken out of the budget left for
    /// the processors.
    ///
    /// # Returns
    /// `false` if the timeout elapsed first.
    pub fn wait_idle(&self, args: WaitIdleArgs) -> bool {
        let queue = &self.instance.queue;

        let Ok(timeout) = u64::try_from(args.timeout_milliseconds) else {
            self.instance.runtime.block_on(async {
                queue.wait_empty().await;
                queue.wait_idle().await;
            });
            return true;
        };

        if timeout == 0 {
            warn!("wait_idle called with a zero timeout");
        }

        let budget = Duration::from_millis(timeout);
        let start = Instant::now();

        self.instance.runtime.block_on(async {
            if time::timeout(budget, queue.wait_empty()).await.is_err() {
                return false;
            }

            let remaining = budget.saturating_sub(start.elapsed());
            time::timeout(remaining, queue.wait_idle()).await.is_ok()
        })
    }

    fn score_snapshot(
        &self,
        schema: &InstanceSchema,
        model_name: &str,
        score_name: &str,
    ) -> Result<Option<ScoreData>> {
        let Some(calculator) = schema.score_calculator(score_name) else {
            return Ok(self.instance.scores.request(model_name, score_name));
        };

        if calculator.is_cumulative() {
            return Ok(self.instance.scores.request(model_name, score_name));
        }

        let snapshot = self
            .instance
            .merger
            .get_latest(model_name)
            .ok_or_else(|| MasterErr::ModelNotFound(model_name.to_string()))?;

        Ok(calculator.calculate_score(snapshot.pwt()).map(|mut score| {
            score.name = score_name.to_string();
            score
        }))
    }

    fn process_now(&self, model_name: &str, batch: &Path, compute_theta: bool) -> Result<BatchOutput> {
        let kernel = self
            .instance
            .pool
            .lock()
            .first_processor()
            .ok_or_else(|| MasterErr::Internal("no processors exist".into()))?;

        let pwt = self
            .instance
            .merger
            .get_latest(model_name)
            .ok_or_else(|| MasterErr::ModelNotFound(model_name.to_string()))?;

        let schema = self.instance.schema.get();
        let mut config = schema
            .model_config(model_name)
            .cloned()
            .unwrap_or_else(|| ModelConfig::new(model_name));
        config.topic_names = pwt.pwt().topic_names().to_vec();
        config.topics_count = config.topic_names.len();

        let batch = resolve_batch(&self.config.get(), batch);
        debug!("processing batch on the spot: model={model_name} batch={}", batch.display());

        let request = BatchRequest {
            batch_filename: &batch,
            model_name,
            pwt: pwt.pwt(),
            config: &config,
            schema: &schema,
            compute_nwt: false,
            compute_theta,
        };

        Ok(kernel.process(&request)?)
    }
}

fn resolve_batch(config: &MasterConfig, batch: &Path) -> PathBuf {
    match &config.disk_path {
        Some(root) if batch.is_relative() => root.join(batch),
        _ => batch.to_path_buf(),
    }
}
