use std::sync::Arc;

use comms::specs::{
    GetTopicModelArgs, InitializeModelArgs, MatrixKind, MergeModelArgs, NormalizeModelArgs,
    RegularizeModelArgs,
};
use log::{debug, warn};
use model::{DenseMatrix, PhiMatrix, TopicModel, TopicModelChunk, operations};

use crate::{
    MergeErr, Result,
    regularization::{RegularizerMap, invoke_regularizers},
    storage::{ModelSnapshot, ModelStore},
};

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(MergeErr::InvalidOperation(format!("{field} is missing")));
    }

    Ok(())
}

/// Owns the current version of every named model and applies the model updates.
///
/// Updates never touch a published matrix, they build a new one and publish it
/// under its name. Two updates targeting the same name race, the last one wins.
#[derive(Debug, Default)]
pub struct Merger {
    store: ModelStore,
}

impl Merger {
    /// Creates a new `Merger` without any model.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the model registered under `name`.
    pub fn get_latest(&self, name: &str) -> Option<ModelSnapshot> {
        self.store.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains(name)
    }

    /// Publishes `matrix` under `name`.
    pub fn set_matrix(&self, name: &str, mut matrix: DenseMatrix) {
        matrix.set_name(name);
        self.store.set(name, ModelSnapshot::Matrix(Arc::new(matrix)));
    }

    /// Publishes `model` under its own name.
    pub fn set_topic_model(&self, model: TopicModel) {
        let name = model.name().to_string();
        self.store.set(&name, ModelSnapshot::Topic(Arc::new(model)));
    }

    /// Adds a fresh increment into the plain matrix registered under `name`.
    pub fn accumulate(&self, name: &str, increment: &DenseMatrix) -> Result<()> {
        self.store.accumulate(name, increment)
    }

    /// # Returns
    /// Whether something was registered under `name`.
    pub fn dispose(&self, name: &str) -> bool {
        self.store.remove(name)
    }

    /// Publishes the weighted sum of the source counts under the target name.
    ///
    /// Missing sources are skipped, the first source found fixes the topic
    /// sequence unless `args.topic_names` overrides it.
    ///
    /// # Returns
    /// An `InvalidOperation` error if the request is malformed or no source exists,
    /// or a `Phi` error if a source has another topic sequence.
    pub fn merge(&self, args: &MergeModelArgs) -> Result<()> {
        require("MergeModelArgs.nwt_target_name", &args.nwt_target_name)?;

        if args.nwt_source_names.is_empty() {
            return Err(MergeErr::InvalidOperation(
                "MergeModelArgs.nwt_source_names must not be empty".into(),
            ));
        }

        if args.nwt_source_names.len() != args.source_weights.len() {
            return Err(MergeErr::InvalidOperation(format!(
                "MergeModelArgs has {} sources but {} weights",
                args.nwt_source_names.len(),
                args.source_weights.len()
            )));
        }

        let sources: Vec<_> = args
            .nwt_source_names
            .iter()
            .zip(&args.source_weights)
            .filter_map(|(name, &weight)| match self.store.get(name) {
                Some(source) => Some((source, weight)),
                None => {
                    warn!(model = name.as_str(); "merge source does not exist, skipping");
                    None
                }
            })
            .collect();

        let Some((first, _)) = sources.first() else {
            return Err(MergeErr::InvalidOperation(format!(
                "none of the merge sources of {} exist",
                args.nwt_target_name
            )));
        };

        let topic_names = match args.topic_names.is_empty() {
            true => first.topic_names().to_vec(),
            false => args.topic_names.clone(),
        };

        let mut target = DenseMatrix::new(&args.nwt_target_name, topic_names)?;
        for (source, weight) in &sources {
            let nwt = source.nwt();
            if nwt.token_size() == 0 {
                continue;
            }

            target.add_scaled(nwt, *weight)?;
        }

        debug!(
            "merged {} sources into {}: tokens={}",
            sources.len(),
            args.nwt_target_name,
            target.token_size()
        );
        self.set_matrix(&args.nwt_target_name, target);
        Ok(())
    }

    /// Publishes the regularization term of a model under the target name.
    ///
    /// # Arguments
    /// * `args` - Which matrices to read and which regularizers to invoke.
    /// * `regularizers` - The registered regularizers.
    ///
    /// # Returns
    /// An `InvalidOperation` error naming the missing field or model.
    pub fn regularize(&self, args: &RegularizeModelArgs, regularizers: &RegularizerMap) -> Result<()> {
        require("RegularizeModelArgs.pwt_source_name", &args.pwt_source_name)?;
        require("RegularizeModelArgs.nwt_source_name", &args.nwt_source_name)?;
        require("RegularizeModelArgs.rwt_target_name", &args.rwt_target_name)?;

        let fetch = |name: &str| {
            self.store
                .get(name)
                .ok_or_else(|| MergeErr::InvalidOperation(format!("model {name} does not exist")))
        };

        let pwt = fetch(&args.pwt_source_name)?;
        let nwt = fetch(&args.nwt_source_name)?;
        nwt.nwt().check_topics(pwt.topic_names())?;

        let rwt = invoke_regularizers(
            &args.rwt_target_name,
            pwt.pwt(),
            nwt.nwt(),
            &args.regularizer_settings,
            regularizers,
        )?;

        self.set_matrix(&args.rwt_target_name, rwt);
        Ok(())
    }

    /// Publishes the probabilities derived from a counts matrix and an optional
    /// regularization term under the target name.
    ///
    /// # Returns
    /// An `InvalidOperation` error if a name is missing, or a `ModelNotFound`
    /// error if a source doesn't exist.
    pub fn normalize(&self, args: &NormalizeModelArgs) -> Result<()> {
        require("NormalizeModelArgs.pwt_target_name", &args.pwt_target_name)?;
        require("NormalizeModelArgs.nwt_source_name", &args.nwt_source_name)?;

        let fetch = |name: &str| {
            self.store
                .get(name)
                .ok_or_else(|| MergeErr::ModelNotFound(name.to_string()))
        };

        let nwt = fetch(&args.nwt_source_name)?;
        let rwt = match args.rwt_source_name.as_deref() {
            Some(name) if !name.is_empty() => Some(fetch(name)?),
            _ => None,
        };

        let pwt = operations::normalize(
            &args.pwt_target_name,
            nwt.nwt(),
            rwt.as_ref().map(|rwt| rwt.nwt() as &dyn PhiMatrix),
        )?;

        self.set_matrix(&args.pwt_target_name, pwt);
        Ok(())
    }

    /// Replaces the topic model named after `chunk` with the counts it holds.
    pub fn overwrite(&self, chunk: &TopicModelChunk) -> Result<()> {
        require("TopicModelChunk.name", &chunk.name)?;

        let model = TopicModel::from_chunk(chunk)?;
        self.set_topic_model(model);
        Ok(())
    }

    /// Publishes a topic model with zero counts and uniform probabilities.
    pub fn initialize(&self, args: &InitializeModelArgs) -> Result<()> {
        require("InitializeModelArgs.model_name", &args.model_name)?;

        let mut nwt = DenseMatrix::new(&args.model_name, args.topic_names.clone())?;
        for token in &args.tokens {
            nwt.add_token(token.clone())?;
        }

        self.set_topic_model(TopicModel::new(&args.model_name, nwt)?);
        Ok(())
    }

    /// Reads (a slice of) a model back in its external representation.
    ///
    /// # Returns
    /// A `ModelNotFound` error if nothing is registered under `args.model_name`.
    pub fn request_topic_model(&self, args: &GetTopicModelArgs) -> Result<TopicModelChunk> {
        let snapshot = self
            .store
            .get(&args.model_name)
            .ok_or_else(|| MergeErr::ModelNotFound(args.model_name.clone()))?;

        let matrix = match args.matrix_kind {
            MatrixKind::Pwt => snapshot.pwt(),
            MatrixKind::Nwt => snapshot.nwt(),
        };

        let mut chunk = operations::retrieve(matrix, args.tokens.as_deref(), args.encoding, args.eps);
        chunk.name = args.model_name.clone();
        Ok(chunk)
    }
}
