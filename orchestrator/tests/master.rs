use std::{fs, path::Path, sync::{Arc, mpsc}, thread, time::Duration};

use comms::specs::{
    ExportModelArgs, GetScoreValueArgs, GetThetaMatrixArgs, GetTopicModelArgs, ImportModelArgs,
    InitializeModelArgs, MatrixKind, MergeModelArgs, ModelConfig, NormalizeModelArgs,
    ProcessBatchesArgs, RegularizeModelArgs, RegularizerSettings, ThetaMatrixType, WaitIdleArgs,
};
use model::{DenseMatrix, PhiMatrix, ScoreData, ThetaMatrix, Token};
use orchestrator::{
    MasterComponent, MasterConfig, MasterErr, PluginFactory, RegularizerConfig, Result, ScoreConfig,
};
use parameter_server::{regularization::Regularizer, scores::ScoreCalculator};
use serde_json::{Value, json};
use tempfile::TempDir;
use worker::{BatchOutput, BatchProcessor, BatchRequest, WorkerErr};

const TOL: f32 = 1e-5;

/// A batch file holds `<documents> [<sleep ms>]`. Every document adds one to
/// every cell of the model and yields a uniform theta row. A batch holding
/// `panic` makes the kernel panic.
struct FileKernel;

impl BatchProcessor for FileKernel {
    fn process(&self, request: &BatchRequest<'_>) -> worker::Result<BatchOutput> {
        let text = fs::read_to_string(request.batch_filename)?;
        if text.trim() == "panic" {
            panic!("kernel bug");
        }

        if request.config.topic_names != request.pwt.topic_names() {
            return Err(WorkerErr::Processing(format!(
                "config topics {:?} differ from the model's",
                request.config.topic_names
            )));
        }

        let mut fields = text.split_whitespace().map(str::parse::<u64>);
        let documents = match fields.next() {
            Some(Ok(documents)) => documents,
            _ => return Err(WorkerErr::Processing(format!("bad batch: {text}"))),
        };

        if let Some(Ok(ms)) = fields.next() {
            thread::sleep(Duration::from_millis(ms));
        }

        let mut output = BatchOutput::default();

        if request.compute_nwt {
            let mut increment = DenseMatrix::zeros_like("increment", request.pwt)?;
            increment.values_mut().fill(documents as f32);
            output.nwt_increment = Some(increment);
        }

        if request.compute_theta {
            let topics = request.pwt.topic_names().to_vec();
            let mut theta = ThetaMatrix::new(request.model_name, topics.clone());
            for item in 0..documents {
                theta.push_item(item as i32, "", vec![1. / topics.len() as f32; topics.len()]);
            }
            output.theta = Some(theta);
        }

        output
            .scores
            .push(ScoreData::new("documents", "sum", vec![documents as f64]));
        Ok(output)
    }
}

struct Sum;

impl ScoreCalculator for Sum {
    fn kind(&self) -> &str {
        "sum"
    }

    fn append_score(&self, accumulated: &mut ScoreData, contribution: &ScoreData) {
        accumulated.values[0] += contribution.values[0];
    }
}

/// Counts the tokens of the model, computed on request.
struct TokenCount;

impl ScoreCalculator for TokenCount {
    fn kind(&self) -> &str {
        "token_count"
    }

    fn is_cumulative(&self) -> bool {
        false
    }

    fn append_score(&self, _: &mut ScoreData, _: &ScoreData) {}

    fn calculate_score(&self, pwt: &dyn PhiMatrix) -> Option<ScoreData> {
        Some(ScoreData::new("", "token_count", vec![pwt.token_size() as f64]))
    }
}

/// Adds `value` to every cell of the first topic.
struct Constant(f32);

impl Regularizer for Constant {
    fn regularize_phi(&self, _: &dyn PhiMatrix, nwt: &dyn PhiMatrix, rwt: &mut DenseMatrix) -> bool {
        (0..nwt.token_size()).for_each(|token_id| rwt.set(token_id, 0, self.0));
        true
    }
}

struct Factory;

impl PluginFactory for Factory {
    fn create_regularizer(&self, config: &RegularizerConfig) -> Result<Arc<dyn Regularizer>> {
        match config.kind.as_str() {
            "constant" => {
                let value = config.config["value"].as_f64().unwrap_or(0.);
                Ok(Arc::new(Constant(value as f32)))
            }
            kind => Err(MasterErr::InvalidOperation(format!("unknown regularizer kind {kind}"))),
        }
    }

    fn create_score_calculator(&self, config: &ScoreConfig) -> Result<Arc<dyn ScoreCalculator>> {
        match config.kind.as_str() {
            "sum" => Ok(Arc::new(Sum)),
            "token_count" => Ok(Arc::new(TokenCount)),
            kind => Err(MasterErr::InvalidOperation(format!("unknown score kind {kind}"))),
        }
    }
}

fn score(name: &str, kind: &str) -> ScoreConfig {
    ScoreConfig {
        name: name.into(),
        kind: kind.into(),
        config: Value::Null,
    }
}

fn regularizer(name: &str, value: f64) -> RegularizerConfig {
    RegularizerConfig {
        name: name.into(),
        kind: "constant".into(),
        config: json!({ "value": value }),
    }
}

fn config(dir: &TempDir) -> MasterConfig {
    MasterConfig {
        disk_path: Some(dir.path().to_path_buf()),
        processors_count: 2,
        cache_theta: true,
        score_config: vec![score("documents", "sum"), score("tokens", "token_count")],
        regularizer_config: vec![regularizer("push", 1.)],
        ..Default::default()
    }
}

fn write_batch(dir: &TempDir, name: &str, content: &str) -> String {
    fs::write(dir.path().join(name), content).unwrap();
    name.to_string()
}

/// A master holding `m1`, a topic model with 2 topics and 3 tokens.
fn master(dir: &TempDir) -> MasterComponent {
    let _ = env_logger::builder().is_test(true).try_init();

    let master = MasterComponent::new(config(dir), Arc::new(Factory), Arc::new(FileKernel)).unwrap();
    master
        .initialize_model(&InitializeModelArgs {
            model_name: "m1".into(),
            tokens: ["a", "b", "c"].into_iter().map(Token::keyword).collect(),
            topic_names: vec!["t0".into(), "t1".into()],
        })
        .unwrap();
    master
}

fn process_args(batches: Vec<String>, reset_scores: bool, theta: ThetaMatrixType) -> ProcessBatchesArgs {
    ProcessBatchesArgs {
        pwt_source_name: "m1".into(),
        nwt_target_name: Some("nwt_hat".into()),
        batch_filenames: batches.into_iter().map(Into::into).collect(),
        reset_scores,
        theta_matrix_type: theta,
        ..Default::default()
    }
}

fn score_value(scores: &[ScoreData], name: &str) -> f64 {
    scores.iter().find(|s| s.name == name).unwrap().values[0]
}

fn chunk_of(master: &MasterComponent, name: &str, kind: MatrixKind) -> model::TopicModelChunk {
    master
        .request_topic_model(&GetTopicModelArgs {
            model_name: name.into(),
            matrix_kind: kind,
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn test_process_batches_returns_scores_and_theta() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batches = vec![write_batch(&dir, "b1", "2"), write_batch(&dir, "b2", "3")];

    let result = master
        .process_batches(&process_args(batches.clone(), true, ThetaMatrixType::Dense))
        .unwrap();

    assert_eq!(result.score_data.len(), 2);
    assert_eq!(score_value(&result.score_data, "documents"), 5.);
    assert_eq!(score_value(&result.score_data, "tokens"), 3.);

    let theta = result.theta_matrix.unwrap();
    assert_eq!(theta.len(), 5);
    assert!(!theta.is_sparse());

    let nwt = chunk_of(&master, "nwt_hat", MatrixKind::Nwt);
    assert_eq!(nwt.tokens.len(), 3);
    assert!(nwt.token_weights.iter().all(|row| row == &vec![5., 5.]));

    let result = master
        .process_batches(&process_args(batches, false, ThetaMatrixType::None))
        .unwrap();
    assert_eq!(score_value(&result.score_data, "documents"), 10.);
    assert!(result.theta_matrix.is_none());
}

#[test]
fn test_process_batches_sparse_theta() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batches = vec![write_batch(&dir, "b1", "2")];

    let mut args = process_args(batches, true, ThetaMatrixType::Sparse);
    args.nwt_target_name = None;
    let theta = master.process_batches(&args).unwrap().theta_matrix.unwrap();

    assert!(theta.is_sparse());
    assert_eq!(theta.topic_indices, vec![vec![0, 1], vec![0, 1]]);
}

#[test]
fn test_process_batches_rejects_bad_requests() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let mut args = process_args(vec![], true, ThetaMatrixType::None);
    args.pwt_source_name = "missing".into();
    assert!(matches!(master.process_batches(&args), Err(MasterErr::ModelNotFound(_))));

    let mut args = process_args(vec![], true, ThetaMatrixType::None);
    args.nwt_target_name = Some("m1".into());
    assert!(matches!(master.process_batches(&args), Err(MasterErr::InvalidOperation(_))));

    let mut args = process_args(vec![], true, ThetaMatrixType::None);
    args.use_sparse_bow = Some(false);
    args.class_ids = vec!["@default_class".into()];
    args.class_weights = vec![1.];
    assert!(matches!(master.process_batches(&args), Err(MasterErr::InvalidOperation(_))));
}

#[test]
fn test_failed_batches_still_complete_the_round() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batches = vec![write_batch(&dir, "b1", "2"), write_batch(&dir, "bad", "oops")];

    let result = master
        .process_batches(&process_args(batches, true, ThetaMatrixType::Dense))
        .unwrap();

    assert_eq!(score_value(&result.score_data, "documents"), 2.);
    assert_eq!(result.theta_matrix.unwrap().len(), 2);
}

#[test]
fn test_kernel_panics_still_complete_the_round() {
    let dir = TempDir::new().unwrap();
    let master = Arc::new(master(&dir));
    let batches = vec![
        write_batch(&dir, "b1", "2"),
        write_batch(&dir, "p1", "panic"),
        write_batch(&dir, "p2", "panic"),
        write_batch(&dir, "p3", "panic"),
    ];

    let (tx, rx) = mpsc::channel();
    let side = Arc::clone(&master);
    thread::spawn(move || {
        let first = side.process_batches(&process_args(batches, true, ThetaMatrixType::None));
        let again = vec![write_batch(&dir, "b2", "3")];
        let second = side.process_batches(&process_args(again, false, ThetaMatrixType::None));
        let _ = tx.send((first, second));
    });

    let (first, second) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(score_value(&first.unwrap().score_data, "documents"), 2.);
    assert_eq!(score_value(&second.unwrap().score_data, "documents"), 5.);
    assert!(master.wait_idle(WaitIdleArgs {
        timeout_milliseconds: 1000
    }));
}

#[test]
fn test_registered_config_takes_the_model_topics() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let mut other = ModelConfig::new("m1");
    other.topic_names = vec!["x".into(), "y".into(), "z".into()];
    master.create_or_reconfigure_model(other).unwrap();

    let batches = vec![write_batch(&dir, "b1", "4")];
    let result = master
        .process_batches(&process_args(batches, true, ThetaMatrixType::None))
        .unwrap();

    assert_eq!(score_value(&result.score_data, "documents"), 4.);
    assert_eq!(chunk_of(&master, "nwt_hat", MatrixKind::Nwt).topic_names, vec!["t0", "t1"]);
}

#[test]
fn test_theta_cache() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batches = vec![write_batch(&dir, "b1", "2"), write_batch(&dir, "b2", "1")];

    let result = master
        .process_batches(&process_args(batches, true, ThetaMatrixType::Cache))
        .unwrap();
    assert!(result.theta_matrix.is_none());

    let args = GetThetaMatrixArgs {
        model_name: "m1".into(),
        ..Default::default()
    };
    assert_eq!(master.request_theta_matrix(&args).unwrap().len(), 3);

    let sparse = GetThetaMatrixArgs {
        use_sparse_format: true,
        eps: 0.9,
        ..args.clone()
    };
    let theta = master.request_theta_matrix(&sparse).unwrap();
    assert!(theta.item_weights.iter().all(Vec::is_empty));

    let mut config = config(&dir);
    config.cache_theta = false;
    master.reconfigure(config).unwrap();

    let theta = master.request_theta_matrix(&args).unwrap();
    assert!(theta.is_empty());
    assert_eq!(theta.topic_names, vec!["t0", "t1"]);
}

#[test]
fn test_requests_with_a_batch_are_processed_on_the_spot() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batch = write_batch(&dir, "b1", "4");

    let score = master
        .request_score(&GetScoreValueArgs {
            model_name: "m1".into(),
            score_name: "documents".into(),
            batch: Some(batch.clone().into()),
        })
        .unwrap()
        .unwrap();
    assert_eq!(score.values, vec![4.]);

    let accumulated = master
        .request_score(&GetScoreValueArgs {
            model_name: "m1".into(),
            score_name: "documents".into(),
            batch: None,
        })
        .unwrap();
    assert!(accumulated.is_none());

    let theta = master
        .request_theta_matrix(&GetThetaMatrixArgs {
            model_name: "m1".into(),
            batch: Some(batch.clone().into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(theta.len(), 4);
    assert_eq!(theta.model_name, "m1");

    let mut config = config(&dir);
    config.processors_count = 0;
    master.reconfigure(config).unwrap();

    let res = master.request_theta_matrix(&GetThetaMatrixArgs {
        model_name: "m1".into(),
        batch: Some(batch.into()),
        ..Default::default()
    });
    assert!(matches!(res, Err(MasterErr::Internal(_))));
}

#[test]
fn test_non_cumulative_scores_are_computed_from_the_model() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let tokens = master
        .request_score(&GetScoreValueArgs {
            model_name: "m1".into(),
            score_name: "tokens".into(),
            batch: None,
        })
        .unwrap()
        .unwrap();
    assert_eq!(tokens.name, "tokens");
    assert_eq!(tokens.values, vec![3.]);

    let res = master.request_score(&GetScoreValueArgs {
        model_name: "missing".into(),
        score_name: "tokens".into(),
        batch: None,
    });
    assert!(matches!(res, Err(MasterErr::ModelNotFound(_))));
}

#[test]
fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batches = vec![write_batch(&dir, "b1", "2")];
    master
        .process_batches(&process_args(batches, true, ThetaMatrixType::None))
        .unwrap();

    for model_name in ["m1", "nwt_hat"] {
        let file_name = dir.path().join(format!("{model_name}.model"));
        master
            .export_model(&ExportModelArgs {
                model_name: model_name.into(),
                file_name: file_name.clone(),
            })
            .unwrap();

        let copy = format!("{model_name}_copy");
        master
            .import_model(&ImportModelArgs {
                model_name: copy.clone(),
                file_name,
            })
            .unwrap();

        let original = chunk_of(&master, model_name, MatrixKind::Pwt);
        let imported = chunk_of(&master, &copy, MatrixKind::Nwt);
        assert_eq!(imported.name, copy);
        assert_eq!(imported.tokens, original.tokens);
        assert_eq!(imported.topic_names, original.topic_names);
        assert_eq!(imported.token_weights, original.token_weights);
    }
}

#[test]
fn test_export_errors() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let existing = dir.path().join("existing");
    fs::write(&existing, b"").unwrap();
    let res = master.export_model(&ExportModelArgs {
        model_name: "missing".into(),
        file_name: existing,
    });
    assert!(matches!(res, Err(MasterErr::DiskWrite(_))));

    let res = master.export_model(&ExportModelArgs {
        model_name: "missing".into(),
        file_name: dir.path().join("missing.model"),
    });
    assert!(matches!(res, Err(MasterErr::ModelNotFound(_))));

    master
        .initialize_model(&InitializeModelArgs {
            model_name: "empty".into(),
            tokens: Vec::new(),
            topic_names: vec!["t0".into()],
        })
        .unwrap();
    let file_name = dir.path().join("empty.model");
    let res = master.export_model(&ExportModelArgs {
        model_name: "empty".into(),
        file_name: file_name.clone(),
    });
    assert!(matches!(res, Err(MasterErr::InvalidOperation(_))));
    assert!(!file_name.exists());
}

#[test]
fn test_truncated_import_registers_nothing() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let file_name = dir.path().join("m1.model");
    master
        .export_model(&ExportModelArgs {
            model_name: "m1".into(),
            file_name: file_name.clone(),
        })
        .unwrap();

    let bytes = fs::read(&file_name).unwrap();
    fs::write(&file_name, &bytes[..bytes.len() - 3]).unwrap();

    let res = master.import_model(&ImportModelArgs {
        model_name: "broken".into(),
        file_name,
    });
    assert!(matches!(res, Err(MasterErr::CorruptedMessage(_))));

    let res = master.request_topic_model(&GetTopicModelArgs {
        model_name: "broken".into(),
        ..Default::default()
    });
    assert!(matches!(res, Err(MasterErr::ModelNotFound(_))));
}

#[test]
fn test_merge_regularize_normalize() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let batches = vec![write_batch(&dir, "b1", "1")];
    master
        .process_batches(&process_args(batches, true, ThetaMatrixType::None))
        .unwrap();

    master
        .merge_model(&MergeModelArgs {
            nwt_target_name: "merged".into(),
            nwt_source_names: vec!["nwt_hat".into(), "gone".into(), "nwt_hat".into()],
            source_weights: vec![1., 1., 0.5],
            topic_names: Vec::new(),
        })
        .unwrap();
    let merged = chunk_of(&master, "merged", MatrixKind::Nwt);
    assert!(merged.token_weights.iter().all(|row| row == &vec![1.5, 1.5]));

    master
        .regularize_model(&RegularizeModelArgs {
            pwt_source_name: "m1".into(),
            nwt_source_name: "merged".into(),
            rwt_target_name: "rwt".into(),
            regularizer_settings: vec![RegularizerSettings {
                name: "push".into(),
                tau: 2.,
            }],
        })
        .unwrap();

    master
        .normalize_model(&NormalizeModelArgs {
            pwt_target_name: "pwt".into(),
            nwt_source_name: "merged".into(),
            rwt_source_name: Some("rwt".into()),
        })
        .unwrap();

    let pwt = chunk_of(&master, "pwt", MatrixKind::Pwt);
    for topic in 0..2 {
        let sum: f32 = pwt.token_weights.iter().map(|row| row[topic]).sum();
        assert!((sum - 1.).abs() < TOL);
    }
    assert!(pwt.token_weights.iter().flatten().all(|w| *w >= 0.));

    let missing = master.regularize_model(&RegularizeModelArgs {
        pwt_source_name: "missing".into(),
        nwt_source_name: "merged".into(),
        rwt_target_name: "rwt".into(),
        regularizer_settings: Vec::new(),
    });
    assert!(matches!(missing, Err(MasterErr::InvalidOperation(msg)) if msg.contains("missing")));
}

#[test]
fn test_regularizers_can_be_added_and_removed() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    let regularize = |master: &MasterComponent| {
        master
            .regularize_model(&RegularizeModelArgs {
                pwt_source_name: "m1".into(),
                nwt_source_name: "m1".into(),
                rwt_target_name: "rwt".into(),
                regularizer_settings: vec![RegularizerSettings {
                    name: "extra".into(),
                    tau: 1.,
                }],
            })
            .unwrap();
        chunk_of(master, "rwt", MatrixKind::Nwt).token_weights[0][0]
    };

    assert_eq!(regularize(&master), 0.);

    master
        .create_or_reconfigure_regularizer(regularizer("extra", 3.))
        .unwrap();
    assert_eq!(regularize(&master), 3.);
    assert_eq!(master.config().regularizer_config.len(), 2);

    master.dispose_regularizer("extra").unwrap();
    assert_eq!(regularize(&master), 0.);
    assert_eq!(master.config().regularizer_config.len(), 1);

    let unknown = RegularizerConfig {
        kind: "unknown".into(),
        ..regularizer("other", 1.)
    };
    assert!(master.create_or_reconfigure_regularizer(unknown).is_err());
}

#[test]
fn test_overwrite_topic_model() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let mut chunk = chunk_of(&master, "m1", MatrixKind::Nwt);
    chunk.token_weights = vec![vec![1., 0.], vec![1., 0.], vec![2., 0.]];
    master.overwrite_topic_model(&chunk).unwrap();

    let pwt = chunk_of(&master, "m1", MatrixKind::Pwt);
    assert_eq!(pwt.token_weights[2][0], 0.5);
}

#[test]
fn test_model_configs_and_disposal() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let mut bad = ModelConfig::new("m1");
    bad.use_sparse_bow = false;
    bad.class_ids = vec!["@default_class".into()];
    bad.class_weights = vec![1.];
    assert!(matches!(
        master.create_or_reconfigure_model(bad),
        Err(MasterErr::InvalidOperation(_))
    ));

    master.create_or_reconfigure_model(ModelConfig::new("m1")).unwrap();

    let batches = vec![write_batch(&dir, "b1", "1")];
    master
        .process_batches(&process_args(batches, true, ThetaMatrixType::Cache))
        .unwrap();

    master.dispose_model("m1").unwrap();
    let res = master.request_topic_model(&GetTopicModelArgs {
        model_name: "m1".into(),
        ..Default::default()
    });
    assert!(matches!(res, Err(MasterErr::ModelNotFound(_))));

    let documents = master
        .request_score(&GetScoreValueArgs {
            model_name: "m1".into(),
            score_name: "documents".into(),
            batch: None,
        })
        .unwrap();
    assert!(documents.is_none());
}

#[test]
fn test_reconfigure() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);

    let mut moved = config(&dir);
    moved.disk_path = Some(Path::new("/elsewhere").to_path_buf());
    assert!(matches!(master.reconfigure(moved), Err(MasterErr::InvalidOperation(_))));

    let mut bigger = config(&dir);
    bigger.processors_count = 4;
    bigger.score_config.pop();
    master.reconfigure(bigger).unwrap();
    assert_eq!(master.config().processors_count, 4);

    let batches = vec![write_batch(&dir, "b1", "1")];
    let result = master
        .process_batches(&process_args(batches, true, ThetaMatrixType::None))
        .unwrap();
    assert_eq!(result.score_data.len(), 1);

    let mut unknown = config(&dir);
    unknown.score_config.push(score("other", "unknown"));
    assert!(master.reconfigure(unknown).is_err());
    assert_eq!(master.config().processors_count, 4);
}

#[test]
fn test_wait_idle() {
    let dir = TempDir::new().unwrap();
    let master = master(&dir);
    assert!(master.wait_idle(WaitIdleArgs::default()));
    assert!(master.wait_idle(WaitIdleArgs {
        timeout_milliseconds: 0
    }));

    let batches = vec![write_batch(&dir, "slow", "1 500")];
    thread::scope(|s| {
        let round = s.spawn(|| {
            master.process_batches(&process_args(batches, true, ThetaMatrixType::None))
        });

        thread::sleep(Duration::from_millis(100));
        assert!(!master.wait_idle(WaitIdleArgs {
            timeout_milliseconds: 10
        }));
        assert!(master.wait_idle(WaitIdleArgs {
            timeout_milliseconds: -1
        }));

        round.join().unwrap().unwrap();
    });
}
