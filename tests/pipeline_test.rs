//! End-to-end pipeline test: train on the reference wine dataset,
//! record the run, register the model, build and deploy it, then score
//! one sample row over HTTP.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use mlrail::dataset::Dataset;
use mlrail::deploy::{DeploymentDriver, LocalBackend, Target};
use mlrail::registry::{ModelRegistry, Stage, VersionStatus};
use mlrail::serve::{router, AppState};
use mlrail::tracking::{ParamValue, RunStatus, TrackingStore};
use mlrail::train::{train_and_evaluate, TrainConfig};

const WINE_CSV: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/winequality-red.csv");

fn wine_dataset() -> Dataset {
    Dataset::from_delimited_path(WINE_CSV, b';', "quality").expect("load wine dataset")
}

fn wine_config() -> TrainConfig {
    TrainConfig {
        alpha: 0.75,
        l1_ratio: 0.25,
        ..TrainConfig::default()
    }
}

#[test]
fn test_wine_training_yields_finite_metrics_and_retrievable_run() -> anyhow::Result<()> {
    mlrail::logging::init_logging();
    let dataset = wine_dataset();
    let config = wine_config();

    let store = TrackingStore::new();
    let experiment = store.create_experiment("wine-quality");
    let run = store.begin_run(&experiment, "elasticnet-0.75-0.25")?;

    store.log_param(&run, "alpha", config.alpha)?;
    store.log_param(&run, "l1_ratio", config.l1_ratio)?;
    store.log_param(&run, "dataset", "winequality-red")?;

    let (model, metrics) = train_and_evaluate(&dataset, &config)?;
    assert!(metrics.is_finite(), "metrics: {metrics:?}");

    store.log_metric(&run, "rmse", 0, metrics.rmse)?;
    store.log_metric(&run, "mae", 0, metrics.mae)?;
    store.log_metric(&run, "r2", 0, metrics.r2)?;
    store.log_artifact(&run, "model.json", model.to_artifact_bytes()?)?;
    store.end_run(&run, RunStatus::Finished)?;

    // The run id stays retrievable with exactly what was logged.
    let record = store.get_run(&run).expect("run exists");
    assert_eq!(record.status(), RunStatus::Finished);
    let params = store.params_for_run(&run);
    assert_eq!(params.len(), 3);
    assert_eq!(params.get("alpha"), Some(&ParamValue::Number(0.75)));
    assert_eq!(params.get("l1_ratio"), Some(&ParamValue::Number(0.25)));
    assert_eq!(store.latest_metric(&run, "rmse"), Some(metrics.rmse));
    Ok(())
}

#[test]
fn test_wine_training_is_reproducible() -> anyhow::Result<()> {
    let dataset = wine_dataset();
    let config = wine_config();
    let (_, first) = train_and_evaluate(&dataset, &config)?;
    let (_, second) = train_and_evaluate(&dataset, &config)?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_full_pipeline_scores_one_row_over_http() -> anyhow::Result<()> {
    let dataset = wine_dataset();
    let config = wine_config();

    // Train and record.
    let tracking = Arc::new(TrackingStore::new());
    let experiment = tracking.create_experiment("wine-quality");
    let run = tracking.begin_run(&experiment, "elasticnet")?;
    let (model, metrics) = train_and_evaluate(&dataset, &config)?;
    assert!(metrics.is_finite());
    let artifact = tracking.log_artifact(&run, "model.json", model.to_artifact_bytes()?)?;
    tracking.end_run(&run, RunStatus::Finished)?;

    // Register and promote.
    let registry = Arc::new(ModelRegistry::new());
    let version = registry.register("wine-model", &run, &artifact)?;
    registry.await_ready("wine-model", version)?;
    assert_eq!(
        registry.get_version("wine-model", version)?.status(),
        VersionStatus::Ready
    );
    registry.transition_stage("wine-model", version, Stage::Production, false)?;

    // Build and deploy the artifact the registry points at.
    let production = registry
        .latest_by_stage("wine-model", Stage::Production)?
        .expect("a production version");
    assert_eq!(production.artifact_sha(), artifact.sha256());
    let payload = tracking.artifact_bytes(&artifact)?;

    let backend = Arc::new(LocalBackend::new());
    let driver = DeploymentDriver::new(Arc::clone(&backend));
    let image = driver.build_image(&production, payload)?;
    driver.wait_for_image(&image)?;
    let endpoint = driver.deploy(&image, Target::Prod)?;
    assert_eq!(endpoint.name(), "wine-model-prod");
    let key = endpoint.auth_key().expect("prod endpoint has a key").to_string();

    // Score one sample row over the HTTP facade.
    let sample_row = dataset.features()[0].clone();
    let request_body = serde_json::json!({
        "columns": dataset.feature_names(),
        "data": [sample_row],
    });
    let state = AppState {
        tracking,
        registry,
        backend,
    };
    let request = Request::post(format!("/invocations/{}", endpoint.name()))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {key}"))
        .body(Body::from(request_body.to_string()))?;

    let response = router(state).oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let predictions: Vec<f64> = serde_json::from_slice(&bytes)?;
    assert_eq!(predictions.len(), 1);
    assert!(predictions[0].is_finite());
    Ok(())
}

#[test]
fn test_packaging_manifest_matches_training_entry_point() -> anyhow::Result<()> {
    let manifest = mlrail::manifest::ProjectManifest::from_yaml_str(
        r#"
name: wine-quality
environment: env.yaml
entry_points:
  main:
    command: "train --alpha {alpha} --l1-ratio {l1_ratio} {data}"
    parameters:
      alpha:
        type: float
        default: 0.5
      l1_ratio:
        type: float
        default: 0.5
      data:
        type: path
"#,
    )?;

    let mut overrides = BTreeMap::new();
    overrides.insert("alpha".to_string(), "0.75".to_string());
    overrides.insert("l1_ratio".to_string(), "0.25".to_string());
    overrides.insert("data".to_string(), "tests/data/winequality-red.csv".to_string());
    let command = manifest.render_command("main", &overrides)?;
    assert_eq!(
        command,
        "train --alpha 0.75 --l1-ratio 0.25 tests/data/winequality-red.csv"
    );
    Ok(())
}
