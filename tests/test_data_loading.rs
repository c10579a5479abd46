//! Integration test: loading views from disk and running the pipeline on them

use std::path::{Path, PathBuf};

use multiview_knn::data::read_arff;
use multiview_knn::prelude::*;
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn temp_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

fn arff_view(relation: &str, offset: f64) -> String {
    let mut text = format!(
        "% generated view\n@relation {}\n\n@attribute x numeric\n@attribute 'wrist side' {{left,right}}\n@attribute activity {{walk,sit}}\n\n@data\n",
        relation
    );
    for i in 0..12 {
        let class = if i < 6 { "walk" } else { "sit" };
        let side = if i < 6 { "left" } else { "right" };
        let x = offset + if i < 6 { i as f64 * 0.1 } else { 20.0 + i as f64 * 0.1 };
        text.push_str(&format!("{},{},{}\n", x, side, class));
    }
    text
}

#[test]
fn test_read_arff_view() {
    let dir = temp_dir();
    let path = write_file(dir.path(), "phone.arff", &arff_view("phone", 0.0));
    let dataset = read_arff(&path).unwrap();

    assert_eq!(dataset.name(), "phone");
    assert_eq!(dataset.n_instances(), 12);
    assert_eq!(dataset.n_features(), 2);
    assert_eq!(dataset.class_names(), &["walk", "sit"]);
    assert_eq!(dataset.class_counts(), vec![6, 6]);
    assert!(dataset.attributes()[1].is_nominal());
    assert!(dataset.weights().iter().all(|&w| w == 1.0));
}

#[test]
fn test_pipeline_from_arff_files() {
    let dir = temp_dir();
    let phone = write_file(dir.path(), "phone.arff", &arff_view("phone", 0.0));
    let watch = write_file(dir.path(), "watch.arff", &arff_view("watch", 5.0));

    let config = MultiViewConfig::new([&phone, &watch]).with_folds(3);
    let report = MultiViewPipeline::new(config).unwrap().run().unwrap();

    assert_eq!(report.n_instances, 12);
    assert_eq!(report.views.len(), 2);
    assert_eq!(report.views[0].name, "phone");
    assert_eq!(report.views[0].ensemble_size, 3);
    assert_eq!(report.accuracy, 100.0);

    let json = report.to_json().unwrap();
    assert!(json.contains("\"accuracy\""));
}

#[test]
fn test_weighted_arff_view() {
    let dir = temp_dir();
    let path = write_file(
        dir.path(),
        "weighted.arff",
        "@relation weighted\n@attribute x numeric\n@attribute c {a,b}\n@data\n0,a,{50}\n1,b\n1.1,b\n",
    );
    let dataset = read_arff(&path).unwrap();
    assert_eq!(dataset.weights(), &[50.0, 1.0, 1.0]);

    let mut knn = KNNClassifier::with_k(3);
    Learner::fit(&mut knn, std::sync::Arc::new(TrainingSet::from_dataset(&dataset))).unwrap();
    let query = ndarray::array![0.4];
    assert_eq!(knn.predict(query.view()).unwrap(), 0);
}

#[test]
fn test_missing_view_file() {
    let dir = temp_dir();
    let config = MultiViewConfig::new([dir.path().join("absent.arff")]);
    let result = MultiViewPipeline::new(config).unwrap().run();
    assert!(result.is_err());
}

#[test]
fn test_load_csv_view() {
    let dir = temp_dir();
    let path = write_file(
        dir.path(),
        "watch.csv",
        "x,y,activity\n1.0,2.0,walk\n1.5,?,sit\n2.0,3.0,walk\n9.0,8.0,jog\n",
    );
    let dataset = DataLoader::new().load(&path).unwrap();

    assert_eq!(dataset.n_instances(), 4);
    assert_eq!(dataset.n_features(), 2);
    assert_eq!(dataset.class_names(), &["walk", "sit", "jog"]);
    assert_eq!(dataset.labels(), &[0, 1, 0, 2]);
    assert!(dataset.features()[[1, 1]].is_nan());
}

#[test]
fn test_numeric_class_sorted() {
    let dir = temp_dir();
    let path = write_file(dir.path(), "numeric.csv", "x,label\n0.5,2\n0.7,1\n0.9,2\n");
    let dataset = DataLoader::new().load(&path).unwrap();

    assert_eq!(dataset.class_names(), &["1", "2"]);
    assert_eq!(dataset.labels(), &[1, 0, 1]);
}

#[test]
fn test_summary() {
    let dir = temp_dir();
    let path = write_file(dir.path(), "summary.arff", &arff_view("summary", 0.0));
    let summary = DataLoader::new().summarize(&path).unwrap();

    assert_eq!(summary.name, "summary");
    assert_eq!(summary.n_instances, 12);
    assert_eq!(summary.n_nominal_features, 1);
    assert_eq!(summary.class_name, "activity");
    assert_eq!(summary.ensemble_size, 3);
    assert_eq!(
        summary.class_counts,
        vec![("walk".to_string(), 6), ("sit".to_string(), 6)]
    );
}
