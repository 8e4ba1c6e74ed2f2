use ms_project::load_yaml;
use std::path::PathBuf;

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn all_demos_load_and_validate() {
    let mut count = 0;
    for entry in std::fs::read_dir(demos_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "yaml") {
            let project = load_yaml(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            assert!(!project.stages.is_empty());
            count += 1;
        }
    }
    assert!(count >= 2);
}

#[test]
fn two_stage_demo_contents() {
    let project = load_yaml(&demos_dir().join("two_stage.yaml")).unwrap();
    assert_eq!(project.stages.len(), 2);
    assert_eq!(project.payload_kg, 200.0);
    assert_eq!(project.constraints.len(), 2);
    assert_eq!(project.constraints[0].stage, 2);
    assert_eq!(project.optimizer.initial_guess_kg, Some(vec![1000.0, 100.0]));
}
