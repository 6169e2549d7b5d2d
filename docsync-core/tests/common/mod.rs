#![allow(dead_code)]

use docsync_core::contract::{GenerationRequest, MockTextGenerator};
use docsync_core::mapping::MappingTable;
use docsync_core::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const TABLE: &str = r#"{
  "repositories": {
    "android": { "owner": "acme", "repo": "sdk-android", "defaultBranch": "develop" }
  },
  "patterns": [
    { "docsPrefix": "sdk-docs/android/", "publicBase": "android/docs/", "privateBase": "docs/", "repo": "android" }
  ]
}"#;

pub fn table() -> MappingTable {
    MappingTable::from_json(TABLE).expect("fixture table parses")
}

/// Which stage issued a generation request, told apart by its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Called {
    Classifier,
    Comparator,
    Converter,
    Validator,
}

pub fn stage_of(request: &GenerationRequest) -> Called {
    let system = &request.system;
    if system.contains("file classifier") {
        Called::Classifier
    } else if system.contains("documentation comparator") {
        Called::Comparator
    } else if system.contains("documentation converter") {
        Called::Converter
    } else if system.contains("QA reviewer") {
        Called::Validator
    } else {
        panic!("unexpected generation request: {}", system)
    }
}

pub type CallLog = Arc<Mutex<Vec<Called>>>;

/// A deterministic stand-in for the generation service.
pub fn oracle<F>(respond: F) -> (MockTextGenerator, CallLog)
where
    F: Fn(Called, &GenerationRequest) -> Result<String> + Send + 'static,
{
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let calls = log.clone();
    let mut generator = MockTextGenerator::new();
    generator.expect_complete().returning(move |request| {
        let stage = stage_of(&request);
        calls.lock().unwrap().push(stage);
        respond(stage, &request)
    });
    (generator, log)
}

/// A generator that must never be called.
pub fn silent_oracle() -> MockTextGenerator {
    let mut generator = MockTextGenerator::new();
    generator.expect_complete().never();
    generator
}

pub fn calls(log: &CallLog) -> Vec<Called> {
    log.lock().unwrap().clone()
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).unwrap()
}

pub const PASSED: &str = r#"{"passed": true, "issues": []}"#;
pub const CONTENT_LOSS: &str = r#"{"passed": false, "issues": ["CONTENT_LOSS: the Setup section is missing"]}"#;
pub const DIFFERENT: &str = r#"{"identical": false, "reason": "a paragraph was added"}"#;
pub const PUBLISH: &str = r#"{"publish": true, "syncBack": true, "reason": "SDK feature guide"}"#;
