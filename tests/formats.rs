use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tabular_etl::config::Configuration;
use tabular_etl::pipeline::{
    FileProcessor, PipelineEvent, PipelineObserver, ProcessRequest, ProcessingStage, ProcessorOptions,
};
use tabular_etl::sink::Artifact;
use tabular_etl::types::{Batch, Value};

const ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn processor(template: &str) -> FileProcessor {
    FileProcessor::new(
        Configuration::from_json_str(ID, template).unwrap(),
        ProcessorOptions::default(),
    )
}

#[test]
fn joins_several_files_by_row_order() {
    let dir = tempfile::tempdir().unwrap();
    let people = write_file(dir.path(), "people.csv", "id,name\n1,ada\n2,bo\n");
    let cities = write_file(dir.path(), "cities.tsv", "city\tcountry\nparis\tFR\nrome\tIT\n");
    let out = dir.path().join("out.csv");
    let template = r#"{
        "sourceFiles": [
            {"type": "CSV", "hasHeader": true},
            {"type": "CSV", "hasHeader": true, "delimiter": "\t"}
        ],
        "sourceFields": [
            {"name": "id", "fileIndex": 0},
            {"name": "name", "fileIndex": 0},
            {"name": "city", "fileIndex": 1},
            {"name": "country", "fileIndex": 1, "used": false}
        ],
        "outputFile": {"type": "CSV", "hasHeader": true, "delimiter": ";"},
        "outputFields": [
            {"name": "id", "type": "INT", "sourceFields": [0]},
            {"name": "who", "type": "STRING", "sourceFields": [1, 2], "mergeDelimiters": [" from "]}
        ]
    }"#;

    let summary = processor(template)
        .process(ProcessRequest::from_files(vec![people, cities]).with_output(&out))
        .unwrap();

    assert_eq!(summary.rows_written, 2);
    assert_eq!(fs::read_to_string(&out).unwrap(), "id;who\n1;ada from paris\n2;bo from rome\n");
}

#[test]
fn fixed_width_in_and_out() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "people.txt", "skip me\nid  name    \n1   ada     \n\n2   bartholomew\n");
    let out = dir.path().join("out.txt");
    let template = r#"{
        "sourceFiles": [{"type": "FWF", "hasHeader": true, "skipRows": 1}],
        "sourceFields": [
            {"name": "id", "fileIndex": 0, "colSpecs": [0, 4]},
            {"name": "name", "fileIndex": 0, "colSpecs": [4, 12]}
        ],
        "outputFile": {"type": "FWF", "hasHeader": true},
        "outputFields": [
            {"name": "id", "type": "INT", "sourceFields": [0], "colSpecs": [0, 3],
             "transformations": [{"operation": "MODIFY_DO_MATH", "parameters": {"operator": "MULTIPLY", "value": 10}}]},
            {"name": "name", "type": "STRING", "sourceFields": [1], "colSpecs": [3, 9]}
        ]
    }"#;

    let summary = processor(template)
        .process(ProcessRequest::from_files(vec![input]).with_output(&out))
        .unwrap();

    assert_eq!(summary.rows_written, 2);
    assert_eq!(fs::read_to_string(&out).unwrap(), "id name  \n10 ada   \n20 bartho\n");
}

#[test]
fn json_records_report_objects_and_write_lines() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "people.json",
        r#"[{"id": 1, "user": {"name": "ada"}}, {"id": 2, "user": {"name": "grace"}}, {"id": 3}]"#,
    );
    let out = dir.path().join("people.ndjson");
    let template = r#"{
        "sourceFiles": [{"type": "JSON"}],
        "sourceFields": [{"name": "id", "fileIndex": 0}, {"name": "user.name", "fileIndex": 0}],
        "outputFile": {"type": "JSON", "lineDelimitedJSON": true},
        "outputFields": [
            {"name": "Id", "type": "INT", "sourceFields": [0]},
            {"name": "Name", "type": "STRING", "sourceFields": [1], "allowNull": true,
             "transformations": [{"operation": "VALIDATE_BY_LENGTH", "parameters": {"operator": "LE", "value": 3}}]}
        ]
    }"#;

    let mut p = processor(template);
    let summary = p
        .process(ProcessRequest::from_files(vec![input]).with_output(&out))
        .unwrap();

    assert_eq!(summary.rows_written, 3);
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "{\"Id\":1,\"Name\":\"ada\"}\n{\"Id\":2,\"Name\":\"grace\"}\n{\"Id\":3,\"Name\":\"\"}\n"
    );
    assert_eq!(
        p.diagnostics().warnings(),
        ["'Name', Object 2, transformation #1: 'grace' did not match the specified length requirements \
          (less than or equal to 3 characters)."]
    );
    assert!(dir.path().join("errors_and_warnings.txt").exists());
}

#[derive(Default)]
struct Recorder(Mutex<Vec<PipelineEvent>>);

impl PipelineObserver for Recorder {
    fn on_event(&self, event: &PipelineEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[test]
fn in_process_records_with_observer() {
    let template = r#"{
        "sourceFiles": [{"type": "IN_PROCESS"}],
        "sourceFields": [{"name": "amount", "fileIndex": 0}, {"name": "flag", "fileIndex": 0}],
        "outputFile": {"type": "IN_PROCESS"},
        "outputFields": [
            {"name": "amount", "type": "FLOAT", "sourceFields": [0],
             "transformations": [{"operation": "MODIFY_ROUND_NUMBER", "parameters": {"precision": 1}}]},
            {"name": "flag", "type": "BOOLEAN", "sourceFields": [1], "truthyStrings": ["Y"]}
        ]
    }"#;
    let recorder = Arc::new(Recorder::default());
    let mut p = FileProcessor::new(
        Configuration::from_json_str(ID, template).unwrap(),
        ProcessorOptions {
            observer: Some(recorder.clone()),
            ..ProcessorOptions::default()
        },
    );

    let records = Batch::from_values(
        vec!["flag".to_string(), "amount".to_string(), "extra".to_string()],
        vec![
            vec![Value::from("Y"), Value::from("2.25"), Value::Null],
            vec![Value::from("N"), Value::Float(-1.35), Value::Null],
        ],
    );
    let summary = p.process_batch(records).unwrap();

    let Artifact::InProcess(output) = summary.artifact else {
        panic!("expected in-process output");
    };
    assert_eq!(output.columns, vec!["amount", "flag"]);
    assert_eq!(output.rows[0].values, vec![Value::Float(2.3), Value::Bool(true)]);
    assert_eq!(output.rows[1].values, vec![Value::Float(-1.4), Value::Bool(false)]);

    let events = recorder.0.lock().unwrap();
    assert_eq!(events.first(), Some(&PipelineEvent::RunStarted { chunk_size: 1_000_000 }));
    assert!(matches!(events.last(), Some(PipelineEvent::RunFinished { rows_written: 2, .. })));
    let stages: Vec<ProcessingStage> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageChanged { stage } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            ProcessingStage::Initializing,
            ProcessingStage::RetrievingData,
            ProcessingStage::Mapping,
            ProcessingStage::Validating,
            ProcessingStage::Transforming,
            ProcessingStage::WritingData,
            ProcessingStage::RetrievingData,
            ProcessingStage::WritingErrors,
            ProcessingStage::FinalizingOutput,
        ]
    );
}

#[cfg(feature = "excel")]
#[test]
fn spreadsheet_round_trip() {
    use calamine::{open_workbook_auto, Data, Reader};
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("people.xlsx");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("People").unwrap();
    ws.write_string(0, 0, "id").unwrap();
    ws.write_string(0, 1, "name").unwrap();
    ws.write_number(1, 0, 1).unwrap();
    ws.write_string(1, 1, "Ada").unwrap();
    ws.write_number(2, 0, 2).unwrap();
    ws.write_string(2, 1, "Grace").unwrap();
    wb.save(&input).unwrap();

    let out_dir = dir.path().join("out");
    let template = r#"{
        "sourceFiles": [{"type": "EXCEL", "hasHeader": true, "sheetName": "People"}],
        "sourceFields": [{"name": "id", "fileIndex": 0}, {"name": "name", "fileIndex": 0}],
        "outputFile": {"type": "EXCEL", "hasHeader": true, "sheetName": "Out"},
        "outputFields": [
            {"name": "id", "type": "INT", "sourceFields": [0]},
            {"name": "name", "type": "STRING", "sourceFields": [1],
             "transformations": [{"operation": "MODIFY_APPEND_STRING", "parameters": {"operator": "LEFT", "value": "Dr. "}}]}
        ]
    }"#;
    let summary = processor(template)
        .process(ProcessRequest::from_files(vec![input]).with_output(&out_dir))
        .unwrap();

    let output = out_dir.join("output.xlsx");
    assert_eq!(summary.artifact, Artifact::File { path: output.clone() });

    let mut wb = open_workbook_auto(&output).unwrap();
    let range = wb.worksheet_range("Out").unwrap();
    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    assert_eq!(
        rows,
        vec![
            vec![Data::String("id".into()), Data::String("name".into())],
            vec![Data::Float(1.0), Data::String("Dr. Ada".into())],
            vec![Data::Float(2.0), Data::String("Dr. Grace".into())],
        ]
    );
}
