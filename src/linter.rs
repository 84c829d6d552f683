//! Document linting - static analysis of JSON:API document files.
//!
//! Checks document files for:
//! - JSON syntax errors
//! - Top level shape (embedded JSON Schema)
//! - `data` together with `errors`
//! - Resources without `type`
//! - Relationships that are empty or have malformed linkage
//! - Duplicate `included` resources
//! - Link relations JSON:API does not allow at their level

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CodecError;
use crate::policy::LinkScope;
use crate::types::{json_type_name, rel};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON pointer to the issue (e.g., "/data/relationships/directors")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Read and parse a JSON file.
///
/// # Errors
///
/// Returns `CodecError::FileNotFound`, `CodecError::ReadError` or `CodecError::InvalidJson`.
pub fn read_json(path: &Path) -> Result<Value, CodecError> {
    if !path.exists() {
        return Err(CodecError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| CodecError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let relative = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let document = match read_json(file) {
        Ok(document) => document,
        Err(e) => {
            return FileResult {
                file: relative,
                status: FileStatus::Error,
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    code: "E001".to_string(),
                    file: file.to_path_buf(),
                    path: "/".to_string(),
                    message: format!("syntax error: {}", e),
                }],
            };
        }
    };

    let mut checker = Checker {
        file,
        diagnostics: Vec::new(),
    };
    checker.check_document(&document);
    let diagnostics = checker.diagnostics;

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: relative,
        status,
        diagnostics,
    }
}

/// Lint an in-memory document.
pub fn lint_value(document: &Value, file: &Path) -> Vec<Diagnostic> {
    let mut checker = Checker {
        file,
        diagnostics: Vec::new(),
    };
    checker.check_document(document);
    checker.diagnostics
}

/// Top level shape of a JSON:API document.
fn document_schema() -> Value {
    json!({
        "type": "object",
        "anyOf": [
            { "required": ["data"] },
            { "required": ["errors"] },
            { "required": ["meta"] }
        ],
        "properties": {
            "jsonapi": { "type": "object" },
            "data": { "type": ["null", "object", "array"] },
            "included": { "type": "array", "items": { "type": "object" } },
            "links": { "type": "object" },
            "meta": { "type": "object" },
            "errors": { "type": "array", "items": { "type": "object" } }
        }
    })
}

struct Checker<'a> {
    file: &'a Path,
    diagnostics: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn report(&mut self, severity: Severity, code: &str, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.to_path_buf(),
            path: path.into(),
            message: message.into(),
        });
    }

    fn check_document(&mut self, document: &Value) {
        if let Ok(validator) = jsonschema::validator_for(&document_schema()) {
            let errors: Vec<(String, String)> = validator
                .iter_errors(document)
                .map(|e| (e.instance_path.to_string(), e.to_string()))
                .collect();
            for (path, message) in errors {
                let path = if path.is_empty() { "/".to_string() } else { path };
                self.report(Severity::Error, "E006", path, message);
            }
        }

        let Some(map) = document.as_object() else {
            return;
        };

        if map.contains_key("data") && map.contains_key("errors") {
            self.report(
                Severity::Error,
                "E002",
                "/",
                "members data and errors must not coexist",
            );
        }

        match map.get("data") {
            Some(resource @ Value::Object(_)) => self.check_resource(resource, "/data"),
            Some(Value::Array(resources)) => {
                for (i, resource) in resources.iter().enumerate() {
                    self.check_resource(resource, &format!("/data/{}", i));
                }
            }
            _ => {}
        }

        if let Some(Value::Array(included)) = map.get("included") {
            let mut seen = HashSet::new();
            for (i, resource) in included.iter().enumerate() {
                let path = format!("/included/{}", i);
                self.check_resource(resource, &path);

                let id = resource.get("id").and_then(identity_part);
                let json_api_type = resource.get("type").and_then(Value::as_str);
                if let (Some(id), Some(json_api_type)) = (id, json_api_type) {
                    if !seen.insert((id.clone(), json_api_type.to_string())) {
                        self.report(
                            Severity::Warning,
                            "W001",
                            path,
                            format!("duplicate included resource ({}, {})", id, json_api_type),
                        );
                    }
                }
            }
        }

        if let Some(links) = map.get("links") {
            self.check_links(links, "/links", LinkScope::Document);
        }
    }

    fn check_resource(&mut self, resource: &Value, path: &str) {
        let Some(map) = resource.as_object() else {
            return;
        };

        if !map.get("type").is_some_and(Value::is_string) {
            self.report(Severity::Error, "E003", path, "resource object has no type");
        }

        if let Some(links) = map.get("links") {
            self.check_links(links, &format!("{}/links", path), LinkScope::Resource);
        }

        if let Some(Value::Object(relationships)) = map.get("relationships") {
            for (name, relationship) in relationships {
                self.check_relationship(relationship, &format!("{}/relationships/{}", path, name));
            }
        }
    }

    fn check_relationship(&mut self, relationship: &Value, path: &str) {
        let Some(map) = relationship.as_object() else {
            self.report(
                Severity::Error,
                "E005",
                path,
                format!("relationship must be an object, got {}", json_type_name(relationship)),
            );
            return;
        };

        let has_link = map
            .get("links")
            .and_then(Value::as_object)
            .is_some_and(|links| links.contains_key(rel::SELF) || links.contains_key(rel::RELATED));
        if !map.contains_key("data") && !map.contains_key("meta") && !has_link {
            self.report(
                Severity::Error,
                "E004",
                path,
                "relationship needs data, meta or a self/related link",
            );
        }

        let data_path = format!("{}/data", path);
        match map.get("data") {
            None | Some(Value::Null) => {}
            Some(identifier @ Value::Object(_)) => self.check_identifier(identifier, &data_path),
            Some(Value::Array(identifiers)) => {
                for (i, identifier) in identifiers.iter().enumerate() {
                    self.check_identifier(identifier, &format!("{}/{}", data_path, i));
                }
            }
            Some(other) => self.report(
                Severity::Error,
                "E005",
                data_path,
                format!("linkage must be null, an object or an array, got {}", json_type_name(other)),
            ),
        }
    }

    fn check_identifier(&mut self, identifier: &Value, path: &str) {
        let id = identifier.get("id").and_then(identity_part);
        let json_api_type = identifier.get("type").and_then(Value::as_str);
        if id.is_none() || json_api_type.is_none() {
            self.report(
                Severity::Error,
                "E005",
                path,
                "resource identifier needs id and type",
            );
        }
    }

    fn check_links(&mut self, links: &Value, path: &str, scope: LinkScope) {
        let Some(map) = links.as_object() else {
            return;
        };
        for relation in map.keys() {
            if !scope.allows(relation) {
                self.report(
                    Severity::Warning,
                    "W002",
                    format!("{}/{}", path, relation),
                    format!(
                        "link relation \"{}\" is not allowed here: expected {}",
                        relation,
                        scope.allowed_relations().join(", ")
                    ),
                );
            }
        }
    }
}

fn identity_part(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().is_some_and(|e| e == "json") {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
}
