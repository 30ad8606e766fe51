//! CI validation for the endpoint manifest (manifest/endpoints.toml).
//!
//! These tests keep the manifest syntactically valid and in step with the
//! fixed endpoint contract of the service: every endpoint has its required
//! fields, uses a known verb, and lists the query parameters the client
//! actually sends.

use serde::Deserialize;

/// Top-level manifest structure matching the TOML schema.
#[derive(Debug, Deserialize)]
struct Manifest {
    meta: Meta,
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Meta {
    schema_version: u32,
    last_validated: String,
}

/// A single endpoint entry in the manifest.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Endpoint {
    family: String,
    name: String,
    method: String,
    path: String,
    params: Vec<String>,
    response: String,
    implemented: bool,
    #[serde(default)]
    notes: String,
}

fn load_manifest() -> Manifest {
    let content = std::fs::read_to_string("manifest/endpoints.toml")
        .expect("manifest/endpoints.toml should exist and be readable");
    toml::from_str(&content).expect("manifest/endpoints.toml should be valid TOML")
}

fn endpoint<'a>(manifest: &'a Manifest, name: &str) -> &'a Endpoint {
    manifest
        .endpoints
        .iter()
        .find(|ep| ep.name == name)
        .unwrap_or_else(|| panic!("endpoint '{name}' missing from manifest"))
}

#[test]
fn manifest_endpoints_toml_is_valid() {
    let manifest = load_manifest();

    assert!(
        manifest.meta.schema_version >= 1,
        "schema_version must be at least 1"
    );
    assert!(!manifest.endpoints.is_empty());

    for ep in &manifest.endpoints {
        assert!(!ep.family.is_empty(), "endpoint family must not be empty");
        assert!(!ep.name.is_empty(), "endpoint name must not be empty");
        assert!(
            ep.path.starts_with('/'),
            "endpoint '{}' path must start with '/'",
            ep.name
        );
        assert!(ep.implemented, "endpoint '{}' should be implemented", ep.name);
    }
}

#[test]
fn manifest_endpoint_methods_are_valid_http_verbs() {
    let manifest = load_manifest();
    let valid_methods = ["GET", "POST", "PUT", "DELETE"];
    for ep in &manifest.endpoints {
        assert!(
            valid_methods.contains(&ep.method.as_str()),
            "endpoint '{}' has invalid method '{}', expected one of {:?}",
            ep.name,
            ep.method,
            valid_methods
        );
    }
}

#[test]
fn manifest_matches_service_contract() {
    let manifest = load_manifest();
    let expected: [(&str, &str, &str, &[&str]); 9] = [
        ("authorize", "GET", "/authorize", &[]),
        (
            "copy_device",
            "POST",
            "/copyDevice",
            &["deviceid", "new_deviceid", "filename", "overwrite"],
        ),
        (
            "create_file",
            "POST",
            "/createFile",
            &["deviceid", "filename", "rootname"],
        ),
        (
            "create_node",
            "POST",
            "/create",
            &["deviceid", "filename", "parent_path", "tag", "value"],
        ),
        ("delete_node", "DELETE", "/delete", &["deviceid", "filename", "path"]),
        ("delete_file", "DELETE", "/deleteFile", &["deviceid", "filename"]),
        ("list_files", "GET", "/listFile", &["deviceid"]),
        ("read_node", "GET", "/read", &["deviceid", "filename", "path"]),
        (
            "update_node",
            "PUT",
            "/update",
            &["deviceid", "filename", "path", "value"],
        ),
    ];

    assert_eq!(manifest.endpoints.len(), expected.len());
    for (name, method, path, params) in expected {
        let ep = endpoint(&manifest, name);
        assert_eq!(ep.method, method, "method of '{name}'");
        assert_eq!(ep.path, path, "path of '{name}'");
        assert_eq!(ep.params, params, "params of '{name}'");
    }
}
