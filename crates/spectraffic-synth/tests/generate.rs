//! End-to-end generation from specification files on disk

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Value, json};

use spectraffic_core::{AssembleOptions, Config, LabelCatalog, Sheet};
use spectraffic_synth::{SpecRun, SpecVersion};

fn write(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    path
}

fn run(seed: u64) -> SpecRun {
    SpecRun::new(LabelCatalog::builtin(), seed).with_options(AssembleOptions {
        host_suffix: Some("test".into()),
        ..AssembleOptions::default()
    })
}

fn users_spec() -> Value {
    json!({
        "openapi": "3.0.1",
        "servers": [{"url": "https://api.example.com/v1"}],
        "components": {
            "securitySchemes": {"key": {"type": "apiKey", "in": "header", "name": "X-Key"}}
        },
        "paths": {
            "/users/{id}": {
                "get": {
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        }
    })
}

#[test]
fn v3_operation_to_test_case() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write(dir.path(), "users.json", &users_spec());
    let out = run(42).generate(&spec, &Config::default()).unwrap();

    let rows = &out.rows;
    assert_eq!(rows.version, SpecVersion::V3);
    assert_eq!(rows.groups.len(), 1);
    let group = &rows.groups[0];
    assert_eq!(group.operation, "GET /users/{id}");
    assert_eq!(group.rows.len(), 2);

    let valid = &group.rows[0];
    assert_eq!(valid.url, "/v1/users/<random-integer>");
    assert_eq!(valid.host, "api.example.com");
    assert_eq!(valid.response_code, "200");
    assert_eq!(valid.headers["X-Key"], "<random-string>");
    assert_eq!(valid.headers["Content-Type"], "application/json");
    assert_eq!(valid.headers["apisec-resp-status-code"], "200");

    let negative = &group.rows[1];
    assert!(negative.negative);
    assert_eq!(negative.url, "/v1/users/<random-integer>/UnknownPath");
    assert_eq!(negative.response_code, "403");

    let case = &out.assembly.test_cases[&1];
    assert_eq!(case.input.len(), 2);
    let first = &case.input[0];
    assert!(Regex::new(r"^/v1/users/\d+$").unwrap().is_match(&first.url), "{}", first.url);
    assert_eq!(first.host, "api.example.com.test");
    assert_eq!(first.method, "GET");
    assert_eq!(first.rsp_code, 200);

    let header: Value = serde_json::from_str(first.extra["Req_Header"].as_str().unwrap()).unwrap();
    let key = header["X-Key"].as_str().unwrap();
    assert!(Regex::new("^[A-Za-z]{10}$").unwrap().is_match(key), "{key}");

    assert_eq!(case.input[1].rsp_code, 403);
    assert!(case.input[1].url.ends_with("/UnknownPath"));
    assert_eq!(out.unresolved, 0);
}

#[test]
fn sheet_columns_are_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write(dir.path(), "users.json", &users_spec());
    let rows = run(1).rows(&spec).unwrap();

    insta::assert_yaml_snapshot!(rows.sheet.header, @r"
    - test_id
    - Input_URL
    - Input_Host
    - Input_Method
    - Input_Rsp_Code
    - Input_Req_Header
    - Input_Req_Body
    - Input_Rsp_Body
    ");
}

#[test]
fn v2_body_and_content_types() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write(
        dir.path(),
        "pets.json",
        &json!({
            "swagger": "2.0",
            "host": "petstore.io",
            "basePath": "/api",
            "consumes": ["application/json", "application/xml"],
            "definitions": {
                "Pet": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}, "email": {"type": "string"}}
                }
            },
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "parameters": [{"name": "petId", "in": "path", "type": "string"}],
                        "responses": {"200": {}}
                    }
                },
                "/pets": {
                    "post": {
                        "parameters": [
                            {"name": "pet", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}
                        ],
                        "responses": {"201": {}}
                    }
                }
            }
        }),
    );
    let out = run(5).generate(&spec, &Config::default()).unwrap();
    let groups = &out.rows.groups;

    assert_eq!(out.rows.version, SpecVersion::V2);
    assert_eq!(out.rows.base_path, "/api");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].sequence_id, 1);
    assert_eq!(groups[1].sequence_id, 2);
    assert_eq!(groups[0].rows[0].url, "/api/pets/<random-string>");

    let post = &groups[1];
    // two content types, one response, one negative
    assert_eq!(post.rows.len(), 3);
    let json_row = &post.rows[0];
    assert_eq!(json_row.host, "petstore.io");
    assert_eq!(
        json_row.request_body,
        json!({"name": "<valid-full-name>", "email": "<valid-email>"})
    );
    let xml_row = &post.rows[1];
    assert_eq!(xml_row.headers["Content-Type"], "application/xml");
    assert_eq!(xml_row.request_body, json_row.request_body);

    let body = out.assembly.test_cases[&2].input[0].req_body.clone().unwrap();
    assert!(body["email"].as_str().unwrap().contains('@'));
    assert!(!body["name"].as_str().unwrap().starts_with('<'));
}

#[test]
fn cyclic_schemas_are_generated() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write(
        dir.path(),
        "tree.json",
        &json!({
            "openapi": "3.0.0",
            "paths": {"/nodes": {"post": {
                "requestBody": {"content": {"application/json": {
                    "schema": {"$ref": "#/components/schemas/Node"}
                }}},
                "responses": {"200": {}}
            }}},
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"child": {"$ref": "#/components/schemas/Node"}}
            }}}
        }),
    );
    let out = run(9).rows(&spec).unwrap();

    let row = &out.groups[0].rows[0];
    assert_eq!(row.host, "Default");
    assert_eq!(row.request_body, json!({"child": {"child": {}}}));
}

#[test]
fn external_references_resolve_from_the_spec_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "schemas.json",
        &json!({"Login": {"type": "object", "properties": {"username": {"type": "string"}}}}),
    );
    let spec = write(
        dir.path(),
        "auth.json",
        &json!({
            "openapi": "3.0.0",
            "paths": {"/login": {"post": {
                "requestBody": {"content": {"application/json": {
                    "schema": {"$ref": "schemas.json#/Login"}
                }}},
                "responses": {"204": {}}
            }}}
        }),
    );
    let out = run(2).rows(&spec).unwrap();

    assert_eq!(out.groups[0].rows[0].request_body, json!({"username": "<valid-username>"}));
    assert_eq!(out.groups[0].rows[0].response_code, "204");
}

#[test]
fn unsupported_content_types_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write(
        dir.path(),
        "upload.json",
        &json!({
            "openapi": "3.0.0",
            "paths": {"/upload": {"put": {
                "requestBody": {"content": {"image/png": {"schema": {"type": "string"}}}},
                "responses": {"200": {}}
            }}}
        }),
    );
    let out = run(2).rows(&spec).unwrap();

    assert!(out.groups.is_empty());
    assert_eq!(out.enumeration_warnings.len(), 1);
}

#[test]
fn fan_out_events_advance_sequences() {
    let header: Vec<String> = spectraffic_core::sheet::HEADER_LIST
        .iter()
        .map(|h| (*h).to_string())
        .collect();
    let cells = [
        "1",
        "/accounts/<sequence-ssn>|{\"q\": \"x\"}|event:3",
        "bank.io",
        "POST",
        "201",
        "{\"Content-Type\": \"application/json\"}",
        "{\"owner\": {\"email\": \"<valid-email>\"}}",
        "{}",
    ];
    let sheet = Sheet {
        header,
        rows: vec![cells.iter().map(|c| Some((*c).to_string())).collect()],
    };

    let (assembly, unresolved) = run(17).assemble(&sheet, &Config::default());
    assert_eq!(unresolved, 0);

    let input = &assembly.test_cases[&1].input;
    assert_eq!(input.len(), 3);
    let url = Regex::new(r"^/accounts/(\d{3})-(\d{2})-(\d{4})\?q=x$").unwrap();
    let serials: Vec<u32> = input
        .iter()
        .map(|event| {
            let caps = url.captures(&event.url).unwrap();
            caps[3].parse().unwrap()
        })
        .collect();
    assert_eq!(serials[1], serials[0] % 9999 + 1);
    assert_eq!(serials[2], serials[1] % 9999 + 1);

    let emails: Vec<&str> = input
        .iter()
        .map(|event| event.req_body.as_ref().unwrap()["owner"]["email"].as_str().unwrap())
        .collect();
    assert!(emails.iter().all(|e| e.contains('@')));
    assert_ne!(emails[0], emails[1]);
}
