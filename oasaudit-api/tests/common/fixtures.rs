//! Test data fixtures for oasaudit-api

use std::fs;
use std::path::Path;
use std::sync::Arc;

use oasaudit_api::{CandidateFile, ContractFormat};

/// OpenAPI 3.0.2 contract in YAML with formatted properties
pub fn openapi_30_yaml() -> &'static str {
    r#"openapi: 3.0.2
info:
  title: Pets API
  version: 1.0.0
paths:
  /pets/{id}:
    get:
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
            format: uuid
      responses:
        '200':
          description: A pet
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
      properties:
        id:
          type: string
          format: uuid
        born:
          type: string
          format: date-time
        email:
          type: string
          format: email
          maxLength: 64
        example:
          type: string
          format: date
        age:
          type: integer
          format: int32
      example:
        id: not-a-uuid
        born:
          format: date
"#
}

/// Swagger 2.0 contract in JSON
pub fn swagger_20_json() -> &'static str {
    r#"{
  "swagger": "2.0",
  "info": {"title": "Orders", "version": "2.1"},
  "paths": {
    "/orders": {
      "get": {
        "parameters": [
          {"name": "since", "in": "query", "type": "string", "format": "date", "pattern": "^custom$"}
        ],
        "responses": {"200": {"description": "ok"}}
      }
    }
  },
  "definitions": {
    "Order": {
      "type": "object",
      "properties": {
        "ref": {"type": "string", "format": "uuid", "x-note": {"format": "email"}}
      }
    }
  }
}"#
}

pub fn openapi_31_yaml() -> &'static str {
    r#"openapi: 3.1.0
info:
  title: Newer
  version: 1.0.0
paths: {}
"#
}

pub fn openapi_30_missing_paths() -> &'static str {
    r#"{"openapi": "3.0.0", "info": {"title": "No paths", "version": "1"}}"#
}

pub fn package_json() -> &'static str {
    r#"{"name": "web", "version": "1.0.0", "dependencies": {}}"#
}

pub fn compose_yaml() -> &'static str {
    "services:\n  web:\n    image: nginx\n"
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// In-memory candidate, as discovery would produce it
pub fn candidate(relative: &str, content: &str) -> Arc<CandidateFile> {
    let extension = relative.rsplit('.').next().unwrap_or_default();
    Arc::new(CandidateFile {
        path: Path::new("/repo").join(relative),
        relative_path: relative.to_string(),
        format: ContractFormat::from_extension(extension).unwrap_or(ContractFormat::Yaml),
        content: content.to_string(),
    })
}
