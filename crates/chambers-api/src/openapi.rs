use crate::errors::ApiErrorCode;
use serde_json::{json, Map, Value};

const ERROR_REF: &str = "#/components/schemas/ApiError";

fn error_response(description: &str) -> Value {
    json!({"description": description, "content": {"application/json": {"schema": {"$ref": ERROR_REF}}}})
}

fn id_param() -> Value {
    json!({"name": "id", "in": "path", "required": true, "schema": {"type": "integer", "minimum": 1}})
}

fn page_params() -> Vec<Value> {
    vec![
        json!({"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 100}}),
        json!({"name": "offset", "in": "query", "schema": {"type": "integer", "minimum": 0}}),
    ]
}

fn admin() -> Value {
    json!([{"bearerAuth": []}, {"sessionCookie": []}])
}

/// Standard responses of an admin-only write.
fn admin_write(ok_status: &str, ok_description: &str) -> Value {
    json!({
        ok_status: {"description": ok_description},
        "400": error_response("validation failed"),
        "401": error_response("authentication required"),
        "404": error_response("not found"),
        "429": error_response("rate limited")
    })
}

fn crud_item_path(resource: &str) -> Value {
    json!({
        "get": {
            "parameters": [id_param()],
            "responses": {
                "200": {"description": format!("{resource} record")},
                "400": error_response("invalid id"),
                "404": error_response("not found")
            }
        },
        "put": {
            "security": admin(),
            "parameters": [id_param()],
            "requestBody": {"required": true, "content": {"application/json": {}}},
            "responses": admin_write("200", "updated")
        },
        "delete": {
            "security": admin(),
            "parameters": [id_param()],
            "responses": admin_write("204", "deleted")
        }
    })
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    let mut news_list_params = page_params();
    news_list_params.push(json!({"name": "category", "in": "query", "schema": {"type": "string"}}));
    news_list_params.push(json!({"name": "all", "in": "query", "schema": {"type": "boolean"}, "description": "include drafts (admin)"}));
    let mut contact_list_params = page_params();
    contact_list_params.push(json!({"name": "status", "in": "query", "schema": {"type": "string", "enum": ["new", "read", "archived"]}}));

    let mut paths = Map::new();
    paths.insert("/healthz".into(), json!({"get": {"responses": {"200": {"description": "ok"}}}}));
    paths.insert(
        "/readyz".into(),
        json!({"get": {"responses": {"200": {"description": "ready"}, "503": error_response("not ready")}}}),
    );
    paths.insert(
        "/metrics".into(),
        json!({"get": {"responses": {"200": {"description": "prometheus metrics"}}}}),
    );
    paths.insert(
        "/api/version".into(),
        json!({"get": {"responses": {"200": {"description": "build information"}}}}),
    );
    paths.insert(
        "/api/openapi.json".into(),
        json!({"get": {"responses": {"200": {"description": "this document"}}}}),
    );
    paths.insert(
        "/api/news".into(),
        json!({
            "get": {
                "parameters": news_list_params,
                "responses": {
                    "200": {"description": "news page"},
                    "304": {"description": "not modified"},
                    "400": error_response("invalid query")
                }
            },
            "post": {
                "security": admin(),
                "requestBody": {"required": true, "content": {"application/json": {}}},
                "responses": admin_write("201", "created")
            }
        }),
    );
    paths.insert("/api/news/{id}".into(), crud_item_path("news"));
    paths.insert(
        "/api/news/slug/{slug}".into(),
        json!({"get": {
            "parameters": [{"name": "slug", "in": "path", "required": true, "schema": {"type": "string"}}],
            "responses": {"200": {"description": "published article"}, "404": error_response("not found")}
        }}),
    );
    paths.insert(
        "/api/team".into(),
        json!({
            "get": {"responses": {"200": {"description": "active team members"}}},
            "post": {
                "security": admin(),
                "requestBody": {"required": true, "content": {"application/json": {}}},
                "responses": admin_write("201", "created")
            }
        }),
    );
    paths.insert("/api/team/{id}".into(), crud_item_path("team member"));
    paths.insert(
        "/api/contact".into(),
        json!({
            "get": {
                "security": admin(),
                "parameters": contact_list_params,
                "responses": {"200": {"description": "contact messages"}, "401": error_response("authentication required")}
            },
            "post": {
                "requestBody": {"required": true, "content": {"application/json": {}}},
                "responses": {
                    "201": {"description": "message received"},
                    "400": error_response("validation failed"),
                    "429": error_response("rate limited")
                }
            }
        }),
    );
    paths.insert(
        "/api/contact/{id}".into(),
        json!({
            "get": {"security": admin(), "parameters": [id_param()], "responses": admin_write("200", "contact message")},
            "put": {
                "security": admin(),
                "parameters": [id_param()],
                "requestBody": {"required": true, "content": {"application/json": {}}},
                "responses": admin_write("200", "status updated")
            },
            "delete": {"security": admin(), "parameters": [id_param()], "responses": admin_write("204", "deleted")}
        }),
    );
    paths.insert(
        "/api/newsletter".into(),
        json!({
            "get": {"security": admin(), "responses": {"200": {"description": "subscriptions"}, "401": error_response("authentication required")}},
            "post": {
                "requestBody": {"required": true, "content": {"application/json": {}}},
                "responses": {
                    "201": {"description": "subscribed"},
                    "200": {"description": "already subscribed or reactivated"},
                    "400": error_response("validation failed"),
                    "429": error_response("rate limited")
                }
            },
            "delete": {
                "parameters": [{"name": "email", "in": "query", "required": true, "schema": {"type": "string"}}],
                "responses": {"204": {"description": "unsubscribed"}, "400": error_response("invalid email")}
            }
        }),
    );
    paths.insert(
        "/api/newsletter/{id}".into(),
        json!({"delete": {"security": admin(), "parameters": [id_param()], "responses": admin_write("204", "deleted")}}),
    );
    paths.insert(
        "/api/images".into(),
        json!({
            "get": {"security": admin(), "responses": {"200": {"description": "stored images"}, "401": error_response("authentication required")}},
            "post": {
                "security": admin(),
                "parameters": [{"name": "storage", "in": "query", "schema": {"type": "string", "enum": ["db", "disk"]}}],
                "requestBody": {"required": true, "content": {
                    "image/jpeg": {}, "image/png": {}, "image/webp": {}, "image/gif": {}, "image/avif": {}
                }},
                "responses": {
                    "201": {"description": "stored"},
                    "400": error_response("empty body or invalid query"),
                    "401": error_response("authentication required"),
                    "413": error_response("payload too large"),
                    "415": error_response("unsupported media type")
                }
            }
        }),
    );
    paths.insert(
        "/api/images/{id}".into(),
        json!({
            "get": {
                "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "pattern": "^[a-f0-9]{32}$"}}],
                "responses": {
                    "200": {"description": "image bytes, cached for one year"},
                    "304": {"description": "not modified"},
                    "400": error_response("invalid id"),
                    "404": error_response("not found"),
                    "415": error_response("stored type not allowed")
                }
            },
            "delete": {
                "security": admin(),
                "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
                "responses": admin_write("204", "deleted")
            }
        }),
    );
    paths.insert(
        "/uploads/{name}".into(),
        json!({"get": {"responses": {
            "200": {"description": "uploaded file"},
            "304": {"description": "not modified"},
            "400": error_response("invalid name"),
            "404": error_response("not found")
        }}}),
    );
    paths.insert(
        "/api/admin/session".into(),
        json!({
            "post": {"responses": {"204": {"description": "session cookie set"}, "401": error_response("bad token")}},
            "delete": {"responses": {"204": {"description": "session cookie cleared"}}}
        }),
    );

    let codes: Vec<&str> = ApiErrorCode::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "openapi": "3.0.3",
        "info": {"title": "chambers API", "version": "v1"},
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer"},
                "sessionCookie": {"type": "apiKey", "in": "cookie", "name": "chambers_session"}
            },
            "schemas": {
                "ApiErrorCode": {"type": "string", "enum": codes},
                "ApiError": {
                    "type": "object",
                    "required": ["code", "message", "details", "request_id"],
                    "additionalProperties": false,
                    "properties": {
                        "code": {"$ref": "#/components/schemas/ApiErrorCode"},
                        "message": {"type": "string"},
                        "details": {"type": "object"},
                        "request_id": {"type": "string"}
                    }
                }
            }
        }
    })
}
