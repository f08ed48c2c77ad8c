use chambers_api::{
    map_error, openapi_v1_spec, status_for, ApiError, ApiErrorCode, API_ERROR_SCHEMA_REF,
};
use chambers_model::ValidationErrors;

#[test]
fn every_code_has_a_documented_status() {
    let expected = [
        (ApiErrorCode::InvalidQueryParameter, 400),
        (ApiErrorCode::ValidationFailed, 400),
        (ApiErrorCode::NotFound, 404),
        (ApiErrorCode::Conflict, 409),
        (ApiErrorCode::Unauthorized, 401),
        (ApiErrorCode::RateLimited, 429),
        (ApiErrorCode::PayloadTooLarge, 413),
        (ApiErrorCode::UnsupportedMediaType, 415),
        (ApiErrorCode::NotReady, 503),
        (ApiErrorCode::Internal, 500),
    ];
    assert_eq!(expected.len(), ApiErrorCode::ALL.len());
    for (code, status) in expected {
        assert_eq!(status_for(code), status, "{code:?}");
    }
    let mapping = map_error(&ApiError::unauthorized());
    assert_eq!(mapping.status_code, 401);
    assert_eq!(mapping.schema_ref, API_ERROR_SCHEMA_REF);
}

#[test]
fn error_wire_shape_is_stable() {
    let err = ApiError::not_found("news", "9").with_request_id("req-0000000000000001");
    let value = serde_json::to_value(&err).expect("encode");
    assert_eq!(value["code"], "NotFound");
    assert_eq!(value["message"], "news not found");
    assert_eq!(value["details"]["id"], "9");
    assert_eq!(value["request_id"], "req-0000000000000001");
    let back: ApiError = serde_json::from_value(value).expect("decode");
    assert_eq!(back, err);
}

#[test]
fn validation_errors_become_field_errors() {
    let errors = ValidationErrors::single("email", "must be a valid email address");
    let err = ApiError::from(errors);
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
    assert_eq!(err.details["field_errors"][0]["field"], "email");
}

#[test]
fn openapi_lists_every_error_code_and_route() {
    let spec = openapi_v1_spec();
    let codes = spec["components"]["schemas"]["ApiErrorCode"]["enum"]
        .as_array()
        .expect("enum");
    assert_eq!(codes.len(), ApiErrorCode::ALL.len());
    for path in [
        "/api/news",
        "/api/news/{id}",
        "/api/news/slug/{slug}",
        "/api/team",
        "/api/team/{id}",
        "/api/contact",
        "/api/contact/{id}",
        "/api/newsletter",
        "/api/newsletter/{id}",
        "/api/images",
        "/api/images/{id}",
        "/uploads/{name}",
        "/api/admin/session",
        "/healthz",
        "/readyz",
        "/metrics",
    ] {
        assert!(spec["paths"].get(path).is_some(), "missing {path}");
    }
    assert!(spec["paths"]["/api/images/{id}"]["get"]["responses"]
        .get("415")
        .is_some());
}
