use serde_json::{Map, Value};
use crate::core::errors::ApiError;

const VECTOR_BACKENDS: [&str; 2] = ["pinecone", "memory"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 1, 65_536)?;
        validate_u64_field(
            embedding,
            "embedding.timeout_secs",
            "timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_optional_string_field(generation, "generation.base_url", "base_url")?;
        validate_optional_string_field(generation, "generation.model", "model")?;
        validate_optional_string_field(generation, "generation.api_key", "api_key")?;
        validate_f64_field(
            generation,
            "generation.temperature",
            "temperature",
            0.0,
            2.0,
        )?;
        validate_u64_field(
            generation,
            "generation.max_tokens",
            "max_tokens",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            generation,
            "generation.timeout_secs",
            "timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_enum_field(store, "vector_store.backend", "backend", &VECTOR_BACKENDS)?;
        validate_optional_string_field(store, "vector_store.index_host", "index_host")?;
        validate_optional_string_field(store, "vector_store.api_key", "api_key")?;
        validate_optional_string_field(
            store,
            "vector_store.default_namespace",
            "default_namespace",
        )?;
        validate_u64_field(
            store,
            "vector_store.timeout_secs",
            "timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(pipeline) = expect_optional_object(root, "pipeline")? {
        validate_u64_field(pipeline, "pipeline.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            pipeline,
            "pipeline.max_embedding_concurrency",
            "max_embedding_concurrency",
            1,
            256,
        )?;
        validate_bool_field(
            pipeline,
            "pipeline.batch_scoring_embeddings",
            "batch_scoring_embeddings",
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if allowed.contains(&text) {
        return Ok(());
    }
    Err(ApiError::BadRequest(format!(
        "Invalid config at '{}': expected one of {}",
        path,
        allowed.join(", ")
    )))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
