//! Request body parsing stages.
//!
//! # Responsibilities
//! - Buffer JSON and URL-encoded bodies up to the configured size
//! - Reject malformed JSON before it reaches any route
//! - Decode URL-encoded forms with bracket nesting (`a[b]=1`, `a[]=1`)
//! - Attach the decoded value to the request as [`ParsedBody`]
//!
//! Bodies of other content types pass through untouched.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::observability::metrics;

/// Maximum bracket nesting honoured in form keys; deeper segments stay literal.
const MAX_FORM_DEPTH: usize = 5;

/// Largest bracket index that still builds an array; above it keys stay keys.
const MAX_FORM_INDEX: usize = 20;

/// Decoded request body, available to handlers as a request extension.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(Value),
}

#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(request: &Request) -> Option<BodyKind> {
    let content_type = request.headers().get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
    {
        Some(BodyKind::Json)
    } else if essence == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else {
        None
    }
}

/// JSON body stage.
pub async fn parse_json(
    State(limits): State<BodyLimits>,
    request: Request,
    next: Next,
) -> Response {
    if body_kind(&request) != Some(BodyKind::Json) {
        return next.run(request).await;
    }
    match decode(request, limits, |bytes| decode_json(bytes).map(ParsedBody::Json)).await {
        Ok(request) => next.run(request).await,
        Err(error) => reject(error),
    }
}

/// URL-encoded body stage.
pub async fn parse_urlencoded(
    State(limits): State<BodyLimits>,
    request: Request,
    next: Next,
) -> Response {
    if body_kind(&request) != Some(BodyKind::Form) {
        return next.run(request).await;
    }
    match decode(request, limits, |bytes| Ok(ParsedBody::Form(decode_form(bytes)))).await {
        Ok(request) => next.run(request).await,
        Err(error) => reject(error),
    }
}

fn reject(error: ApiError) -> Response {
    tracing::debug!(error = %error, "Request body rejected");
    metrics::record_rejection(&error);
    error.into_response()
}

async fn decode<F>(request: Request, limits: BodyLimits, parse: F) -> Result<Request, ApiError>
where
    F: FnOnce(&[u8]) -> Result<ParsedBody, ApiError>,
{
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limits.max_bytes) {
        return Err(ApiError::PayloadTooLarge {
            limit: limits.max_bytes,
        });
    }

    let (mut parts, body) = request.into_parts();
    let bytes = read_limited(body, limits.max_bytes).await?;
    let parsed = parse(&bytes)?;

    parts.extensions.insert(parsed);
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

async fn read_limited(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ApiError::BadRequestBody(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

/// Parse a JSON body. Only objects and arrays are accepted at the top level;
/// an empty body decodes to `{}`.
pub fn decode_json(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ApiError::BadRequestBody(e.to_string()))?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(ApiError::BadRequestBody(
            "top-level JSON value must be an object or array".into(),
        )),
    }
}

/// Decode an `application/x-www-form-urlencoded` body with bracket nesting.
///
/// `a[b]=1` nests, `a[]=1&a[]=2` and repeated keys collect into arrays.
/// Objects keyed only by small indices (`a[0]=x&a[1]=y`) become arrays.
pub fn decode_form(bytes: &[u8]) -> Value {
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        if key.is_empty() {
            continue;
        }
        let path = split_key(&key);
        insert(&mut root, &path, Value::String(value.into_owned()));
    }
    for value in root.values_mut() {
        compact_indices(value);
    }
    Value::Object(root)
}

fn split_key(key: &str) -> Vec<String> {
    let open = match key.find('[') {
        Some(i) if i > 0 => i,
        _ => return vec![key.to_string()],
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while segments.len() <= MAX_FORM_DEPTH {
        let Some(inner) = rest.strip_prefix('[') else { break };
        let Some(close) = inner.find(']') else { break };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(rest.to_string());
    }
    segments
}

fn insert(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else { return };

    match rest.first() {
        None => match map.get_mut(head) {
            None => {
                map.insert(head.clone(), value);
            }
            Some(existing) => append(existing, value),
        },
        Some(next) if next.is_empty() => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if rest.len() == 1 {
                append(slot, value);
            } else {
                let mut nested = Map::new();
                insert(&mut nested, &rest[1..], value);
                append(slot, Value::Object(nested));
            }
        }
        Some(_) => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = slot {
                insert(nested, rest, value);
            } else {
                let mut nested = Map::new();
                insert(&mut nested, rest, value);
                append(slot, Value::Object(nested));
            }
        }
    }
}

/// Turn objects whose keys are all indices up to `MAX_FORM_INDEX` into
/// arrays ordered by index. Gaps are dropped.
fn compact_indices(value: &mut Value) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(compact_indices),
        Value::Object(map) => {
            map.values_mut().for_each(compact_indices);

            let mut indexed = Vec::with_capacity(map.len());
            for key in map.keys() {
                match key.parse::<usize>() {
                    Ok(i) if i <= MAX_FORM_INDEX && i.to_string() == *key => indexed.push(i),
                    _ => return,
                }
            }
            if indexed.is_empty() {
                return;
            }
            indexed.sort_unstable();

            let mut map = std::mem::take(map);
            let items = indexed
                .into_iter()
                .filter_map(|i| map.remove(&i.to_string()))
                .collect();
            *value = Value::Array(items);
        }
        _ => {}
    }
}

fn append(slot: &mut Value, value: Value) {
    match slot {
        Value::Array(items) => items.push(value),
        other => {
            let previous = other.take();
            *other = Value::Array(vec![previous, value]);
        }
    }
}
