//! Conversion of handler return values into HTTP responses.
//!
//! Every value a handler may return maps onto one [`Reply`] category. Text
//! and numbers become an HTML body, serializable data becomes JSON, and
//! errors become a [`Failure`](Reply::Failure) that is never written as a
//! body.

use crate::error::{BoxError, HandlerError};
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// The closed set of things a handler result can mean.
#[derive(Debug)]
pub enum Reply {
    /// Nothing to write.
    Empty,
    Text(String),
    Integer(i128),
    Float(f64),
    /// Already serialized structured data.
    Structured(serde_json::Value),
    /// The request failed; nothing is written by the encoder.
    Failure(BoxError),
}

impl Reply {
    /// Serialize `value` as structured data.
    pub fn structured<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Reply::Structured(value),
            Err(e) => Reply::Failure(Box::new(e)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure(_))
    }

    /// Write the reply as a response.
    ///
    /// A [`Reply::Failure`] is handed back untouched so the caller can
    /// escalate it instead of writing a body.
    pub fn encode(self) -> Result<Response, BoxError> {
        match self {
            Reply::Empty => Ok(StatusCode::OK.into_response()),
            Reply::Text(text) => Ok(Html(text).into_response()),
            Reply::Integer(n) => Ok(Html(n.to_string()).into_response()),
            Reply::Float(f) => Ok(Html(format_float(f)).into_response()),
            Reply::Structured(value) => Ok(Json(value).into_response()),
            Reply::Failure(err) => Err(err),
        }
    }
}

/// Six fixed decimals, with `+Inf`, `-Inf` and `NaN` for non-finite values.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "+" } else { "-" };
        format!("{}Inf", sign)
    } else {
        format!("{:.6}", f)
    }
}

/// Values a handler may return.
pub trait IntoReply: Send + 'static {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::Empty
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::Text(self)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::Text(self.to_owned())
    }
}

impl IntoReply for Cow<'static, str> {
    fn into_reply(self) -> Reply {
        Reply::Text(self.into_owned())
    }
}

macro_rules! impl_integer_reply {
    ($($ty:ty),*) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Reply {
                    Reply::Integer(self as i128)
                }
            }
        )*
    };
}

impl_integer_reply!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

/// Values above `i128::MAX` are written as text; the body is the same
/// decimal either way.
impl IntoReply for u128 {
    fn into_reply(self) -> Reply {
        match i128::try_from(self) {
            Ok(n) => Reply::Integer(n),
            Err(_) => Reply::Text(self.to_string()),
        }
    }
}

impl IntoReply for f32 {
    fn into_reply(self) -> Reply {
        Reply::Float(f64::from(self))
    }
}

impl IntoReply for f64 {
    fn into_reply(self) -> Reply {
        Reply::Float(self)
    }
}

impl IntoReply for bool {
    fn into_reply(self) -> Reply {
        Reply::Structured(serde_json::Value::Bool(self))
    }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Reply {
        Reply::Structured(self)
    }
}

impl<T: Serialize + Send + 'static> IntoReply for Json<T> {
    fn into_reply(self) -> Reply {
        Reply::structured(&self.0)
    }
}

impl<T: Serialize + Send + 'static> IntoReply for Vec<T> {
    fn into_reply(self) -> Reply {
        Reply::structured(&self)
    }
}

impl<K, V, H> IntoReply for HashMap<K, V, H>
where
    K: Serialize + Eq + Hash + Send + 'static,
    V: Serialize + Send + 'static,
    H: std::hash::BuildHasher + Send + 'static,
{
    fn into_reply(self) -> Reply {
        Reply::structured(&self)
    }
}

impl<K, V> IntoReply for BTreeMap<K, V>
where
    K: Serialize + Ord + Send + 'static,
    V: Serialize + Send + 'static,
{
    fn into_reply(self) -> Reply {
        Reply::structured(&self)
    }
}

impl IntoReply for HandlerError {
    fn into_reply(self) -> Reply {
        Reply::Failure(Box::new(self))
    }
}

/// `None` writes nothing.
impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        match self {
            Some(value) => value.into_reply(),
            None => Reply::Empty,
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError> + Send + 'static,
{
    fn into_reply(self) -> Reply {
        match self {
            Ok(value) => value.into_reply(),
            Err(err) => Reply::Failure(err.into()),
        }
    }
}

/// A value paired with an error slot. A present error fails the request
/// whatever the value is.
impl<T, E> IntoReply for (T, Option<E>)
where
    T: IntoReply,
    E: Into<BoxError> + Send + 'static,
{
    fn into_reply(self) -> Reply {
        match self {
            (_, Some(err)) => Reply::Failure(err.into()),
            (value, None) => value.into_reply(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::CONTENT_TYPE;
    use serde_json::json;

    async fn body_of(reply: Reply) -> (Option<String>, String) {
        let response = reply.encode().unwrap();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: &'static str,
    }

    #[tokio::test]
    async fn test_text_is_written_verbatim() {
        let (content_type, body) = body_of("<b>hi</b>".into_reply()).await;
        assert_eq!(body, "<b>hi</b>");
        assert!(content_type.unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_integers_are_decimal() {
        assert_eq!(body_of((-42i8).into_reply()).await.1, "-42");
        assert_eq!(body_of(u64::MAX.into_reply()).await.1, "18446744073709551615");
        assert_eq!(body_of(7usize.into_reply()).await.1, "7");
        assert_eq!(body_of(5u128.into_reply()).await.1, "5");
        assert_eq!(
            body_of(u128::MAX.into_reply()).await.1,
            "340282366920938463463374607431768211455"
        );
    }

    #[tokio::test]
    async fn test_floats_use_fixed_format() {
        assert_eq!(body_of(1.5f64.into_reply()).await.1, "1.500000");
        assert_eq!(body_of(0.25f32.into_reply()).await.1, "0.250000");
        assert_eq!(body_of(f64::INFINITY.into_reply()).await.1, "+Inf");
        assert_eq!(body_of(f64::NEG_INFINITY.into_reply()).await.1, "-Inf");
        assert_eq!(body_of(f32::NAN.into_reply()).await.1, "NaN");
    }

    #[tokio::test]
    async fn test_structured_values_are_json() {
        let (content_type, body) = body_of(Json(User { id: 7, name: "ada" }).into_reply()).await;
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, json!({"id": 7, "name": "ada"}));

        let (_, body) = body_of(vec![1, 2, 3].into_reply()).await;
        assert_eq!(body, "[1,2,3]");
    }

    #[tokio::test]
    async fn test_empty_writes_no_body() {
        let (content_type, body) = body_of(().into_reply()).await;
        assert!(content_type.is_none());
        assert!(body.is_empty());

        let none: Option<String> = None;
        assert!(matches!(none.into_reply(), Reply::Empty));
    }

    #[test]
    fn test_error_slot_wins_over_value() {
        let reply = (0i32, Some(HandlerError::new("boom"))).into_reply();
        assert!(reply.is_failure());

        let reply = (Json(User { id: 1, name: "x" }), Some(HandlerError::new("boom"))).into_reply();
        assert!(reply.is_failure());

        let ok: (i32, Option<HandlerError>) = (3, None);
        assert!(matches!(ok.into_reply(), Reply::Integer(3)));
    }

    #[test]
    fn test_result_error_is_failure() {
        let failed: Result<i32, HandlerError> = Err(HandlerError::new("boom"));
        match failed.into_reply() {
            Reply::Failure(err) => assert_eq!(err.to_string(), "boom"),
            other => panic!("expected failure, got {:?}", other),
        }

        let sole: Result<(), HandlerError> = Ok(());
        assert!(matches!(sole.into_reply(), Reply::Empty));
        assert!(HandlerError::new("x").into_reply().is_failure());
    }
}
