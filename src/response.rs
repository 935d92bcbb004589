//! Outcome to HTTP response. Success bodies are the bare serialized entity or collection.

use crate::service::{Action, Outcome, Payload};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Status and body for a dispatched outcome.
///
/// A plural read that matches nothing answers 404 but still carries `[]`,
/// unlike a singular miss which has no body.
pub fn respond(action: Action, outcome: Outcome) -> Response {
    match outcome {
        Outcome::Found(Payload::One(entity)) => (StatusCode::OK, Json(entity)).into_response(),
        Outcome::Found(Payload::Many(rows)) if rows.is_empty() && action == Action::Read => {
            (StatusCode::NOT_FOUND, Json(rows)).into_response()
        }
        Outcome::Found(Payload::Many(rows)) => (StatusCode::OK, Json(rows)).into_response(),
        Outcome::Created(Payload::One(entity)) => (StatusCode::CREATED, Json(entity)).into_response(),
        Outcome::Created(Payload::Many(rows)) => (StatusCode::CREATED, Json(rows)).into_response(),
        Outcome::NotFound => StatusCode::NOT_FOUND.into_response(),
        Outcome::Deleted => StatusCode::OK.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn parts(resp: Response) -> (StatusCode, Vec<u8>) {
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn singular_miss_has_no_body() {
        let (status, body) = parts(respond(Action::Read, Outcome::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn empty_collection_read_is_404_with_empty_array() {
        let (status, body) = parts(respond(Action::Read, Outcome::Found(Payload::Many(vec![])))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn empty_collection_update_is_ok() {
        let (status, _) = parts(respond(Action::CreateOrUpdate, Outcome::Found(Payload::Many(vec![])))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn created_and_deleted() {
        let (status, body) = parts(respond(Action::CreateOrUpdate, Outcome::Created(Payload::One(json!({"id": 1}))))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), json!({"id": 1}));

        let (status, body) = parts(respond(Action::Delete, Outcome::Deleted)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }
}
