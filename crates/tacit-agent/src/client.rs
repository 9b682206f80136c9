//! HTTP client for the prediction, feedback and capture services
//!
//! All three endpoints take a JSON POST body. Only the prediction endpoint's
//! response body is read; feedback and capture responses are judged by status
//! alone.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tacit_core::{CaptureEvent, Context, Endpoints, FeedbackEvent, Result, Suggestion, TacitError};
use tokio::sync::Notify;
use tracing::{debug, instrument};

/// Success body of the prediction endpoint
#[derive(Debug, Clone, Deserialize)]
struct PredictResponse {
    predicted_action: String,
}

/// Trait for talking to the remote services (allows mocking in tests)
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Ask for the predicted action for a context
    async fn predict(&self, context: &Context) -> Result<Suggestion>;

    /// Report the user's verdict on a suggestion
    async fn feedback(&self, event: &FeedbackEvent) -> Result<()>;

    /// Report an action the user took directly in the page
    async fn capture(&self, event: &CaptureEvent) -> Result<()>;
}

/// Real service client over reqwest
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpServiceClient {
    /// Create a client for the given endpoints
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| TacitError::Service(format!("Failed to send request to {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TacitError::ServiceStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SuggestionService for HttpServiceClient {
    #[instrument(skip(self), fields(subject = %context.subject))]
    async fn predict(&self, context: &Context) -> Result<Suggestion> {
        let response = self.post(&self.endpoints.predict, context).await?;

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| TacitError::Service(format!("Failed to parse prediction: {}", e)))?;

        debug!("Prediction received: {}", body.predicted_action);
        Ok(Suggestion::new(body.predicted_action))
    }

    #[instrument(skip(self, event), fields(feedback = %event.feedback))]
    async fn feedback(&self, event: &FeedbackEvent) -> Result<()> {
        self.post(&self.endpoints.feedback, event).await?;
        Ok(())
    }

    #[instrument(skip(self, event), fields(decision = %event.user_decision))]
    async fn capture(&self, event: &CaptureEvent) -> Result<()> {
        self.post(&self.endpoints.capture, event).await?;
        Ok(())
    }
}

/// Mock service client for testing
///
/// Predictions are scripted per subject; an unscripted subject behaves like an
/// offline service. A subject can be gated so its response is held back until
/// the test releases it.
#[derive(Default)]
pub struct MockServiceClient {
    predictions: Mutex<HashMap<String, String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    fail_reports: bool,
    predict_calls: Mutex<Vec<Context>>,
    feedback_calls: Mutex<Vec<FeedbackEvent>>,
    capture_calls: Mutex<Vec<CaptureEvent>>,
}

impl MockServiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the predicted action for a subject
    pub fn with_prediction(self, subject: &str, action: &str) -> Self {
        self.predictions
            .lock()
            .unwrap()
            .insert(subject.to_string(), action.to_string());
        self
    }

    /// Make feedback and capture calls fail after being recorded
    pub fn with_failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    /// Hold back predictions for `subject` until the returned handle is notified
    pub fn gate(&self, subject: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(subject.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn predict_calls(&self) -> Vec<Context> {
        self.predict_calls.lock().unwrap().clone()
    }

    pub fn feedback_calls(&self) -> Vec<FeedbackEvent> {
        self.feedback_calls.lock().unwrap().clone()
    }

    pub fn capture_calls(&self) -> Vec<CaptureEvent> {
        self.capture_calls.lock().unwrap().clone()
    }

    /// Wait until at least `count` feedback reports were recorded
    pub async fn wait_for_feedback(&self, count: usize) -> Vec<FeedbackEvent> {
        for _ in 0..200 {
            let calls = self.feedback_calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.feedback_calls()
    }

    /// Wait until at least `count` capture reports were recorded
    pub async fn wait_for_captures(&self, count: usize) -> Vec<CaptureEvent> {
        for _ in 0..200 {
            let calls = self.capture_calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.capture_calls()
    }
}

#[async_trait]
impl SuggestionService for MockServiceClient {
    async fn predict(&self, context: &Context) -> Result<Suggestion> {
        self.predict_calls.lock().unwrap().push(context.clone());

        let gate = self.gates.lock().unwrap().get(&context.subject).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.predictions
            .lock()
            .unwrap()
            .get(&context.subject)
            .map(|action| Suggestion::new(action.as_str()))
            .ok_or_else(|| TacitError::Service("connection refused".to_string()))
    }

    async fn feedback(&self, event: &FeedbackEvent) -> Result<()> {
        self.feedback_calls.lock().unwrap().push(event.clone());
        if self.fail_reports {
            return Err(TacitError::ServiceStatus {
                endpoint: "mock://feedback".to_string(),
                status: 500,
            });
        }
        Ok(())
    }

    async fn capture(&self, event: &CaptureEvent) -> Result<()> {
        self.capture_calls.lock().unwrap().push(event.clone());
        if self.fail_reports {
            return Err(TacitError::ServiceStatus {
                endpoint: "mock://capture".to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tacit_core::{Binding, Decision, UserAction};

    type Received = Arc<Mutex<Vec<(String, Value)>>>;

    async fn record(received: &Received, route: &str, body: Value) {
        received.lock().unwrap().push((route.to_string(), body));
    }

    /// Serve a fake backend on an ephemeral port and return its base URL
    async fn spawn_backend(healthy: bool) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));

        let app = if healthy {
            Router::new()
                .route(
                    "/predict",
                    post(|State(r): State<Received>, Json(body): Json<Value>| async move {
                        record(&r, "predict", body).await;
                        Json(json!({ "predicted_action": "archive", "confidence": 0.9 }))
                    }),
                )
                .route(
                    "/feedback",
                    post(|State(r): State<Received>, Json(body): Json<Value>| async move {
                        record(&r, "feedback", body).await;
                        Json(json!({ "status": "ok" }))
                    }),
                )
                .route(
                    "/capture",
                    post(|State(r): State<Received>, Json(body): Json<Value>| async move {
                        record(&r, "capture", body).await;
                        StatusCode::OK
                    }),
                )
                .with_state(Arc::clone(&received))
        } else {
            Router::new()
                .route("/predict", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))
                .route("/feedback", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
                .with_state(Arc::clone(&received))
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), received)
    }

    #[tokio::test]
    async fn test_predict_sends_context_and_parses_action() {
        let (base, received) = spawn_backend(true).await;
        let client = HttpServiceClient::new(Endpoints::with_base(&base));

        let context = Context::new("Invoice #42", "billing@co.example");
        let suggestion = client.predict(&context).await.unwrap();

        assert_eq!(suggestion, Suggestion::new("archive"));
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "predict");
        assert_eq!(
            received[0].1,
            json!({ "subject": "Invoice #42", "sender": "billing@co.example" })
        );
    }

    #[tokio::test]
    async fn test_feedback_and_capture_bodies() {
        let (base, received) = spawn_backend(true).await;
        let client = HttpServiceClient::new(Endpoints::with_base(&base));

        let binding = Binding::new(
            Context::new("Invoice #42", "billing@co.example"),
            Suggestion::new("archive"),
        );
        client
            .feedback(&FeedbackEvent::from_binding(&binding, Decision::Rejected))
            .await
            .unwrap();

        let capture =
            CaptureEvent::new(&binding.context, UserAction::ReportSpam, chrono::Utc::now());
        client.capture(&capture).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(
            received[0].1,
            json!({
                "subject": "Invoice #42",
                "sender": "billing@co.example",
                "suggestion": "archive",
                "feedback": "rejected",
            })
        );
        assert_eq!(received[1].0, "capture");
        assert_eq!(received[1].1["user_decision"], "report_spam");
        assert_eq!(received[1].1["subject"], "Invoice #42");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (base, _received) = spawn_backend(false).await;
        let client = HttpServiceClient::new(Endpoints::with_base(&base));

        let err = client
            .predict(&Context::new("Hello", "a@b.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, TacitError::ServiceStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpServiceClient::new(Endpoints::with_base(&format!("http://{}", addr)));
        let err = client
            .predict(&Context::new("Hello", "a@b.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, TacitError::Service(_)));
    }

    #[tokio::test]
    async fn test_mock_client_scripting() {
        let mock = MockServiceClient::new().with_prediction("Hello", "delete");

        let hit = mock.predict(&Context::new("Hello", "a@b.example")).await;
        let miss = mock.predict(&Context::new("Other", "a@b.example")).await;

        assert_eq!(hit.unwrap(), Suggestion::new("delete"));
        assert!(miss.is_err());
        assert_eq!(mock.predict_calls().len(), 2);
    }
}
