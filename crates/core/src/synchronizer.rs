use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    config::SyncConfig,
    error::{CompletionError, SyncError, SyncFailure},
    provider::ProviderError,
    types::{Segment, SyncResult},
};

const SCHEMA_NAME: &str = "subtitle_segments";

/// Prompt plus the JSON schema the response must conform to.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub schema_name: &'static str,
    pub schema: Value,
}

/// Remote text-generation endpoint returning raw JSON text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Turns a transcript and a target duration into timed segments.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    async fn synchronize(&self, transcript: &str, duration: f64)
    -> Result<Vec<Segment>, SyncError>;
}

/// OpenAI-compatible `/chat/completions` client with structured output.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(api_url: String, model: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            model,
            api_key,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, ProviderError> {
        let api_key = config.provider.validate_api_key()?;
        Ok(Self::new(
            config.api_url().to_string(),
            config.model().to_string(),
            api_key,
        ))
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt,
                },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                },
            },
            "temperature": 0.3,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        tracing::debug!(url = %self.api_url, model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<Value>().await?;
        extract_content(response)
    }
}

fn extract_content(response: Value) -> Result<String, CompletionError> {
    match response["choices"][0]["message"]["content"].as_str() {
        Some(content) => Ok(content.to_string()),
        None => Err(CompletionError::InvalidApiResponse(response)),
    }
}

/// Schema for `{ segments: [{ startTime, endTime, text }] }`, all fields required.
pub fn segment_schema() -> Value {
    json!({
        "type": "object",
        "required": ["segments"],
        "additionalProperties": false,
        "properties": {
            "segments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["startTime", "endTime", "text"],
                    "additionalProperties": false,
                    "properties": {
                        "startTime": { "type": "number", "description": "Start time in seconds" },
                        "endTime": { "type": "number", "description": "End time in seconds" },
                        "text": { "type": "string", "description": "The subtitle text" },
                    },
                },
            },
        },
    })
}

pub fn build_prompt(transcript: &str, duration: f64) -> String {
    format!(
        r#"I have a video that is exactly {duration} seconds long.
I have a transcript of this video.
Your task is to break this transcript into logical, readable subtitle segments.
Each segment should be roughly 3-7 words long or one short sentence.
You must assign start and end timestamps (in seconds) to each segment, ensuring they are evenly distributed across the total duration of {duration} seconds.
The segments should not overlap. The first segment should start at 0 and the last segment should end at {duration}.

Transcript:
"{transcript}""#
    )
}

/// Parse the model's JSON text and assign ids by array position.
pub fn parse_segments(text: &str) -> Result<Vec<Segment>, serde_json::Error> {
    let result: SyncResult = serde_json::from_str(text)?;
    Ok(result
        .segments
        .into_iter()
        .enumerate()
        .map(|(index, draft)| draft.into_segment(index))
        .collect())
}

/// Bring model output in line with the segment invariants.
///
/// Drops blank or non-finite segments, clamps times into `[0, duration]`,
/// orders by start time, pushes each start up to the previous end and drops
/// whatever is left with an empty range. The first survivor is stretched
/// back to 0 and the last one out to `duration`. Ids are left untouched.
pub fn repair_segments(segments: Vec<Segment>, duration: f64) -> Vec<Segment> {
    let returned = segments.len();

    let mut candidates: Vec<Segment> = segments
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .filter(|s| s.start_time.is_finite() && s.end_time.is_finite())
        .map(|mut s| {
            s.start_time = s.start_time.clamp(0.0, duration);
            s.end_time = s.end_time.clamp(0.0, duration);
            s
        })
        .collect();
    candidates.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut repaired: Vec<Segment> = Vec::with_capacity(candidates.len());
    let mut prev_end = 0.0_f64;
    let mut adjusted = 0usize;
    for mut segment in candidates {
        if segment.start_time < prev_end {
            segment.start_time = prev_end;
            adjusted += 1;
        }
        if segment.end_time <= segment.start_time {
            continue;
        }
        prev_end = segment.end_time;
        repaired.push(segment);
    }

    // The sequence must cover the whole video.
    if let Some(first) = repaired.first_mut() {
        if first.start_time > 0.0 {
            first.start_time = 0.0;
            adjusted += 1;
        }
    }
    if let Some(last) = repaired.last_mut() {
        if last.end_time < duration {
            last.end_time = duration;
            adjusted += 1;
        }
    }

    if repaired.len() != returned || adjusted > 0 {
        tracing::warn!(
            returned,
            kept = repaired.len(),
            adjusted,
            "model output violated segment invariants; repaired"
        );
    }

    repaired
}

/// Synchronizer backed by a completion endpoint.
pub struct TranscriptSynchronizer<C> {
    client: C,
    timeout: Duration,
}

impl<C: CompletionClient> TranscriptSynchronizer<C> {
    pub fn new(client: C, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn run(&self, transcript: &str, duration: f64) -> Result<Vec<Segment>, SyncFailure> {
        let request = CompletionRequest {
            prompt: build_prompt(transcript, duration),
            schema_name: SCHEMA_NAME,
            schema: segment_schema(),
        };

        let text = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))??;

        let segments = parse_segments(&text)?;
        let returned = segments.len();
        let segments = repair_segments(segments, duration);
        if segments.is_empty() {
            return Err(SyncFailure::NoUsableSegments { returned });
        }

        Ok(segments)
    }
}

impl TranscriptSynchronizer<HttpCompletionClient> {
    pub fn from_config(config: &SyncConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(
            HttpCompletionClient::from_config(config)?,
            config.timeout,
        ))
    }
}

#[async_trait]
impl<C: CompletionClient> Synchronizer for TranscriptSynchronizer<C> {
    async fn synchronize(
        &self,
        transcript: &str,
        duration: f64,
    ) -> Result<Vec<Segment>, SyncError> {
        match self.run(transcript, duration).await {
            Ok(segments) => {
                tracing::info!(count = segments.len(), duration, "transcript synchronized");
                Ok(segments)
            }
            Err(cause) => {
                tracing::error!(error = %cause, "AI processing error");
                Err(cause.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::SYNC_FAILED_MESSAGE;

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct StubClient {
        reply: Reply,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubClient {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(CompletionError::Status {
                    status: 503,
                    body: "overloaded".into(),
                }),
                Reply::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn seg(id: &str, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            id: id.into(),
            start_time: start,
            end_time: end,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn stubbed_provider_round_trip() {
        let client = StubClient::new(Reply::Text(
            r#"{"segments":[{"startTime":0,"endTime":5,"text":"Hello world."},{"startTime":5,"endTime":10,"text":"This is a test."}]}"#,
        ));
        let sync = TranscriptSynchronizer::new(client, Duration::from_secs(5));

        let segments = sync
            .synchronize("Hello world. This is a test.", 10.0)
            .await
            .unwrap();

        assert_eq!(
            segments,
            vec![
                seg("seg-0", 0.0, 5.0, "Hello world."),
                seg("seg-1", 5.0, 10.0, "This is a test."),
            ]
        );

        let seen = sync.client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].prompt.contains("exactly 10 seconds long"));
        assert!(seen[0].prompt.contains("\"Hello world. This is a test.\""));
        assert_eq!(seen[0].schema_name, SCHEMA_NAME);
    }

    #[tokio::test]
    async fn malformed_json_is_a_uniform_failure() {
        let sync = TranscriptSynchronizer::new(
            StubClient::new(Reply::Text("Sure! Here are your segments:")),
            Duration::from_secs(5),
        );
        let err = sync.synchronize("hi", 3.0).await.unwrap_err();
        assert_eq!(err.to_string(), SYNC_FAILED_MESSAGE);
        assert!(matches!(err.cause, SyncFailure::Json(_)));
    }

    #[tokio::test]
    async fn schema_mismatch_is_rejected() {
        let sync = TranscriptSynchronizer::new(
            StubClient::new(Reply::Text(r#"{"segments":[{"start":0,"end":1,"text":"x"}]}"#)),
            Duration::from_secs(5),
        );
        let err = sync.synchronize("x", 1.0).await.unwrap_err();
        assert!(matches!(err.cause, SyncFailure::Json(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_a_uniform_failure() {
        let sync =
            TranscriptSynchronizer::new(StubClient::new(Reply::Fail), Duration::from_secs(5));
        let err = sync.synchronize("hi", 3.0).await.unwrap_err();
        assert_eq!(err.to_string(), SYNC_FAILED_MESSAGE);
        assert!(matches!(
            err.cause,
            SyncFailure::Completion(CompletionError::Status { status: 503, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_endpoint_times_out() {
        let sync =
            TranscriptSynchronizer::new(StubClient::new(Reply::Hang), Duration::from_secs(30));
        let err = sync.synchronize("hi", 3.0).await.unwrap_err();
        assert!(matches!(
            err.cause,
            SyncFailure::Completion(CompletionError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn empty_result_is_a_failure() {
        let sync = TranscriptSynchronizer::new(
            StubClient::new(Reply::Text(r#"{"segments":[]}"#)),
            Duration::from_secs(5),
        );
        let err = sync.synchronize("hi", 3.0).await.unwrap_err();
        assert!(matches!(
            err.cause,
            SyncFailure::NoUsableSegments { returned: 0 }
        ));
    }

    #[test]
    fn repair_sorts_clamps_and_resolves_overlap() {
        let input = vec![
            seg("seg-0", 4.0, 12.0, "late"),
            seg("seg-1", -1.0, 2.5, "early"),
            seg("seg-2", 2.0, 4.5, "middle"),
        ];

        let out = repair_segments(input, 10.0);

        assert_eq!(
            out,
            vec![
                seg("seg-1", 0.0, 2.5, "early"),
                seg("seg-2", 2.5, 4.5, "middle"),
                seg("seg-0", 4.5, 10.0, "late"),
            ]
        );
    }

    #[test]
    fn repair_drops_blank_swallowed_and_inverted_segments() {
        let input = vec![
            seg("seg-0", 0.0, 5.0, "whole"),
            seg("seg-1", 1.0, 4.0, "inside"),
            seg("seg-2", 5.0, 6.0, "   "),
            seg("seg-3", 7.0, 6.0, "inverted"),
            seg("seg-4", f64::NAN, 8.0, "nan"),
            seg("seg-5", 6.0, 8.0, "tail"),
        ];

        let out = repair_segments(input, 8.0);
        let ids: Vec<_> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["seg-0", "seg-5"]);
    }

    #[test]
    fn repair_extends_to_full_coverage() {
        let input = vec![seg("seg-0", 2.0, 5.0, "a"), seg("seg-1", 5.0, 8.0, "b")];

        let out = repair_segments(input, 10.0);

        assert_eq!(
            out,
            vec![seg("seg-0", 0.0, 5.0, "a"), seg("seg-1", 5.0, 10.0, "b")]
        );
    }

    #[test]
    fn well_formed_output_passes_through_untouched() {
        let input = vec![seg("seg-0", 0.0, 2.0, "a"), seg("seg-1", 2.0, 4.0, "b")];
        assert_eq!(repair_segments(input.clone(), 4.0), input);
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = segment_schema();
        assert_eq!(schema["required"], json!(["segments"]));
        assert_eq!(
            schema["properties"]["segments"]["items"]["required"],
            json!(["startTime", "endTime", "text"])
        );
    }

    #[test]
    fn request_body_asks_for_structured_output() {
        let client = HttpCompletionClient::new(
            "http://localhost/v1/chat/completions".into(),
            "test-model".into(),
            "key".into(),
        );
        let request = CompletionRequest {
            prompt: build_prompt("hello", 4.0),
            schema_name: SCHEMA_NAME,
            schema: segment_schema(),
        };

        let body = client.request_body(&request);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], SCHEMA_NAME);
        assert_eq!(body["messages"][0]["content"], request.prompt);
    }

    #[test]
    fn content_is_read_from_the_first_choice() {
        let ok = json!({"choices": [{"message": {"content": "{\"segments\":[]}"}}]});
        assert_eq!(extract_content(ok).unwrap(), "{\"segments\":[]}");

        let bad = json!({"error": {"message": "nope"}});
        assert!(matches!(
            extract_content(bad),
            Err(CompletionError::InvalidApiResponse(_))
        ));
    }
}
