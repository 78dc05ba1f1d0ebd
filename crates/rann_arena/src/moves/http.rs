//! # HTTP Advisory
//!
//! Posts the round state to an external move-advisory service and reads back
//! one move per combatant.

use std::time::Duration;

use async_trait::async_trait;
use rann_shared::{Move, MoveDecision};
use serde::{Deserialize, Serialize};

use super::{AdvisoryError, AdvisoryInput, MoveAdvisor};

/// Move names offered to the advisory.
const MOVESET: [&str; 5] = ["strike", "taunt", "dodge", "recover", "special_move"];

/// Per-request ceiling. The selector's shared budget is usually tighter.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct CombatantState {
    total_damage_received: u64,
}

#[derive(Serialize)]
struct Metadata<'a> {
    api_key: &'a str,
}

#[derive(Serialize)]
struct AdvisoryRequest<'a> {
    current_round: u8,
    agent_1: CombatantState,
    agent_2: CombatantState,
    moveset: [&'static str; 5],
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata<'a>>,
}

#[derive(Deserialize)]
struct AdvisoryResponse {
    agent_1: String,
    agent_2: String,
}

/// Advisory service reached over HTTP.
pub struct HttpAdvisor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAdvisor {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisoryError::Client`] if the HTTP client cannot be built.
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, AdvisoryError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AdvisoryError::Client(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

fn parse_move(raw: &str) -> Result<Move, AdvisoryError> {
    raw.trim()
        .parse()
        .map_err(|err: rann_shared::UnknownMove| AdvisoryError::Malformed(err.to_string()))
}

#[async_trait]
impl MoveAdvisor for HttpAdvisor {
    fn name(&self) -> &str {
        "http"
    }

    async fn attempt(&self, input: &AdvisoryInput) -> Result<MoveDecision, AdvisoryError> {
        let request = AdvisoryRequest {
            current_round: input.round,
            agent_1: CombatantState {
                total_damage_received: input.damage.first,
            },
            agent_2: CombatantState {
                total_damage_received: input.damage.second,
            },
            moveset: MOVESET,
            metadata: self.api_key.as_deref().map(|api_key| Metadata { api_key }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| AdvisoryError::Unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisoryError::Status(status.as_u16()));
        }

        let body: AdvisoryResponse = response
            .json()
            .await
            .map_err(|err| AdvisoryError::Malformed(err.to_string()))?;

        Ok(MoveDecision::new(
            parse_move(&body.agent_1)?,
            parse_move(&body.agent_2)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rann_blockchain::DamageReport;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input() -> AdvisoryInput {
        AdvisoryInput {
            round: 3,
            damage: DamageReport {
                first: 70,
                second: 15,
            },
        }
    }

    fn advisor(server: &MockServer, api_key: Option<&str>) -> HttpAdvisor {
        HttpAdvisor::new(format!("{}/advise", server.uri()), api_key.map(str::to_owned)).unwrap()
    }

    #[tokio::test]
    async fn test_posts_round_state_and_parses_moves() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/advise"))
            .and(body_partial_json(json!({
                "current_round": 3,
                "agent_1": { "total_damage_received": 70 },
                "agent_2": { "total_damage_received": 15 },
                "metadata": { "api_key": "secret" }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "agent_1": "RECOVER", "agent_2": "special_move" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let decision = advisor(&server, Some("secret")).attempt(&input()).await.unwrap();
        assert_eq!(decision, MoveDecision::new(Move::Recover, Move::Special));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = advisor(&server, None).attempt(&input()).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Status(503)));
    }

    #[tokio::test]
    async fn test_unknown_move_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "agent_1": "fireball", "agent_2": "dodge" })),
            )
            .mount(&server)
            .await;

        let err = advisor(&server, None).attempt(&input()).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let advisor = HttpAdvisor::new("http://127.0.0.1:1/advise".into(), None).unwrap();
        let err = advisor.attempt(&input()).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Unreachable(_)));
    }
}
