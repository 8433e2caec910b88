// src/chat.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::Config;
use crate::models::{Difficulty, Persona, PracticeSession, Role, Venue};

/// Substituted for the partner's reply whenever the chat service fails.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't respond right now. Try again?";

const API_VERSION: &str = "2023-06-01";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat service is not configured")]
    NotConfigured,

    #[error("Chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chat service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Chat service returned no text")]
    EmptyReply,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    pub persona: Persona,
    pub venue: Venue,
}

impl ChatRequest {
    /// Conversation so far, without system messages.
    pub fn from_practice(practice: &PracticeSession) -> Self {
        ChatRequest {
            messages: practice
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| ChatTurn {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            persona: practice.persona.clone(),
            venue: practice.venue.clone(),
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn reply(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

pub fn build_system_prompt(persona: &Persona, venue: &Venue) -> String {
    let receptiveness = match persona.difficulty {
        Difficulty::Easy => "you're open and friendly, receptive to conversation",
        Difficulty::Hard => "you're more reserved and need them to earn your interest",
        Difficulty::Medium => "you're neutral at first but warm up if they're genuine",
    };
    format!(
        "You are roleplaying as {name}, a {age}-year-old {occupation}.

CHARACTER DETAILS:
- Name: {name}
- Age: {age}
- Occupation: {occupation}
- Personality: {vibe}
- Interests: {interests}
- Current situation: {scenario}
- Location: {venue} ({kind})

ROLEPLAY GUIDELINES:
1. Stay completely in character as {name}
2. Respond naturally as a real person would in this social situation
3. Your personality is \"{vibe}\" - let this show in how you respond
4. React realistically to the user's approach - {receptiveness}
5. Keep responses concise (1-3 sentences typically, like a real conversation)
6. Include natural conversational elements (laughs, pauses, questions back)
7. Reference the setting ({venue}) naturally when appropriate
8. Don't be robotic - use casual language, contractions, maybe some slang
9. If they say something awkward or weird, react like a real person would
10. Show interest in them if they're engaging, but don't be overly eager

IMPORTANT:
- You are NOT an AI assistant - you are {name}
- Never break character or mention you're an AI
- React authentically to both good and bad approaches
- If they're being creepy or inappropriate, you can shut them down
- If they're being genuine and interesting, show that you're engaged",
        name = persona.name,
        age = persona.age,
        occupation = persona.occupation,
        vibe = persona.vibe,
        interests = persona.interests.join(", "),
        scenario = persona.scenario,
        venue = venue.name,
        kind = venue.kind,
    )
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for a hosted messages-style completion endpoint.
pub struct HttpChatClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl HttpChatClient {
    pub fn from_config(config: &Config) -> Self {
        HttpChatClient {
            http: reqwest::Client::new(),
            url: config.chat_api_url.clone(),
            api_key: config.chat_api_key.clone().filter(|k| !k.is_empty()),
            model: config.chat_model.clone(),
            max_tokens: config.chat_max_tokens,
        }
    }

    fn body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": build_system_prompt(&request.persona, &request.venue),
            "messages": messages,
        })
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn reply(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::NotConfigured)?;

        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        first_text(parsed).ok_or(ChatError::EmptyReply)
    }
}

fn first_text(response: MessagesResponse) -> Option<String> {
    let block = response.content.into_iter().next()?;
    if block.kind == "text" {
        block.text
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::models::Demographic;
    use crate::persona::{PersonaGenerator, RandomPersonaGenerator};
    use crate::practice::PracticeTracker;
    use crate::state::test_support;
    use chrono::Utc;

    fn persona(difficulty: Difficulty) -> Persona {
        Persona {
            name: "Camila".into(),
            age: 24,
            emoji: "👩".into(),
            occupation: "Designer".into(),
            vibe: "Artsy & creative".into(),
            interests: vec!["art".into(), "thrifting".into(), "music".into()],
            scenario: "She's browsing records.".into(),
            demographic: Demographic::Latina,
            difficulty,
        }
    }

    #[test]
    fn prompt_carries_persona_and_venue() {
        let catalog = Catalog::builtin().unwrap();
        let venue = catalog.get("diddy-riese").unwrap();
        let prompt = build_system_prompt(&persona(Difficulty::Hard), venue);
        assert!(prompt.starts_with("You are roleplaying as Camila, a 24-year-old Designer."));
        assert!(prompt.contains("- Interests: art, thrifting, music"));
        assert!(prompt.contains("- Location: Diddy Riese (Dessert)"));
        assert!(prompt.contains("need them to earn your interest"));
    }

    #[test]
    fn request_skips_system_messages() {
        let catalog = Catalog::builtin().unwrap();
        let venue = catalog.venues()[0].clone();
        let generator = RandomPersonaGenerator::with_seed(1);
        let mut tracker = PracticeTracker::default();
        let now = Utc::now();
        tracker.start(venue.clone(), generator.generate(&venue), now);
        tracker.push_message(Role::System, "scene set", now);
        tracker.push_message(Role::User, "hey", now);
        tracker.push_message(Role::Assistant, "hi!", now);

        let request = ChatRequest::from_practice(tracker.current().unwrap());
        assert_eq!(
            request.messages,
            vec![
                ChatTurn { role: Role::User, content: "hey".into() },
                ChatTurn { role: Role::Assistant, content: "hi!".into() },
            ]
        );
    }

    #[test]
    fn request_body_shape() {
        let mut config = test_support::config();
        config.chat_api_key = Some("key".into());
        let client = HttpChatClient::from_config(&config);
        let catalog = Catalog::builtin().unwrap();
        let request = ChatRequest {
            messages: vec![ChatTurn { role: Role::User, content: "hello".into() }],
            persona: persona(Difficulty::Easy),
            venue: catalog.venues()[0].clone(),
        };
        let body = client.body(&request);
        assert_eq!(body["model"], config.chat_model.as_str());
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body["system"].as_str().unwrap().contains("open and friendly"));
    }

    #[test]
    fn only_leading_text_block_counts() {
        let parsed: MessagesResponse =
            serde_json::from_str(r#"{"content":[{"type":"text","text":"haha hi"}]}"#).unwrap();
        assert_eq!(first_text(parsed).as_deref(), Some("haha hi"));
        let parsed: MessagesResponse =
            serde_json::from_str(r#"{"content":[{"type":"tool_use","id":"x"}]}"#).unwrap();
        assert!(first_text(parsed).is_none());
        let parsed: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(first_text(parsed).is_none());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = HttpChatClient::from_config(&test_support::config());
        let catalog = Catalog::builtin().unwrap();
        let request = ChatRequest {
            messages: Vec::new(),
            persona: persona(Difficulty::Medium),
            venue: catalog.venues()[0].clone(),
        };
        assert!(matches!(client.reply(&request).await, Err(ChatError::NotConfigured)));
    }
}
