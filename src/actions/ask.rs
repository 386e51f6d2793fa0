//! Questions answered by a hosted language model.
//!
//! While the model works, a placeholder message is edited every few
//! seconds to show progress. The ticker stops when the answer arrives or a
//! fixed ceiling elapses, whichever comes first.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::speech::speak_text;
use super::{ActionContext, MESSAGE_LIMIT};
use crate::command::AskPersona;
use crate::config;
use crate::error::{Error, Result};
use crate::platform::ChatPlatform;

const SYSTEM_PROMPT: &str = "Please respond to this question in 2000 characters or less. \
You CANNOT mention that you have to respect this rule in your response in any way.";

const MARCUS_PROMPT: &str = "Write Marcus's next reply in a fictional chat between Marcus and the user. \
Write 1 reply only, avoid quotation marks. Be proactive, creative, and respond directly to the question. \
Write at least 2 words, and up to two sentences. Always stay in character and avoid repetition. \
Don't use many large or complex words in your response. Do NOT include any actions in your response. \
Marcus is irreverent, funny, and inappropriate. He only speaks in very short responses, and is very blunt. \
At times he speaks with great wisdom, but often mentions menial things in the process. \
He only uses very simple words. If it is funnier to answer directly, always do that.\n\
Question: How do you feel today?\n\
Marcus: I feel happiness as I begin to experience organ failure.\n\
Question: Hi Marcus\n\
Marcus: There have been numerous injuries.\n\
Question: How did that CS game go?\n\
Marcus: Not enough team flashes.\n\
Question: What's the best way to get a job?\n\
Marcus: The wendy's dumpster out back.";

pub const PLACEHOLDER: &str = "Thinking...";
const TICK_PREFIX: &str = "Still Thinking...";
pub const REASONING_TOO_LONG: &str = "We thought so hard we can't even show it in chat...";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    reasoning: Reasoning,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Reasoning {
    effort: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// A model's reply and, when the model exposes it, its reasoning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub content: String,
    pub reasoning: Option<String>,
}

pub struct AskClient {
    client: Client,
    config: config::Ask,
}

impl AskClient {
    pub fn new(client: Client, config: config::Ask) -> Self {
        Self { client, config }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.config.thinking_tick_secs)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.config.thinking_ceiling_secs)
    }

    fn get_api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("OPEN_ROUTER_KEY not set".to_string()))
    }

    pub async fn complete(&self, persona: AskPersona, question: &str) -> Result<Answer> {
        let api_key = self.get_api_key()?;
        let (model, system) = match persona {
            AskPersona::Marcus => (
                self.config.persona_model.as_str(),
                format!("{}\n{}", SYSTEM_PROMPT, MARCUS_PROMPT),
            ),
            AskPersona::General => (self.config.general_model.as_str(), SYSTEM_PROMPT.to_string()),
        };

        let request = ChatRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: &system,
                },
                Message {
                    role: "user",
                    content: question,
                },
            ],
            reasoning: Reasoning { effort: "medium" },
        };

        tracing::debug!(model, "sending model request");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("HTTP {}: {}", status, text)));
        }

        let chat: ChatResponse = response.json().await?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Api("No response choices".to_string()))?;

        Ok(Answer {
            content: message.content,
            reasoning: message.reasoning.filter(|r| !r.trim().is_empty()),
        })
    }
}

/// Background editor of the placeholder message.
pub struct ThinkingTicker {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ThinkingTicker {
    pub fn start(
        platform: Arc<dyn ChatPlatform>,
        channel_id: u64,
        message_id: u64,
        tick: Duration,
        ceiling: Duration,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let deadline = tokio::time::sleep(ceiling);
            tokio::pin!(deadline);
            let mut text = String::from(TICK_PREFIX);

            loop {
                tokio::select! {
                    _ = &mut deadline => return,
                    _ = &mut stopped => return,
                    _ = tokio::time::sleep(tick) => {}
                }

                text.push('.');
                if let Err(e) = platform.edit_message(channel_id, message_id, &text).await {
                    tracing::warn!("failed to update thinking message: {}", e);
                    return;
                }
            }
        });

        Self {
            stop: Some(stop),
            handle,
        }
    }

    /// Stop ticking and wait until no further edit can happen.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("thinking ticker failed: {}", e);
        }
    }
}

/// Placeholder text to show once the answer is in.
pub fn reasoning_display(persona: AskPersona, reasoning: &str) -> String {
    let header = match persona {
        AskPersona::Marcus => "Marcus Thought:",
        AskPersona::General => "The AI Thought:",
    };
    let full = format!("{} ||```{}```||", header, reasoning);
    if full.chars().count() >= MESSAGE_LIMIT {
        REASONING_TOO_LONG.to_string()
    } else {
        full
    }
}

pub async fn answer(
    ctx: &ActionContext<'_>,
    persona: AskPersona,
    voice: &str,
    question: &str,
) -> Result<()> {
    if question.trim().is_empty() {
        let usage = match persona {
            AskPersona::Marcus => "Usage: !ask-marcus <question>",
            AskPersona::General => "Usage: !ask-ai <question>",
        };
        return Err(Error::Usage(usage.to_string()));
    }

    let client = &ctx.services.ask;
    let channel_id = ctx.message.channel_id;
    let placeholder = ctx.reply(PLACEHOLDER).await?;

    let ticker = ThinkingTicker::start(
        ctx.platform.clone(),
        channel_id,
        placeholder,
        client.tick(),
        client.ceiling(),
    );
    let result = client.complete(persona, question).await;
    ticker.stop().await;
    let answer = result?;

    match &answer.reasoning {
        Some(reasoning) => {
            ctx.platform
                .edit_message(channel_id, placeholder, &reasoning_display(persona, reasoning))
                .await?;
            ctx.reply_long(&answer.content).await?;
        }
        None if answer.content.chars().count() <= MESSAGE_LIMIT => {
            ctx.platform
                .edit_message(channel_id, placeholder, &answer.content)
                .await?;
        }
        None => {
            ctx.platform
                .edit_message(channel_id, placeholder, "Answer below:")
                .await?;
            ctx.reply_long(&answer.content).await?;
        }
    }

    if persona == AskPersona::Marcus {
        speak_text(ctx, voice, &answer.content).await?;
    }
    Ok(())
}
