//! Per-business classification: acquire, digest, prompt, stream, extract.

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use categorizer_crawler::build_client;
use categorizer_digest::build_digest;
use categorizer_discovery::parse_base_url;
use categorizer_genai::{ChatMessage, ChatRole, GenerationClient, StreamEvent};
use categorizer_shared::{
    AppConfig, ClassificationResult, CompanyProfile, GenerationConfig, KnowledgeBase, Result,
    ScrapeConfig, knowledge_base,
};

use crate::acquire::ContentAcquirer;
use crate::extract::extract_classification;
use crate::input::{extract_url_from_input, normalize_url};
use crate::prompt::{GUIDANCE_PROMPT, build_request};

/// Buffered events between a running classification and its consumer.
const EVENT_BUFFER: usize = 64;

/// What a single-item classification emits, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyEvent {
    /// Raw model output as it arrives.
    Fragment(String),
    /// The final result. Always the last event.
    Completed(ClassificationResult),
}

/// Outcome of [`Classifier::classify_profile`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The model answered and its output was extracted.
    Classified(ClassificationResult),
    /// A sentinel stood in for a model answer.
    Sentinel(ClassificationResult),
}

impl Verdict {
    pub fn result(&self) -> &ClassificationResult {
        match self {
            Self::Classified(r) | Self::Sentinel(r) => r,
        }
    }

    pub fn into_result(self) -> ClassificationResult {
        match self {
            Self::Classified(r) | Self::Sentinel(r) => r,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Classified(_))
    }
}

/// Runs the whole pipeline for one business. Cheap to clone.
#[derive(Clone)]
pub struct Classifier {
    acquirer: ContentAcquirer,
    genai: GenerationClient,
    knowledge_base: &'static KnowledgeBase,
    max_summary_words: usize,
}

impl Classifier {
    /// Build a classifier from application config.
    ///
    /// Fails if the generation service is not configured.
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate_genai()?;

        let acquirer = ContentAcquirer::new(build_client()?, ScrapeConfig::from(config));
        let genai = GenerationClient::new(&GenerationConfig::from(config))?;

        Ok(Self {
            acquirer,
            genai,
            knowledge_base: knowledge_base(),
            max_summary_words: config.defaults.max_summary_words,
        })
    }

    /// Classify one business described by `profile`.
    ///
    /// Fragments of the model output are forwarded to `fragments` when given.
    /// Errors are returned only for an unusable web address or a failed fetch
    /// task; service failures become sentinels.
    #[instrument(
        skip_all,
        fields(run_id = %Uuid::now_v7(), customer = %profile.customer, url = %profile.web_address)
    )]
    pub async fn classify_profile(
        &self,
        profile: &CompanyProfile,
        chat_history: Vec<ChatMessage>,
        fragments: Option<&mpsc::Sender<ClassifyEvent>>,
    ) -> Result<Verdict> {
        let base = parse_base_url(&profile.web_address)?;
        let content = self.acquirer.acquire(&base, &profile.customer).await?;

        if !content.has_content() {
            warn!("no content from website or search");
            return Ok(Verdict::Sentinel(ClassificationResult::no_content(
                &profile.customer,
                &profile.web_address,
            )));
        }

        let digest = build_digest(&content, self.max_summary_words);
        let request = build_request(
            &digest,
            profile,
            self.knowledge_base,
            self.genai.config(),
            chat_history,
        );

        let mut stream = match self.genai.chat_stream(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "generation service unavailable");
                return Ok(Verdict::Sentinel(ClassificationResult::no_response(
                    &e.to_string(),
                )));
            }
        };

        let mut response = String::new();
        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Fragment(text)) => {
                    if let Some(tx) = fragments {
                        // A dropped consumer does not stop the classification.
                        let _ = tx.send(ClassifyEvent::Fragment(text.clone())).await;
                    }
                    response.push_str(&text);
                }
                Ok(StreamEvent::EndOfStream) => break,
                Err(e) => {
                    warn!(error = %e, "response stream failed");
                    return Ok(Verdict::Sentinel(ClassificationResult::from_error(&e)));
                }
            }
        }

        let result = extract_classification(&response, self.knowledge_base);
        info!(
            primary = %result.primary_category,
            confidence = %result.confidence,
            response_chars = response.len(),
            "classification complete"
        );
        Ok(Verdict::Classified(result))
    }

    /// Classify free-form `input` interactively, with earlier conversation
    /// turns in `chat_history`.
    ///
    /// Returns immediately; model output streams through the receiver and the
    /// last event is always [`ClassifyEvent::Completed`].
    pub fn classify(
        &self,
        input: &str,
        company: &str,
        chat_history: Vec<ChatMessage>,
    ) -> mpsc::Receiver<ClassifyEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let classifier = self.clone();
        let input = input.to_string();
        let company = company.trim().to_string();

        tokio::spawn(async move {
            let result = classifier
                .classify_input(&input, &company, chat_history, &tx)
                .await;
            let _ = tx.send(ClassifyEvent::Completed(result)).await;
        });

        rx
    }

    async fn classify_input(
        &self,
        input: &str,
        company: &str,
        chat_history: Vec<ChatMessage>,
        tx: &mpsc::Sender<ClassifyEvent>,
    ) -> ClassificationResult {
        let Some(url) = extract_url_from_input(input) else {
            info!("no URL in input");
            return ClassificationResult::no_url(None);
        };

        let profile = CompanyProfile {
            customer: if company.is_empty() {
                input.trim().to_string()
            } else {
                company.to_string()
            },
            web_address: normalize_url(&url),
            ..CompanyProfile::default()
        };
        let history = with_guidance(chat_history);

        match self.classify_profile(&profile, history, Some(tx)).await {
            Ok(verdict) => verdict.into_result(),
            Err(e) => {
                warn!(error = %e, "classification failed");
                ClassificationResult::from_error(&e)
            }
        }
    }
}

/// Seed `history` with the guidance message unless it already has a system turn.
fn with_guidance(mut history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if !history.iter().any(|m| m.role == ChatRole::System) {
        history.insert(0, ChatMessage::system(GUIDANCE_PROMPT));
    }
    history
}
