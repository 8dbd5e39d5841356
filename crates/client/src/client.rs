//! The caller-facing facade.

use crate::{AssistConfig, ChatModel};
use handler::{EventReceiver, RequestConfig, RequestHandler};
use mcore::{ContextData, HandlerEvent, Message, RequestEnvelope, RequestId, RequestType, Role};
use provider::{Provider, ProviderRegistry, Transport};
use serde_json::json;
use std::sync::Arc;
use template::{Template, TemplateRegistry};
use tokio::sync::mpsc;

/// Binds a chat session to the request handler.
///
/// Owns the session log and the event pump relaying handler events into
/// it. Failed requests surface on the error channel returned by [`new`];
/// the facade never retries.
///
/// [`new`]: ClientInterface::new
pub struct ClientInterface {
    handler: RequestHandler,
    chat: Arc<ChatModel>,
    providers: ProviderRegistry,
    templates: TemplateRegistry,
    config: AssistConfig,
}

impl ClientInterface {
    /// Create a facade over the given registries and transport.
    ///
    /// Returns the facade together with the channel on which failed
    /// requests report their human-readable error description.
    pub fn new(
        config: AssistConfig,
        providers: ProviderRegistry,
        templates: TemplateRegistry,
        transport: Arc<dyn Transport>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (handler, events) = RequestHandler::new(transport);
        let chat = Arc::new(ChatModel::new());
        let (errors, error_receiver) = mpsc::unbounded_channel();

        tokio::spawn(pump_events(events, chat.clone(), errors));

        (
            Self {
                handler,
                chat,
                providers,
                templates,
                config,
            },
            error_receiver,
        )
    }

    /// Send a chat message.
    ///
    /// Cancels any request correlated with the most recent logged message,
    /// assembles the payload (template decoration, then provider
    /// decoration), appends the user message to the log and submits.
    /// An unresolved provider or template name logs a warning and the
    /// request goes out in degraded form with the fields set so far.
    pub fn send_message(&self, text: impl Into<String>) -> RequestId {
        let text = text.into();
        self.cancel_request();

        let provider = self.resolve_provider();
        let template = self.resolve_template();

        let mut history = self.chat.history();
        history.push(Message::user(&text));
        let mut context = ContextData::new(&text).with_history(history.clone());
        if let Some(prompt) = &self.config.system_prompt {
            context = context.with_system_prompt(prompt);
        }

        let mut payload = json!({
            "model": self.config.model,
            "stream": true,
            "messages": history,
        });
        if let Some(template) = template {
            template.prepare_request(&mut payload, &context);
        }
        if let Some(provider) = &provider {
            provider.prepare_request(&mut payload, RequestType::Chat, &self.config.sampling);
        }

        let url = format!(
            "{}{}",
            self.config.base_url,
            provider.as_ref().map(|p| p.chat_endpoint()).unwrap_or("")
        );
        let request = RequestConfig {
            request_type: RequestType::Chat,
            provider,
            template,
            url,
            payload,
            multi_line: true,
        };

        let envelope = RequestEnvelope::fresh();
        let id = envelope.id.clone();
        self.chat.add_message(Role::User, text, id.clone());
        self.handler.submit(request, envelope);
        id
    }

    /// Cancel the request correlated with the most recent logged message.
    pub fn cancel_request(&self) {
        if let Some(id) = self.chat.last_message_id() {
            self.handler.cancel(&id);
        }
    }

    /// Empty the session log.
    ///
    /// Leaves any in-flight request running unless `cancel_on_clear` is
    /// set in the config.
    pub fn clear_messages(&self) {
        if self.config.cancel_on_clear {
            self.cancel_request();
        }
        self.chat.clear();
        tracing::debug!("chat history cleared");
    }

    /// The session log.
    pub fn chat(&self) -> &ChatModel {
        &self.chat
    }

    fn resolve_provider(&self) -> Option<Provider> {
        match self.providers.get(&self.config.provider) {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::warn!("no provider found: {e}");
                None
            }
        }
    }

    fn resolve_template(&self) -> Option<Template> {
        match self.templates.get_chat(&self.config.template) {
            Ok(template) => Some(template),
            Err(e) => {
                tracing::warn!("no prompt template found: {e}");
                None
            }
        }
    }
}

/// Relay handler events into the session log.
///
/// Each completion event upserts the assistant message keyed by its
/// envelope id: the first event creates the entry, later ones replace its
/// content with the accumulated text. Failed terminal events are forwarded
/// as error descriptions; successful and cancelled requests end silently.
async fn pump_events(
    mut events: EventReceiver,
    chat: Arc<ChatModel>,
    errors: mpsc::UnboundedSender<String>,
) {
    while let Some(event) = events.recv().await {
        match event {
            HandlerEvent::Completion {
                id,
                text,
                is_complete,
                ..
            } => {
                chat.add_message(Role::Assistant, text.trim(), id.clone());
                if is_complete {
                    tracing::debug!(%id, "message completed");
                }
            }
            HandlerEvent::Finished { success, error, .. } => {
                if !success {
                    let _ = errors.send(error);
                }
            }
        }
    }
}
