use std::fmt;

use reqwest::{Client, Response};
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};

const MARKDOWN_RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
    '!',
];

enum Message {
    Alert(String, Level),
    Digest(String),
}

/// Forwards warnings and errors to a Telegram chat and delivers activity digests.
#[derive(Clone)]
pub struct TelegramSubscriber {
    sender: mpsc::UnboundedSender<Message>,
}

pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn render(message: Message) -> String {
    match message {
        Message::Alert(text, level) => {
            format!("*{}*: `{}`", level.as_str(), escape_markdown(&text))
        }
        Message::Digest(text) => escape_markdown(&text),
    }
}

async fn send_message(
    client: &Client,
    bot_token: &str,
    chat_id: &str,
    text: String,
) -> anyhow::Result<Response> {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", bot_token);
    let params = [
        ("chat_id", chat_id),
        ("text", &text),
        ("parse_mode", "MarkdownV2"),
    ];

    Ok(client.post(&url).form(&params).send().await?)
}

async fn sender_task(
    mut reader: mpsc::UnboundedReceiver<Message>,
    client: Client,
    bot_token: String,
    chat_id: String,
) {
    while let Some(message) = reader.recv().await {
        match send_message(&client, &bot_token, &chat_id, render(message)).await {
            Ok(response) if response.status().is_success() => {}
            // Reporting through tracing would loop back into this chat
            Ok(response) => eprintln!(
                "Failed to send telegram message: Received HTTP {}",
                response.status()
            ),
            Err(e) => eprintln!("Failed to send telegram message: {}", e),
        }
    }
}

impl TelegramSubscriber {
    /// Must be called from within a tokio runtime.
    pub fn new(bot_token: String, chat_id: String) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(sender_task(receiver, Client::new(), bot_token, chat_id));
        Self { sender }
    }

    pub fn alert(&self, message: &str, level: &Level) {
        let _ = self
            .sender
            .send(Message::Alert(message.to_string(), *level));
    }

    pub fn send_digest(&self, text: String) {
        let _ = self.sender.send(Message::Digest(text));
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for TelegramSubscriber {
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = event.metadata().level();
        if level > &Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.alert(&visitor.to_string(), level);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl fmt::Display for MessageVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_is_escaped() {
        assert_eq!(
            escape_markdown("acme/app: 3 commits (v1.2-rc)!"),
            "acme/app: 3 commits \\(v1\\.2\\-rc\\)\\!"
        );
        assert_eq!(
            escape_markdown(r"Fix C:\Users path"),
            r"Fix C:\\Users path"
        );
    }

    #[test]
    fn alerts_carry_level() {
        let text = render(Message::Alert("db down".to_string(), Level::ERROR));
        assert_eq!(text, "*ERROR*: `db down`");
    }
}
