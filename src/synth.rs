use std::sync::Arc;

use crate::error::Result;
use crate::models::{ChatMessage, FlightOffer};
use crate::transport::ReplyGenerator;

pub const SYSTEM_PROMPT: &str = "You are a travel planning assistant. If the user asked for flights, summarize options briefly. Include links if available.";
pub const SUMMARY_HEADER: &str = "Flight summaries";
pub const SEE_OPTIONS_POINTER: &str = "\n\n(See the options listed above.)";

/// Builds the conversation for the generator and finishes its reply.
pub struct ReplySynth {
    generator: Arc<dyn ReplyGenerator>,
    summary_limit: usize,
}

impl ReplySynth {
    pub fn new(generator: Arc<dyn ReplyGenerator>, summary_limit: usize) -> Self {
        Self {
            generator,
            summary_limit,
        }
    }

    /// One bullet per offer, capped at the summary limit
    pub fn summary_block(&self, offers: &[FlightOffer]) -> String {
        let bullets = offers
            .iter()
            .take(self.summary_limit)
            .map(|o| {
                format!(
                    "- {} {} {} → {} | {} | {}",
                    o.date,
                    o.departure_time,
                    o.origin_code,
                    o.destination_code,
                    o.airline_code,
                    o.price_display
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("{SUMMARY_HEADER}:\n{bullets}")
    }

    pub fn conversation(&self, user_text: &str, offers: &[FlightOffer]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_text)];
        if !offers.is_empty() {
            messages.push(ChatMessage::system(self.summary_block(offers)));
        }
        messages
    }

    /// Append the pointer to the listed options and any note.
    pub fn finish(&self, generated: String, offers: &[FlightOffer], note: Option<&str>) -> String {
        let mut reply = generated;
        if !offers.is_empty() && !reply.contains(SUMMARY_HEADER) {
            reply.push_str(SEE_OPTIONS_POINTER);
        }
        if let Some(note) = note {
            reply.push_str("\n\nNote: ");
            reply.push_str(note);
        }
        reply
    }

    pub async fn synth(
        &self,
        user_text: &str,
        offers: &[FlightOffer],
        note: Option<&str>,
    ) -> Result<String> {
        let messages = self.conversation(user_text, offers);
        tracing::info!(
            "Synthesizing reply from {} messages ({} offers)",
            messages.len(),
            offers.len()
        );
        let generated = self.generator.generate(&messages).await?;
        Ok(self.finish(generated, offers, note))
    }
}
