//! The svix-style inbound-mail wire shape (§6 "Inbound email webhook") and
//! the normalized shape stored as `event_log.payload`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct WireAttachment {
    pub filename: String,
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: i64,
    pub data_base64: String,
}

/// The body fields §6 names: `from`, `to`, `subject`, `text`, `html`,
/// `message_id`, `in_reply_to`, `references`, `attachments`,
/// `email_id`/`id`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireBody {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl WireBody {
    /// `message_id`, falling back to `email_id`, then the bare `id` field —
    /// whichever the sending provider actually populated.
    pub fn provider_message_id(&self) -> Option<&str> {
        self.message_id
            .as_deref()
            .or(self.email_id.as_deref())
            .or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredAttachment {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub data_base64: String,
}

/// The shape handlers in `meridian-handlers` deserialize `event_log.payload`
/// into (`sender`, `subject`, `body`, `attachments`, `references`) — kept in
/// step with that crate's `MailEventPayload` by field name rather than by
/// shared type, since the wire shape and the stored shape are not the same
/// thing (the wire carries `to`/`text`/`html`, the stored shape doesn't).
#[derive(Debug, Clone, Serialize)]
pub struct StoredMailPayload {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<StoredAttachment>,
    pub references: Vec<String>,
}

impl From<WireBody> for StoredMailPayload {
    fn from(wire: WireBody) -> Self {
        let mut references = wire.references;
        if let Some(in_reply_to) = wire.in_reply_to {
            references.push(in_reply_to);
        }

        Self {
            sender: wire.from,
            subject: wire.subject,
            body: wire.text.or(wire.html).unwrap_or_default(),
            attachments: wire
                .attachments
                .into_iter()
                .map(|a| StoredAttachment {
                    filename: a.filename,
                    content_type: a.content_type,
                    size_bytes: a.size_bytes,
                    data_base64: a.data_base64,
                })
                .collect(),
            references,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_text_over_html_for_body() {
        let wire = WireBody {
            from: "a@b.com".to_string(),
            to: "support@tenant.com".to_string(),
            subject: "hi".to_string(),
            text: Some("plain".to_string()),
            html: Some("<p>rich</p>".to_string()),
            message_id: None,
            in_reply_to: None,
            references: vec![],
            attachments: vec![],
            email_id: None,
            id: None,
        };
        let stored: StoredMailPayload = wire.into();
        assert_eq!(stored.body, "plain");
    }

    #[test]
    fn in_reply_to_is_folded_into_references() {
        let wire = WireBody {
            from: "a@b.com".to_string(),
            to: "support@tenant.com".to_string(),
            subject: "hi".to_string(),
            text: None,
            html: None,
            message_id: None,
            in_reply_to: Some("<parent@mail>".to_string()),
            references: vec!["<root@mail>".to_string()],
            attachments: vec![],
            email_id: None,
            id: None,
        };
        let stored: StoredMailPayload = wire.into();
        assert_eq!(stored.references, vec!["<root@mail>".to_string(), "<parent@mail>".to_string()]);
    }

    #[test]
    fn provider_message_id_falls_back_through_three_fields() {
        let mut wire = WireBody {
            from: "a@b.com".to_string(),
            to: "t@tenant.com".to_string(),
            subject: String::new(),
            text: None,
            html: None,
            message_id: None,
            in_reply_to: None,
            references: vec![],
            attachments: vec![],
            email_id: None,
            id: Some("fallback-id".to_string()),
        };
        assert_eq!(wire.provider_message_id(), Some("fallback-id"));
        wire.email_id = Some("email-id".to_string());
        assert_eq!(wire.provider_message_id(), Some("email-id"));
        wire.message_id = Some("msg-id".to_string());
        assert_eq!(wire.provider_message_id(), Some("msg-id"));
    }
}
