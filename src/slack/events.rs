use serde::Deserialize;

/// Outer Events API payload
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    #[serde(rename = "url_verification")]
    UrlVerification { challenge: String },

    #[serde(rename = "event_callback")]
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: Event,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "app_mention")]
    AppMention(Mention),

    #[serde(other)]
    Other,
}

/// The bot was addressed in a channel
#[derive(Debug, Clone, Deserialize)]
pub struct Mention {
    #[serde(default)]
    pub text: String,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl Envelope {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
