/// The single terminal JSON reply of one STT stream.
///
/// The service answers exactly once per utterance, after the empty binary
/// terminator: `{"status": 0, "result": "ok", "text": "..."}` on success.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SttReply {
    status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl SttReply {
    pub fn status(&self) -> i64 {
        self.status
    }

    /// Only `status == 0` with a result discriminator of `"ok"` counts as a
    /// successful recognition; anything else is a failure.
    pub fn is_ok(&self) -> bool {
        self.status == 0 && self.result.as_deref() == Some("ok")
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
