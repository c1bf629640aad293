use secrecy::{ExposeSecret, SecretString};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

pub(crate) const AUTHORIZATION_HEADER: &str = "Authorization";

/// Path of the STT streaming endpoint, relative to the configured base URL.
pub(crate) const STT_STREAM_PATH: &str = "/en-US/voice/stream";

/// Swap an http(s) base URL for its WebSocket counterpart. URLs that are
/// already ws/wss pass through unchanged.
pub(crate) fn websocket_url(base: &str) -> String {
    if let Some(rest) = base.strip_prefix("https") {
        format!("wss{rest}")
    } else if let Some(rest) = base.strip_prefix("http") {
        format!("ws{rest}")
    } else {
        base.to_string()
    }
}

pub(crate) fn build_stt_request(base_url: &str) -> tokio_tungstenite::tungstenite::Result<Request> {
    format!("{}{}", websocket_url(base_url), STT_STREAM_PATH).into_client_request()
}

/// Dialogue connect request: the persisted conversation id rides along as a
/// query parameter, and a bearer header is attached when a token is set.
pub(crate) fn build_dialogue_request(
    url: &str,
    conversation_id: Option<&str>,
    access_token: Option<&SecretString>,
) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut target = websocket_url(url);
    if let Some(id) = conversation_id {
        target = format!("{target}?id={id}");
    }

    let mut request = target.into_client_request()?;
    if let Some(token) = access_token {
        request.headers_mut().insert(
            AUTHORIZATION_HEADER,
            format!("Bearer {}", token.expose_secret()).as_str().parse()?,
        );
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_http_schemes() {
        assert_eq!(websocket_url("https://nl.example.com"), "wss://nl.example.com");
        assert_eq!(websocket_url("http://10.0.0.2:3000"), "ws://10.0.0.2:3000");
        assert_eq!(websocket_url("wss://nl.example.com"), "wss://nl.example.com");
    }

    #[test]
    fn stt_request_targets_the_stream_path() {
        let request = build_stt_request("https://nl.example.com").unwrap();
        assert_eq!(request.uri().path(), "/en-US/voice/stream");
        assert_eq!(request.uri().scheme_str(), Some("wss"));
    }

    #[test]
    fn dialogue_request_carries_id_and_token() {
        let token = SecretString::from("sekrit".to_string());
        let request =
            build_dialogue_request("wss://almond.example.com/me/api/conversation", Some("c-17"), Some(&token))
                .unwrap();
        assert_eq!(request.uri().query(), Some("id=c-17"));
        assert_eq!(
            request.headers().get(AUTHORIZATION_HEADER).unwrap(),
            "Bearer sekrit"
        );
    }

    #[test]
    fn dialogue_request_without_id_or_token() {
        let request = build_dialogue_request("wss://almond.example.com/me/api/conversation", None, None).unwrap();
        assert_eq!(request.uri().query(), None);
        assert!(request.headers().get(AUTHORIZATION_HEADER).is_none());
    }
}
