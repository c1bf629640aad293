/// Local sound cues the audio player can be asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    /// Wake acknowledgment, played when listening starts.
    Wake,
    /// No speech was detected after waking.
    NoInput,
    /// Recognition failed or the wake phrase was missing.
    NoMatch,
    /// Jingle preceding a news readout, requested by the server.
    NewsIntro,
    /// Ambient cue played when the session returns to sleep.
    Sleep,
}

impl Sound {
    /// Map a server-supplied sound name onto the local catalog.
    ///
    /// The dialogue service currently only ever names `news-intro`;
    /// everything else is unrecognized and left to the caller to log.
    pub fn from_server_name(name: &str) -> Option<Self> {
        match name {
            "news-intro" => Some(Sound::NewsIntro),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_news_intro() {
        assert_eq!(Sound::from_server_name("news-intro"), Some(Sound::NewsIntro));
    }

    #[test]
    fn unknown_names_are_none() {
        assert_eq!(Sound::from_server_name("alarm-clock"), None);
        assert_eq!(Sound::from_server_name(""), None);
    }
}
