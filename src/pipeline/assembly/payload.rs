use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pipeline::extraction::{ContentBlock, ExtractionFailure};
use crate::pipeline::media::MediaReference;

/// What the user wants from the snapshot. Only changes the instructions text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Handoff,
    Debug,
    Review,
}

impl Mode {
    /// Label embedded verbatim in the instructions.
    pub fn label(self) -> &'static str {
        match self {
            Self::Handoff => "Full Project Handoff (Resume Work)",
            Self::Debug => "Fix Specific Error (Debug)",
            Self::Review => "Architecture Analysis (Review)",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handoff => "handoff",
            Self::Debug => "debug",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "handoff" => Ok(Self::Handoff),
            "debug" => Ok(Self::Debug),
            "review" => Ok(Self::Review),
            other => Err(format!(
                "unknown mode '{other}' (expected handoff, debug or review)"
            )),
        }
    }
}

pub const MANUAL_PASTE_HEADER: &str = "--- MANUAL PASTE ---";

/// Marker that follows a media reference so the model can tie it to a name.
pub fn media_marker(name: &str) -> String {
    format!("[MEDIA CONTEXT: {name}]")
}

/// One element of the ordered request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadElement {
    Instructions(String),
    ManualPaste(String),
    Content(ContentBlock),
    Failure(ExtractionFailure),
    Media(MediaReference),
    /// Name of the media item referenced just before.
    MediaMarker(String),
}

impl PayloadElement {
    /// Text form of the element. Media references have none.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Instructions(text) => Some(text.clone()),
            Self::ManualPaste(text) => Some(format!("{MANUAL_PASTE_HEADER}\n{text}")),
            Self::Content(block) => Some(block.text.clone()),
            Self::Failure(failure) => Some(failure.render()),
            Self::Media(_) => None,
            Self::MediaMarker(name) => Some(media_marker(name)),
        }
    }
}

/// Ordered sequence of elements sent to the model in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    elements: Vec<PayloadElement>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: PayloadElement) {
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[PayloadElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Text of every non-media element, in order.
    pub fn texts(&self) -> Vec<String> {
        self.elements.iter().filter_map(PayloadElement::text).collect()
    }

    /// Human-readable view; media references appear as their URI.
    pub fn render_text(&self) -> String {
        self.elements
            .iter()
            .map(|element| match element {
                PayloadElement::Media(reference) => {
                    format!("[MEDIA FILE: {} ({})]", reference.local_name, reference.uri)
                }
                other => other.text().unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Debug".parse::<Mode>().unwrap(), Mode::Debug);
        assert_eq!(" review ".parse::<Mode>().unwrap(), Mode::Review);
        assert!("audit".parse::<Mode>().is_err());
        assert_eq!(Mode::default(), Mode::Handoff);
    }

    #[test]
    fn manual_paste_text_has_header() {
        let element = PayloadElement::ManualPaste("stack trace here".into());
        assert_eq!(
            element.text().unwrap(),
            "--- MANUAL PASTE ---\nstack trace here"
        );
    }

    #[test]
    fn media_has_no_text_but_marker_does() {
        let media = PayloadElement::Media(MediaReference {
            local_name: "demo.mov".into(),
            uri: "https://x/files/1".into(),
            mime_type: "video/quicktime".into(),
        });
        assert!(media.text().is_none());
        assert_eq!(
            PayloadElement::MediaMarker("demo.mov".into()).text().unwrap(),
            "[MEDIA CONTEXT: demo.mov]"
        );
    }

    #[test]
    fn texts_skip_media_and_keep_order() {
        let mut payload = Payload::new();
        payload.push(PayloadElement::Instructions("do it".into()));
        payload.push(PayloadElement::Media(MediaReference {
            local_name: "a.mp3".into(),
            uri: "u".into(),
            mime_type: "audio/mpeg".into(),
        }));
        payload.push(PayloadElement::MediaMarker("a.mp3".into()));

        assert_eq!(payload.len(), 3);
        assert_eq!(payload.texts(), vec!["do it", "[MEDIA CONTEXT: a.mp3]"]);
        assert!(payload.render_text().contains("[MEDIA FILE: a.mp3 (u)]"));
    }
}
