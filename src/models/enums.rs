use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned by `FromStr` when a tag is outside its enumerated set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(OutputKind {
    Poster => "poster",
    Slides => "slides",
});

str_enum!(SectionType {
    Opening => "opening",
    Content => "content",
    Figure => "figure",
    Table => "table",
    Ending => "ending",
});

str_enum!(StylePreset {
    Academic => "academic",
    Playful => "playful",
    Custom => "custom",
});

str_enum!(SpeakerStyle {
    Conversational => "conversational",
    Generic => "generic",
});

impl SectionType {
    /// Layout key for a free-form section tag. Unknown tags render as content.
    pub fn from_tag(tag: &str) -> Self {
        tag.trim()
            .to_ascii_lowercase()
            .parse()
            .unwrap_or(SectionType::Content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_kind_round_trips_through_str() {
        assert_eq!("poster".parse::<OutputKind>().unwrap(), OutputKind::Poster);
        assert_eq!(OutputKind::Slides.as_str(), "slides");
    }

    #[test]
    fn invalid_enum_reports_field() {
        let err = "banner".parse::<OutputKind>().unwrap_err();
        assert_eq!(err.field, "OutputKind");
        assert_eq!(err.to_string(), "Invalid value for OutputKind: banner");
    }

    #[test]
    fn unknown_section_tag_falls_back_to_content() {
        assert_eq!(SectionType::from_tag("appendix"), SectionType::Content);
        assert_eq!(SectionType::from_tag(""), SectionType::Content);
        assert_eq!(SectionType::from_tag(" Opening "), SectionType::Opening);
    }

    #[test]
    fn speaker_style_parses() {
        assert_eq!("generic".parse::<SpeakerStyle>().unwrap(), SpeakerStyle::Generic);
        assert!("pirate".parse::<SpeakerStyle>().is_err());
    }

    #[test]
    fn style_preset_serializes_snake_case() {
        let json = serde_json::to_string(&StylePreset::Academic).unwrap();
        assert_eq!(json, "\"academic\"");
    }
}
