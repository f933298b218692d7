use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
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

str_enum!(LabType {
    TwoRiver => "2river",
    ScLabs => "sclabs",
    SteepHill => "steephill",
    Generic => "generic",
});

str_enum!(QualityLevel {
    Excellent => "excellent",
    Good => "good",
    Fair => "fair",
    Poor => "poor",
});

str_enum!(ExtractionMethod {
    TwoRiverSpecific => "2river_specific",
    ScLabsSpecific => "sclabs_specific",
    SteepHillSpecific => "steephill_specific",
    StructuredPatterns => "structured_patterns",
    NumericalRanges => "numerical_ranges",
    ContextualSearch => "contextual_search",
    TerpenePanel => "terpene_panel",
    CombinedStrategies => "combined_strategies",
    Fallback => "fallback",
});

/// Lab metadata applied when the document itself did not yield it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabDefaults {
    pub lab_name: &'static str,
    pub category: &'static str,
    pub sub_category: Option<&'static str>,
}

impl LabType {
    /// Defaults for known labs. `Generic` has none.
    pub fn defaults(&self) -> Option<LabDefaults> {
        match self {
            Self::TwoRiver => Some(LabDefaults {
                lab_name: "2 River Labs, Inc",
                category: "Flower",
                sub_category: Some("Inhalable"),
            }),
            Self::ScLabs => Some(LabDefaults {
                lab_name: "SC Labs",
                category: "Flower",
                sub_category: None,
            }),
            Self::SteepHill => Some(LabDefaults {
                lab_name: "Steep Hill Labs",
                category: "Flower",
                sub_category: None,
            }),
            Self::Generic => None,
        }
    }

    /// Name reported when extraction falls back to the minimal record.
    pub fn fallback_lab_name(&self) -> &'static str {
        self.defaults().map_or("Unknown", |d| d.lab_name)
    }

    /// Method tag of the lab-specific strategy, if this lab has one.
    pub fn specific_method(&self) -> Option<ExtractionMethod> {
        match self {
            Self::TwoRiver => Some(ExtractionMethod::TwoRiverSpecific),
            Self::ScLabs => Some(ExtractionMethod::ScLabsSpecific),
            Self::SteepHill => Some(ExtractionMethod::SteepHillSpecific),
            Self::Generic => None,
        }
    }
}
