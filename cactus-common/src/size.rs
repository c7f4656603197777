use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CommonError;

/// Instance sizes offered by the creation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSize {
    Micro,
    Tiny,
    #[default]
    Small,
    Medium,
    Large,
}

impl InstanceSize {
    pub const ALL: [InstanceSize; 5] = [
        InstanceSize::Micro,
        InstanceSize::Tiny,
        InstanceSize::Small,
        InstanceSize::Medium,
        InstanceSize::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceSize::Micro => "micro",
            InstanceSize::Tiny => "tiny",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
        }
    }
}

impl fmt::Display for InstanceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceSize {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        InstanceSize::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CommonError::UnknownSize(wanted.to_string()))
    }
}
