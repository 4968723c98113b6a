//! On/off settings for transports.
//!
//! A switch is written `on` or `off`; `true`/`false` and `yes`/`no` are
//! accepted too, as is a TOML boolean. A switch left off the command line is
//! absent rather than off, so file and environment values still apply.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use strum::{Display, EnumString};

/// A setting that is either on or off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Switch {
    /// Enabled.
    #[strum(to_string = "on", serialize = "true", serialize = "yes")]
    On,
    /// Disabled.
    #[default]
    #[strum(to_string = "off", serialize = "false", serialize = "no")]
    Off,
}

impl Switch {
    /// Whether the switch is on.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for Switch {
    fn from(flag: bool) -> Self {
        if flag { Self::On } else { Self::Off }
    }
}

/// Errors encountered while parsing a [`Switch`] from text.
pub type SwitchParseError = strum::ParseError;

impl Serialize for Switch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The environment layer hands over `true`/`false` as booleans and every
/// other spelling as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum SwitchRepr {
    Flag(bool),
    Name(String),
}

impl<'de> Deserialize<'de> for Switch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match SwitchRepr::deserialize(deserializer)? {
            SwitchRepr::Flag(flag) => Ok(Self::from(flag)),
            SwitchRepr::Name(name) => name
                .parse()
                .map_err(|_| de::Error::custom(format!("expected on or off, found '{name}'"))),
        }
    }
}
