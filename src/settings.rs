// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Bridge settings, stored as RON.

use crate::{core::log::MessageKind, native::ShapeFlags};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    fs::File,
    io::Write,
    path::Path,
};

/// An error that may occur when loading or saving settings.
#[derive(Debug)]
pub enum SettingsError {
    /// File system error.
    Io(std::io::Error),
    /// Malformed settings file.
    Parse(ron::error::SpannedError),
    /// Settings could not be serialized.
    Serialize(ron::Error),
}

impl std::error::Error for SettingsError {}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "settings i/o error: {e}"),
            SettingsError::Parse(e) => write!(f, "unable to parse settings: {e}"),
            SettingsError::Serialize(e) => write!(f, "unable to serialize settings: {e}"),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ron::error::SpannedError> for SettingsError {
    fn from(e: ron::error::SpannedError) -> Self {
        Self::Parse(e)
    }
}

impl From<ron::Error> for SettingsError {
    fn from(e: ron::Error) -> Self {
        Self::Serialize(e)
    }
}

/// Tunables shared by every object created through one [`crate::physics::Physics`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Flags applied to shapes created without explicit flags. Simulation participation is
    /// still removed for geometry that cannot be simulated on dynamic actors.
    pub default_shape_flags: ShapeFlags,
    /// An actor with more shapes than this produces a one-time warning in the log.
    pub compound_shape_warning: usize,
    /// Log verbosity applied by [`crate::physics::Physics::with_settings`].
    pub log_verbosity: MessageKind,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            default_shape_flags: ShapeFlags::default(),
            compound_shape_warning: 32,
            log_verbosity: MessageKind::Information,
        }
    }
}

impl BridgeSettings {
    /// Default file name of the settings.
    pub const FILE_NAME: &'static str = "bridge_settings.ron";

    /// Loads settings from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let bytes = std::fs::read(path)?;
        Ok(ron::de::from_bytes(&bytes)?)
    }

    /// Loads settings from a file or returns defaults if there is no such file. Any other
    /// failure is reported.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        match Self::load(path) {
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Parses settings from a RON string.
    pub fn from_ron_str(str: &str) -> Result<Self, SettingsError> {
        Ok(ron::de::from_str(str)?)
    }

    /// Serializes settings into a pretty RON string.
    pub fn to_ron_string(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    /// Writes settings to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let mut file = File::create(path)?;
        file.write_all(self.to_ron_string()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn settings_round_trip() {
        let settings = BridgeSettings {
            default_shape_flags: ShapeFlags::SIMULATION_SHAPE | ShapeFlags::SCENE_QUERY_SHAPE,
            compound_shape_warning: 4,
            log_verbosity: MessageKind::Warning,
        };
        let text = settings.to_ron_string().unwrap();
        assert_eq!(BridgeSettings::from_ron_str(&text).unwrap(), settings);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings = BridgeSettings::from_ron_str("(compound_shape_warning: 8)").unwrap();
        assert_eq!(settings.compound_shape_warning, 8);
        assert_eq!(settings.default_shape_flags, ShapeFlags::default());
    }

    #[test]
    fn malformed_settings_are_reported() {
        assert!(matches!(
            BridgeSettings::from_ron_str("(compound_shape_warning: \"many\")"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings =
            BridgeSettings::load_or_default("this/path/does/not/exist/settings.ron").unwrap();
        assert_eq!(settings, BridgeSettings::default());
    }

    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "fyrox_bridge_settings_{}.ron",
            std::process::id()
        ));
        let settings = BridgeSettings {
            compound_shape_warning: 100,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(BridgeSettings::load(&path).unwrap(), settings);
        let _ = std::fs::remove_file(path);
    }
}
