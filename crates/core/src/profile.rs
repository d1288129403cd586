//! Profile model: the three on-board slots and their settings columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// On-board profile slot of the G300 (selected with the F3/F4/F5 keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileId {
    F3,
    F4,
    F5,
}

impl ProfileId {
    /// All profiles, in slot order.
    pub const ALL: &'static [ProfileId] = &[ProfileId::F3, ProfileId::F4, ProfileId::F5];

    /// Name as ratslap and the store spell it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F3 => "f3",
            Self::F4 => "f4",
            Self::F5 => "f5",
        }
    }

    /// Slot number printed on the key cap.
    pub fn index(&self) -> u8 {
        match self {
            Self::F3 => 3,
            Self::F4 => 4,
            Self::F5 => 5,
        }
    }
}

impl FromStr for ProfileId {
    type Err = Error;

    /// Accepts `3`, `f3` and `F3` style names.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3" | "f3" => Ok(Self::F3),
            "4" | "f4" => Ok(Self::F4),
            "5" | "f5" => Ok(Self::F5),
            _ => Err(Error::InvalidProfile(s.to_string())),
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.index())
    }
}

/// One settings column of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Color,
    Rate,
    Dpi1,
    Dpi2,
    Dpi3,
    Dpi4,
    DpiShift,
    Left,
    Right,
    Middle,
    G4,
    G5,
    G6,
    G7,
    G8,
    G9,
}

impl Field {
    /// Every column, in table order.
    pub const ALL: &'static [Field] = &[
        Field::Name,
        Field::Color,
        Field::Rate,
        Field::Dpi1,
        Field::Dpi2,
        Field::Dpi3,
        Field::Dpi4,
        Field::DpiShift,
        Field::Left,
        Field::Right,
        Field::Middle,
        Field::G4,
        Field::G5,
        Field::G6,
        Field::G7,
        Field::G8,
        Field::G9,
    ];

    /// The nine physical buttons, in the order the window lays them out.
    pub const BUTTONS: &'static [Field] = &[
        Field::Left,
        Field::Right,
        Field::Middle,
        Field::G4,
        Field::G5,
        Field::G6,
        Field::G7,
        Field::G8,
        Field::G9,
    ];

    pub const DPI_LEVELS: &'static [Field] =
        &[Field::Dpi1, Field::Dpi2, Field::Dpi3, Field::Dpi4];

    /// Column name in the `profiles` table, also the long flag for `--modify`.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Color => "color",
            Self::Rate => "rate",
            Self::Dpi1 => "dpi1",
            Self::Dpi2 => "dpi2",
            Self::Dpi3 => "dpi3",
            Self::Dpi4 => "dpi4",
            Self::DpiShift => "dpi_shift",
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
            Self::G4 => "g4",
            Self::G5 => "g5",
            Self::G6 => "g6",
            Self::G7 => "g7",
            Self::G8 => "g8",
            Self::G9 => "g9",
        }
    }

    /// Label ratslap prints in front of the value when showing a profile.
    ///
    /// `Name` has no label: the profile name comes from the request, not the output.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Name => None,
            Self::Color => Some("Colour"),
            Self::Rate => Some("Report Rate"),
            Self::Dpi1 => Some("DPI #1"),
            Self::Dpi2 => Some("DPI #2"),
            Self::Dpi3 => Some("DPI #3"),
            Self::Dpi4 => Some("DPI #4"),
            Self::DpiShift => Some("DPI Shift"),
            Self::Left => Some("Left Click (But1)"),
            Self::Right => Some("Right Click (But2)"),
            Self::Middle => Some("Middle Click (But3)"),
            Self::G4 => Some("G4"),
            Self::G5 => Some("G5"),
            Self::G6 => Some("G6"),
            Self::G7 => Some("G7"),
            Self::G8 => Some("G8"),
            Self::G9 => Some("G9"),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.label() == Some(label))
    }

    /// Whether the front-ends let the user change this field.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Color | Self::Rate) || self.is_button()
    }

    pub fn is_button(&self) -> bool {
        Self::BUTTONS.contains(self)
    }

    /// Whether the field is passed to `--modify`.
    ///
    /// DPI shift is read-only: the tool reports it but it is never written back.
    pub fn is_modifiable(&self) -> bool {
        !matches!(self, Self::Name | Self::DpiShift)
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.column() == wanted)
            .ok_or_else(|| Error::InvalidField(s.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// All settings of one profile, as the tool prints them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub name: ProfileId,
    pub color: String,
    pub rate: String,
    pub dpi1: String,
    pub dpi2: String,
    pub dpi3: String,
    pub dpi4: String,
    pub dpi_shift: String,
    pub left: String,
    pub right: String,
    pub middle: String,
    pub g4: String,
    pub g5: String,
    pub g6: String,
    pub g7: String,
    pub g8: String,
    pub g9: String,
}

impl ProfileSettings {
    /// A profile with every value empty.
    pub fn empty(name: ProfileId) -> Self {
        Self {
            name,
            color: String::new(),
            rate: String::new(),
            dpi1: String::new(),
            dpi2: String::new(),
            dpi3: String::new(),
            dpi4: String::new(),
            dpi_shift: String::new(),
            left: String::new(),
            right: String::new(),
            middle: String::new(),
            g4: String::new(),
            g5: String::new(),
            g6: String::new(),
            g7: String::new(),
            g8: String::new(),
            g9: String::new(),
        }
    }

    /// The settings a G300 ships with.
    pub fn factory_defaults(id: ProfileId) -> Self {
        let values: [&str; 16] = match id {
            ProfileId::F3 => [
                "cyan", "500", "500", "(DEF) 1000", "1500", "2500", "NOT SET", "Button1",
                "Button2", "Button3", "Button6", "Button7", "LeftCtrl +", "LeftAlt +",
                "ModeSwitch", "DPICycle",
            ],
            ProfileId::F4 => [
                "white", "1000", "500", "(DEF) 1000", "1500", "2500", "500", "Button1",
                "Button2", "Button3", "Button6", "Button7", "DPIDown", "DPIUp", "ModeSwitch",
                "DPIShift",
            ],
            ProfileId::F5 => [
                "blue", "500", "(DEF) 1000", "1000", "1000", "1000", "NOT SET", "Button1",
                "Button2", "Button3", "Button6", "Button7", "LeftCtrl + C", "LeftCtrl + V",
                "ModeSwitch", "LeftCtrl + X",
            ],
        };

        let mut settings = Self::empty(id);
        for (field, value) in Field::ALL[1..].iter().zip(values) {
            if let Some(slot) = settings.value_mut(*field) {
                *slot = value.to_string();
            }
        }
        settings
    }

    /// Value of a column. `Name` yields the canonical profile name.
    pub fn get(&self, field: Field) -> &str {
        self.value(field)
    }

    /// Overwrite a column. Setting `Name` is rejected.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> Result<()> {
        let slot = self.value_mut(field).ok_or(Error::NotEditable(field))?;
        *slot = value.into();
        Ok(())
    }

    fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => self.name.as_str(),
            Field::Color => &self.color,
            Field::Rate => &self.rate,
            Field::Dpi1 => &self.dpi1,
            Field::Dpi2 => &self.dpi2,
            Field::Dpi3 => &self.dpi3,
            Field::Dpi4 => &self.dpi4,
            Field::DpiShift => &self.dpi_shift,
            Field::Left => &self.left,
            Field::Right => &self.right,
            Field::Middle => &self.middle,
            Field::G4 => &self.g4,
            Field::G5 => &self.g5,
            Field::G6 => &self.g6,
            Field::G7 => &self.g7,
            Field::G8 => &self.g8,
            Field::G9 => &self.g9,
        }
    }

    fn value_mut(&mut self, field: Field) -> Option<&mut String> {
        let slot = match field {
            Field::Name => return None,
            Field::Color => &mut self.color,
            Field::Rate => &mut self.rate,
            Field::Dpi1 => &mut self.dpi1,
            Field::Dpi2 => &mut self.dpi2,
            Field::Dpi3 => &mut self.dpi3,
            Field::Dpi4 => &mut self.dpi4,
            Field::DpiShift => &mut self.dpi_shift,
            Field::Left => &mut self.left,
            Field::Right => &mut self.right,
            Field::Middle => &mut self.middle,
            Field::G4 => &mut self.g4,
            Field::G5 => &mut self.g5,
            Field::G6 => &mut self.g6,
            Field::G7 => &mut self.g7,
            Field::G8 => &mut self.g8,
            Field::G9 => &mut self.g9,
        };
        Some(slot)
    }

    /// Fields where `desired` differs from `self`, restricted to what `--modify` accepts.
    ///
    /// Values compare case-insensitively and ignoring whitespace, matching how
    /// they are sent to the tool.
    pub fn difference(&self, desired: &ProfileSettings) -> Vec<(Field, String)> {
        Field::ALL
            .iter()
            .copied()
            .filter(|field| field.is_modifiable())
            .filter(|field| !values_match(self.get(*field), desired.get(*field)))
            .map(|field| (field, desired.get(field).to_string()))
            .collect()
    }
}

/// Remove all whitespace, the form ratslap expects on its command line.
pub fn compact_value(value: &str) -> String {
    value.split_whitespace().collect()
}

fn values_match(a: &str, b: &str) -> bool {
    compact_value(a).eq_ignore_ascii_case(&compact_value(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_id_parses_variants() {
        assert_eq!("3".parse::<ProfileId>().unwrap(), ProfileId::F3);
        assert_eq!("f4".parse::<ProfileId>().unwrap(), ProfileId::F4);
        assert_eq!("F5".parse::<ProfileId>().unwrap(), ProfileId::F5);
        assert_eq!(" f3 ".parse::<ProfileId>().unwrap(), ProfileId::F3);
    }

    #[test]
    fn profile_id_rejects_unknown() {
        assert!("f6".parse::<ProfileId>().is_err());
        assert!("2".parse::<ProfileId>().is_err());
        assert!("all".parse::<ProfileId>().is_err());
        for odd in ["+3", "f+4", "F05", "003", "ff3"] {
            assert!(odd.parse::<ProfileId>().is_err(), "{odd:?} accepted");
        }
        assert!("".parse::<ProfileId>().is_err());
    }

    #[test]
    fn profile_id_display_and_str() {
        assert_eq!(ProfileId::F4.as_str(), "f4");
        assert_eq!(ProfileId::F4.to_string(), "F4");
    }

    #[test]
    fn field_labels_are_unique_and_resolvable() {
        for field in &Field::ALL[1..] {
            let label = field.label().unwrap();
            assert_eq!(Field::from_label(label), Some(*field));
        }
        assert_eq!(Field::Name.label(), None);
    }

    #[test]
    fn field_parses_column_names() {
        assert_eq!("dpi_shift".parse::<Field>().unwrap(), Field::DpiShift);
        assert_eq!("dpi-shift".parse::<Field>().unwrap(), Field::DpiShift);
        assert_eq!("G9".parse::<Field>().unwrap(), Field::G9);
        assert!("colour".parse::<Field>().is_err());
    }

    #[test]
    fn editable_fields() {
        assert!(Field::Color.is_editable());
        assert!(Field::Rate.is_editable());
        assert!(Field::G7.is_editable());
        assert!(!Field::Dpi1.is_editable());
        assert!(!Field::DpiShift.is_editable());
        assert!(!Field::Name.is_editable());
    }

    #[test]
    fn factory_defaults_fill_every_field() {
        for id in ProfileId::ALL {
            let defaults = ProfileSettings::factory_defaults(*id);
            assert_eq!(defaults.name, *id);
            for field in Field::ALL {
                assert!(!defaults.get(*field).is_empty(), "{id} {field} empty");
            }
        }
        let f4 = ProfileSettings::factory_defaults(ProfileId::F4);
        assert_eq!(f4.color, "white");
        assert_eq!(f4.dpi_shift, "500");
        assert_eq!(f4.g9, "DPIShift");
    }

    #[test]
    fn set_rejects_name() {
        let mut settings = ProfileSettings::empty(ProfileId::F3);
        assert!(settings.set(Field::Name, "f4").is_err());
        settings.set(Field::G6, "LeftCtrl + Z").unwrap();
        assert_eq!(settings.g6, "LeftCtrl + Z");
    }

    #[test]
    fn difference_ignores_case_whitespace_and_dpi_shift() {
        let current = ProfileSettings::factory_defaults(ProfileId::F3);
        let mut desired = current.clone();
        desired.color = "Cyan".into();
        desired.g6 = "LeftCtrl+".into();
        desired.dpi_shift = "1000".into();
        assert!(current.difference(&desired).is_empty());

        desired.rate = "1000".into();
        desired.g9 = "DPIUp".into();
        let diff = current.difference(&desired);
        assert_eq!(
            diff,
            vec![(Field::Rate, "1000".to_string()), (Field::G9, "DPIUp".to_string())]
        );
    }

    #[test]
    fn compact_value_strips_whitespace() {
        assert_eq!(compact_value("LeftCtrl + C"), "LeftCtrl+C");
        assert_eq!(compact_value("(DEF) 1000"), "(DEF)1000");
    }
}
