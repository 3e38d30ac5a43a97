use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// One of the available colors for a category.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum CategoryColor {
    Transparent,
    LightBlue,
    Red,
    LightRed,
    Orange,
    Blue,
    Green,
    Purple,
    Yellow,
    Brown,
    Magenta,
    LightGreen,
    Gray,
    DarkGray,
}

impl CategoryColor {
    fn as_str(&self) -> &'static str {
        match self {
            CategoryColor::Transparent => "transparent",
            CategoryColor::LightBlue => "lightblue",
            CategoryColor::Red => "red",
            CategoryColor::LightRed => "lightred",
            CategoryColor::Orange => "orange",
            CategoryColor::Blue => "blue",
            CategoryColor::Green => "green",
            CategoryColor::Purple => "purple",
            CategoryColor::Yellow => "yellow",
            CategoryColor::Brown => "brown",
            CategoryColor::Magenta => "magenta",
            CategoryColor::LightGreen => "lightgreen",
            CategoryColor::Gray => "grey",
            CategoryColor::DarkGray => "darkgray",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        let color = match s {
            "transparent" => CategoryColor::Transparent,
            "lightblue" => CategoryColor::LightBlue,
            "red" => CategoryColor::Red,
            "lightred" => CategoryColor::LightRed,
            "orange" => CategoryColor::Orange,
            "blue" => CategoryColor::Blue,
            "green" => CategoryColor::Green,
            "purple" => CategoryColor::Purple,
            "yellow" => CategoryColor::Yellow,
            "brown" => CategoryColor::Brown,
            "magenta" => CategoryColor::Magenta,
            "lightgreen" => CategoryColor::LightGreen,
            "grey" => CategoryColor::Gray,
            "darkgray" => CategoryColor::DarkGray,
            _ => return None,
        };
        Some(color)
    }
}

impl Serialize for CategoryColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CategoryColor::from_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown category color {s:?}")))
    }
}
