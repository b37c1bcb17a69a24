//! Gameplay modifiers and the required-modifier predicate of a challenge map.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Error parsing a modifier or modifier requirement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseModError {
    /// Empty acronym.
    #[error("empty mod acronym")]
    Empty,
    /// Acronym contains characters other than ASCII letters and digits.
    #[error("invalid mod acronym: {0}")]
    Invalid(String),
    /// A concatenated mod list did not split into two-letter acronyms.
    #[error("mod list has odd length: {0}")]
    OddLength(String),
}

/// A single gameplay modifier, identified by its two-letter acronym.
///
/// Unknown acronyms are preserved as [`Mod::Other`] so scores coming from a
/// newer API revision still round-trip through storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mod {
    NoFail,
    Easy,
    TouchDevice,
    Hidden,
    HardRock,
    SuddenDeath,
    DoubleTime,
    Relax,
    HalfTime,
    Nightcore,
    Flashlight,
    SpunOut,
    Perfect,
    Other(String),
}

impl Mod {
    /// Two-letter acronym as used by the score API.
    pub fn acronym(&self) -> &str {
        match self {
            Self::NoFail => "NF",
            Self::Easy => "EZ",
            Self::TouchDevice => "TD",
            Self::Hidden => "HD",
            Self::HardRock => "HR",
            Self::SuddenDeath => "SD",
            Self::DoubleTime => "DT",
            Self::Relax => "RX",
            Self::HalfTime => "HT",
            Self::Nightcore => "NC",
            Self::Flashlight => "FL",
            Self::SpunOut => "SO",
            Self::Perfect => "PF",
            Self::Other(acronym) => acronym,
        }
    }

    /// The mod this one counts as when checking requirements.
    ///
    /// Nightcore counts as DoubleTime and Perfect as SuddenDeath.
    pub fn canonical(&self) -> Self {
        match self {
            Self::Nightcore => Self::DoubleTime,
            Self::Perfect => Self::SuddenDeath,
            other => other.clone(),
        }
    }
}

impl FromStr for Mod {
    type Err = ParseModError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseModError::Empty);
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseModError::Invalid(s.to_string()));
        }

        Ok(match s.to_ascii_uppercase().as_str() {
            "NF" => Self::NoFail,
            "EZ" => Self::Easy,
            "TD" => Self::TouchDevice,
            "HD" => Self::Hidden,
            "HR" => Self::HardRock,
            "SD" => Self::SuddenDeath,
            "DT" => Self::DoubleTime,
            "RX" => Self::Relax,
            "HT" => Self::HalfTime,
            "NC" => Self::Nightcore,
            "FL" => Self::Flashlight,
            "SO" => Self::SpunOut,
            "PF" => Self::Perfect,
            other => Self::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for Mod {
    type Error = ParseModError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mod> for String {
    fn from(value: Mod) -> Self {
        value.acronym().to_string()
    }
}

impl fmt::Display for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.acronym())
    }
}

/// Sorted, de-duplicated set of mods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModSet(Vec<Mod>);

impl ModSet {
    /// Empty set (no mod).
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, m: &Mod) -> bool {
        self.0.binary_search(m).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mod> {
        self.0.iter()
    }

    /// Set with every mod replaced by its [`Mod::canonical`] form.
    pub fn canonical(&self) -> Self {
        self.0.iter().map(Mod::canonical).collect()
    }

    /// Returns true if every mod of `other` is in `self`.
    pub fn is_superset(&self, other: &ModSet) -> bool {
        other.iter().all(|m| self.contains(m))
    }
}

impl FromIterator<Mod> for ModSet {
    fn from_iter<I: IntoIterator<Item = Mod>>(iter: I) -> Self {
        let mut mods: Vec<Mod> = iter.into_iter().collect();
        mods.sort();
        mods.dedup();
        Self(mods)
    }
}

impl From<&[Mod]> for ModSet {
    fn from(mods: &[Mod]) -> Self {
        mods.iter().cloned().collect()
    }
}

impl FromStr for ModSet {
    type Err = ParseModError;

    /// Parses concatenated acronyms (`"HDHR"`), optionally separated by
    /// commas, spaces or `+`. `"NM"` and the empty string are the empty set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !matches!(c, ',' | ' ' | '+'))
            .collect();

        if compact.is_empty() || compact.eq_ignore_ascii_case("NM") {
            return Ok(Self::empty());
        }
        if !compact.is_ascii() {
            return Err(ParseModError::Invalid(s.to_string()));
        }
        if compact.len() % 2 != 0 {
            return Err(ParseModError::OddLength(s.to_string()));
        }

        compact
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).parse::<Mod>())
            .collect()
    }
}

impl fmt::Display for ModSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("NM");
        }
        for m in &self.0 {
            f.write_str(m.acronym())?;
        }
        Ok(())
    }
}

/// Required-modifier predicate attached to a challenge map.
///
/// The string form doubles as the friendly label shown to players and as the
/// configuration syntax:
///
/// | form | meaning |
/// |---|---|
/// | `Freemod` | any mods |
/// | `NM` | no mods at all |
/// | `HDHR` | exactly these mods |
/// | `HD+` | at least these mods |
///
/// Nightcore satisfies DoubleTime and Perfect satisfies SuddenDeath.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModRequirement {
    #[default]
    Any,
    NoMod,
    Exact(ModSet),
    Include(ModSet),
}

impl ModRequirement {
    /// Returns true if a score with `mods` qualifies.
    pub fn is_satisfied_by(&self, mods: &[Mod]) -> bool {
        let applied = ModSet::from(mods).canonical();
        match self {
            Self::Any => true,
            Self::NoMod => applied.is_empty(),
            Self::Exact(required) => applied == required.canonical(),
            Self::Include(required) => applied.is_superset(&required.canonical()),
        }
    }
}

impl FromStr for ModRequirement {
    type Err = ParseModError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty()
            || s.eq_ignore_ascii_case("freemod")
            || s.eq_ignore_ascii_case("any")
            || s.eq_ignore_ascii_case("FM")
        {
            return Ok(Self::Any);
        }
        if s.eq_ignore_ascii_case("NM") || s.eq_ignore_ascii_case("nomod") {
            return Ok(Self::NoMod);
        }

        match s.strip_suffix('+') {
            Some(prefix) => Ok(Self::Include(prefix.parse()?)),
            None => {
                let set: ModSet = s.parse()?;
                if set.is_empty() {
                    Ok(Self::NoMod)
                } else {
                    Ok(Self::Exact(set))
                }
            }
        }
    }
}

impl TryFrom<String> for ModRequirement {
    type Error = ParseModError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModRequirement> for String {
    fn from(value: ModRequirement) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Freemod"),
            Self::NoMod => f.write_str("NM"),
            Self::Exact(set) => write!(f, "{set}"),
            Self::Include(set) => write!(f, "{set}+"),
        }
    }
}
