//! Engine options

use crate::error::{BridgeError, BridgeResult};
use once_cell::sync::Lazy;
use std::fmt;

pub const HASH: &str = "Hash";
pub const CLEAR_HASH: &str = "Clear Hash";
pub const THREADS: &str = "Threads";
pub const PONDER: &str = "Ponder";
pub const OWN_BOOK: &str = "OwnBook";
pub const BOOK_FILE: &str = "Book File";
pub const MOVE_OVERHEAD: &str = "Move Overhead";
pub const MINIMUM_THINKING_TIME: &str = "Minimum Thinking Time";
pub const CHESS960: &str = "UCI_Chess960";
pub const CONTEMPT: &str = "Contempt";
pub const SKILL_LEVEL: &str = "Skill Level";

/// Sentinel used on the wire for an empty string value
const EMPTY_STRING: &str = "<empty>";

/// Option types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    /// Checkbox option
    Check { default: bool },

    /// Spin (numeric) option
    Spin { default: i64, min: i64, max: i64 },

    /// Combo (dropdown) option
    Combo { default: String, vars: Vec<String> },

    /// Free text option
    String { default: String },

    /// Button option (action trigger)
    Button,
}

impl OptionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionKind::Check { .. } => "check",
            OptionKind::Spin { .. } => "spin",
            OptionKind::Combo { .. } => "combo",
            OptionKind::String { .. } => "string",
            OptionKind::Button => "button",
        }
    }

    fn default_value(&self) -> OptionValue {
        match self {
            OptionKind::Check { default } => OptionValue::Bool(*default),
            OptionKind::Spin { default, .. } => OptionValue::Int(*default),
            OptionKind::Combo { default, .. } | OptionKind::String { default } => {
                OptionValue::Text(default.clone())
            }
            OptionKind::Button => OptionValue::None,
        }
    }
}

/// Current value of an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    /// Buttons carry no value
    None,
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Text(s) if s.is_empty() => f.write_str(EMPTY_STRING),
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::None => Ok(()),
        }
    }
}

/// A registered option and its current value.
///
/// This is also the read-only view handed out by [`OptionRegistry::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOption {
    pub name: String,
    pub kind: OptionKind,
    pub value: OptionValue,
}

impl EngineOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        let value = kind.default_value();
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    /// Create a check option
    pub fn check(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, OptionKind::Check { default })
    }

    /// Create a spin option
    pub fn spin(name: impl Into<String>, default: i64, min: i64, max: i64) -> Self {
        Self::new(name, OptionKind::Spin { default, min, max })
    }

    /// Create a combo option
    pub fn combo(name: impl Into<String>, default: &str, vars: &[&str]) -> Self {
        Self::new(
            name,
            OptionKind::Combo {
                default: default.to_string(),
                vars: vars.iter().map(|v| v.to_string()).collect(),
            },
        )
    }

    /// Create a string option
    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(
            name,
            OptionKind::String {
                default: default.into(),
            },
        )
    }

    /// Create a button option
    pub fn button(name: impl Into<String>) -> Self {
        Self::new(name, OptionKind::Button)
    }

    /// Validate `raw` against this option's domain without storing it.
    fn validate(&self, raw: &str) -> BridgeResult<OptionValue> {
        let raw = raw.trim();
        let invalid = |reason: String| BridgeError::invalid_value(&self.name, raw, reason);

        match &self.kind {
            OptionKind::Check { .. } => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(OptionValue::Bool(true)),
                "false" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid("expected true or false".to_string())),
            },
            OptionKind::Spin { min, max, .. } => {
                let n: i64 = raw
                    .parse()
                    .map_err(|_| invalid("expected an integer".to_string()))?;
                if n < *min || n > *max {
                    return Err(invalid(format!("out of range {min}..={max}")));
                }
                Ok(OptionValue::Int(n))
            }
            OptionKind::Combo { vars, .. } => vars
                .iter()
                .find(|v| v.eq_ignore_ascii_case(raw))
                .map(|v| OptionValue::Text(v.clone()))
                .ok_or_else(|| invalid(format!("expected one of {}", vars.join(", ")))),
            OptionKind::String { .. } => {
                if raw == EMPTY_STRING {
                    Ok(OptionValue::Text(String::new()))
                } else {
                    Ok(OptionValue::Text(raw.to_string()))
                }
            }
            OptionKind::Button => Ok(OptionValue::None),
        }
    }
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option name {} type {}", self.name, self.kind.type_name())?;
        match &self.kind {
            OptionKind::Check { default } => write!(f, " default {default}"),
            OptionKind::Spin { default, min, max } => {
                write!(f, " default {default} min {min} max {max}")
            }
            OptionKind::Combo { default, vars } => {
                write!(f, " default {default}")?;
                for var in vars {
                    write!(f, " var {var}")?;
                }
                Ok(())
            }
            OptionKind::String { default } if default.is_empty() => {
                write!(f, " default {EMPTY_STRING}")
            }
            OptionKind::String { default } => write!(f, " default {default}"),
            OptionKind::Button => Ok(()),
        }
    }
}

static DEFAULTS: Lazy<OptionRegistry> = Lazy::new(OptionRegistry::build_defaults);

/// Ordered, case-insensitive option table.
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    options: Vec<EngineOption>,
    presses: Vec<u64>,
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl OptionRegistry {
    pub fn empty() -> Self {
        Self {
            options: Vec::new(),
            presses: Vec::new(),
        }
    }

    /// Registry holding the options every engine session starts with
    pub fn with_defaults() -> Self {
        DEFAULTS.clone()
    }

    fn build_defaults() -> Self {
        let mut registry = Self::empty();
        for option in [
            EngineOption::spin(HASH, 16, 1, 33_554_432),
            EngineOption::button(CLEAR_HASH),
            EngineOption::spin(THREADS, 1, 1, 512),
            EngineOption::check(PONDER, false),
            EngineOption::check(OWN_BOOK, false),
            EngineOption::string(BOOK_FILE, "book.bin"),
            EngineOption::spin(MOVE_OVERHEAD, 30, 0, 5000),
            EngineOption::spin(MINIMUM_THINKING_TIME, 20, 0, 5000),
            EngineOption::check(CHESS960, false),
            EngineOption::spin(CONTEMPT, 0, -100, 100),
            EngineOption::spin(SKILL_LEVEL, 20, 0, 20),
        ] {
            registry.register(option);
        }
        registry
    }

    /// Add an option, replacing any option with the same name in place.
    pub fn register(&mut self, option: EngineOption) {
        match self.position_of(&option.name) {
            Some(idx) => {
                self.options[idx] = option;
                self.presses[idx] = 0;
            }
            None => {
                self.options.push(option);
                self.presses.push(0);
            }
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.options
            .iter()
            .position(|o| o.name.eq_ignore_ascii_case(name))
    }

    fn index(&self, name: &str) -> BridgeResult<usize> {
        self.position_of(name).ok_or_else(|| BridgeError::UnknownOption {
            name: name.trim().to_string(),
        })
    }

    pub fn get(&self, name: &str) -> BridgeResult<&EngineOption> {
        Ok(&self.options[self.index(name)?])
    }

    /// All options in registration order
    pub fn snapshot(&self) -> Vec<EngineOption> {
        self.options.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.options.iter()
    }

    /// Validate and store a value. Out-of-domain values are rejected, never
    /// clamped; the stored value is unchanged on error.
    pub fn set(&mut self, name: &str, raw: &str) -> BridgeResult<()> {
        let idx = self.index(name)?;
        let value = self.options[idx].validate(raw)?;
        let option = &mut self.options[idx];
        if matches!(option.kind, OptionKind::Button) {
            self.presses[idx] += 1;
            log::debug!("Option '{}' pressed", option.name);
        } else {
            log::debug!("Option '{}' set to {value}", option.name);
            option.value = value;
        }
        Ok(())
    }

    /// Number of times a button option was pressed
    pub fn presses(&self, name: &str) -> u64 {
        self.position_of(name).map_or(0, |idx| self.presses[idx])
    }

    pub fn spin(&self, name: &str) -> Option<i64> {
        match self.get(name).ok()?.value {
            OptionValue::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn check(&self, name: &str) -> Option<bool> {
        match self.get(name).ok()?.value {
            OptionValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match &self.get(name).ok()?.value {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }
}
