//! Parameter declarations and validated parameter storage.
//!
//! Each stage type declares its parameters in a static [`ParamDecl`] table,
//! the same way ports are declared. A [`ParamSet`] holds the current values
//! for one stage instance and rejects writes that fail the declaration's
//! range/choice validation.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Declared constraints for one parameter.
#[derive(Debug, Clone)]
pub enum ParamSpec {
    /// Integer with inclusive bounds; values must sit on the `min + k*step`
    /// grid (a step of 2 from an odd minimum yields odd-only values, as the
    /// kernel-size parameters require).
    Int {
        min: i64,
        max: i64,
        step: i64,
        default: i64,
    },
    Float {
        min: f64,
        max: f64,
        default: f64,
    },
    Choice {
        choices: &'static [&'static str],
        default: &'static str,
    },
    Bool {
        default: bool,
    },
    /// `#rrggbb` hex colour.
    Color {
        default: &'static str,
    },
    FilePath {
        default: &'static str,
    },
}

/// Static descriptor for a stage parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: &'static str,
    pub spec: ParamSpec,
}

impl ParamDecl {
    pub const fn int(name: &'static str, min: i64, max: i64, step: i64, default: i64) -> Self {
        Self {
            name,
            spec: ParamSpec::Int {
                min,
                max,
                step,
                default,
            },
        }
    }

    pub const fn float(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            spec: ParamSpec::Float { min, max, default },
        }
    }

    pub const fn choice(
        name: &'static str,
        choices: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            spec: ParamSpec::Choice { choices, default },
        }
    }

    pub const fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            spec: ParamSpec::Bool { default },
        }
    }

    pub const fn color(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            spec: ParamSpec::Color { default },
        }
    }

    pub const fn file_path(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            spec: ParamSpec::FilePath { default },
        }
    }
}

/// A current parameter value. Serializes as a plain JSON scalar so saved
/// parameter files stay human-editable and round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamSpec {
    pub fn default_value(&self) -> ParamValue {
        match self {
            ParamSpec::Int { default, .. } => ParamValue::Int(*default),
            ParamSpec::Float { default, .. } => ParamValue::Float(*default),
            ParamSpec::Choice { default, .. } => ParamValue::Str((*default).to_string()),
            ParamSpec::Bool { default } => ParamValue::Bool(*default),
            ParamSpec::Color { default } => ParamValue::Str((*default).to_string()),
            ParamSpec::FilePath { default } => ParamValue::Str((*default).to_string()),
        }
    }

    /// Validates `value` against this declaration, returning the canonical
    /// value to store (integers offered to float parameters are coerced).
    pub fn validate(&self, value: &ParamValue) -> std::result::Result<ParamValue, String> {
        match (self, value) {
            (ParamSpec::Int { min, max, step, .. }, ParamValue::Int(v)) => {
                if v < min || v > max {
                    return Err(format!("{v} is outside {min}..={max}"));
                }
                if *step > 1 && (v - min) % step != 0 {
                    return Err(format!("{v} is not on the {min}+k*{step} grid"));
                }
                Ok(ParamValue::Int(*v))
            }
            (ParamSpec::Float { min, max, .. }, ParamValue::Float(v)) => {
                if !v.is_finite() || v < min || v > max {
                    return Err(format!("{v} is outside {min}..={max}"));
                }
                Ok(ParamValue::Float(*v))
            }
            (ParamSpec::Float { .. }, ParamValue::Int(v)) => {
                self.validate(&ParamValue::Float(*v as f64))
            }
            (ParamSpec::Choice { choices, .. }, ParamValue::Str(s)) => {
                if choices.contains(&s.as_str()) {
                    Ok(ParamValue::Str(s.clone()))
                } else {
                    Err(format!("'{s}' is not one of {choices:?}"))
                }
            }
            (ParamSpec::Bool { .. }, ParamValue::Bool(b)) => Ok(ParamValue::Bool(*b)),
            (ParamSpec::Color { .. }, ParamValue::Str(s)) => match parse_color(s) {
                Some(_) => Ok(ParamValue::Str(s.clone())),
                None => Err(format!("'{s}' is not a #rrggbb colour")),
            },
            (ParamSpec::FilePath { .. }, ParamValue::Str(s)) => Ok(ParamValue::Str(s.clone())),
            _ => Err(format!("wrong value type for this parameter: {value:?}")),
        }
    }
}

/// Parses a `#rrggbb` hex string into RGB components.
pub fn parse_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Validated parameter values for one stage instance.
///
/// Storage is a vector parallel to the declaration table; lookups are by
/// declared name. Accessors return `InvalidParameter` rather than panicking
/// so stage `compute` bodies can use `?` throughout.
#[derive(Debug)]
pub struct ParamSet {
    decls: &'static [ParamDecl],
    values: Vec<ParamValue>,
}

impl ParamSet {
    pub fn from_decls(decls: &'static [ParamDecl]) -> Self {
        let values = decls.iter().map(|d| d.spec.default_value()).collect();
        Self { decls, values }
    }

    pub fn decls(&self) -> &'static [ParamDecl] {
        self.decls
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.decls.iter().position(|d| d.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.position(name).map(|i| &self.values[i])
    }

    /// Validates a value against its declaration without storing it.
    pub fn check(&self, stage: &str, name: &str, value: &ParamValue) -> Result<()> {
        let Some(idx) = self.position(name) else {
            return Err(PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: name.to_string(),
                detail: "no such parameter".to_string(),
            });
        };
        self.decls[idx]
            .spec
            .validate(value)
            .map(|_| ())
            .map_err(|detail| PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: name.to_string(),
                detail,
            })
    }

    /// Validates and stores a value. `stage` is only used for error context.
    pub fn set(&mut self, stage: &str, name: &str, value: ParamValue) -> Result<()> {
        let Some(idx) = self.position(name) else {
            return Err(PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: name.to_string(),
                detail: "no such parameter".to_string(),
            });
        };
        match self.decls[idx].spec.validate(&value) {
            Ok(canonical) => {
                self.values[idx] = canonical;
                Ok(())
            }
            Err(detail) => Err(PipelineError::InvalidParameter {
                stage: stage.to_string(),
                param: name.to_string(),
                detail,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> + '_ {
        self.decls
            .iter()
            .zip(self.values.iter())
            .map(|(d, v)| (d.name, v))
    }

    fn lookup(&self, name: &str) -> Result<&ParamValue> {
        self.get(name).ok_or_else(|| PipelineError::InvalidParameter {
            stage: String::new(),
            param: name.to_string(),
            detail: "no such parameter".to_string(),
        })
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.lookup(name)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.lookup(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        match self.lookup(name)? {
            ParamValue::Str(s) => Ok(s.as_str()),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.lookup(name)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(wrong_type(name, other)),
        }
    }

    pub fn color(&self, name: &str) -> Result<[u8; 3]> {
        let s = self.str(name)?;
        parse_color(s).ok_or_else(|| PipelineError::InvalidParameter {
            stage: String::new(),
            param: name.to_string(),
            detail: format!("'{s}' is not a #rrggbb colour"),
        })
    }
}

fn wrong_type(name: &str, value: &ParamValue) -> PipelineError {
    PipelineError::InvalidParameter {
        stage: String::new(),
        param: name.to_string(),
        detail: format!("unexpected value type {value:?}"),
    }
}
