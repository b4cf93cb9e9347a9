use serde_json::{Number, Value};

use crate::status::StatusHooks;

/// A decoded `set` command. Each field is already coerced to its wire domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetCommand {
    pub power: Option<bool>,
    pub brightness: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    Malformed,
    MissingType,
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Set(SetCommand),
    Ignored(IgnoreReason),
}

/// Which mutators a command actually reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    pub power: bool,
    pub brightness: bool,
}

impl Applied {
    pub fn any(self) -> bool {
        self.power || self.brightness
    }
}

pub fn decode_command(raw: &[u8]) -> Decoded {
    let Ok(value) = serde_json::from_slice::<Value>(raw) else {
        return Decoded::Ignored(IgnoreReason::Malformed);
    };
    let Value::Object(fields) = value else {
        return Decoded::Ignored(IgnoreReason::MissingType);
    };
    match fields.get("type").and_then(Value::as_str) {
        Some("set") => {}
        Some(other) => return Decoded::Ignored(IgnoreReason::UnknownType(other.to_string())),
        None => return Decoded::Ignored(IgnoreReason::MissingType),
    }

    Decoded::Set(SetCommand {
        power: fields.get("on").map(coerce_power),
        brightness: fields.get("b").map(coerce_brightness),
    })
}

/// Invokes each present field's writer at most once.
pub fn apply_command(status: &StatusHooks, command: SetCommand) -> Applied {
    Applied {
        power: command.power.is_some_and(|on| status.power.write(on)),
        brightness: command
            .brightness
            .is_some_and(|level| status.brightness.write(level)),
    }
}

pub fn coerce_power(value: &Value) -> bool {
    match value {
        Value::Bool(on) => *on,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.parse::<f64>().is_ok_and(|v| v != 0.0)
        }
        _ => false,
    }
}

/// Reduces any JSON value to 0..=255 by wrapping at the 8-bit boundary.
pub fn coerce_brightness(value: &Value) -> u8 {
    match value {
        Value::Number(n) => wrap_number(n),
        Value::Bool(on) => u8::from(*on),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(wrap_integer)
                .or_else(|_| s.parse::<f64>().map(wrap_float))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn wrap_number(n: &Number) -> u8 {
    if let Some(v) = n.as_i64() {
        return wrap_integer(v);
    }
    if let Some(v) = n.as_u64() {
        return v as u8;
    }
    n.as_f64().map_or(0, wrap_float)
}

fn wrap_integer(v: i64) -> u8 {
    v as u8
}

fn wrap_float(v: f64) -> u8 {
    wrap_integer(v.trunc() as i64)
}

#[cfg(test)]
#[path = "tests/decoder_tests.rs"]
mod tests;
