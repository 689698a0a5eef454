use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Parameter coercion failure.
///
/// Raised when a stored value cannot be converted to the requested type,
/// e.g. an expression read as a number or a negative integer read as unsigned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert parameter '{letter}' value {stored:?} to {requested}")]
pub struct TypeMismatch {
    /// The parameter letter.
    pub letter: char,
    /// The requested target type.
    pub requested: &'static str,
    /// The stored source text that failed to convert.
    pub stored: String,
}

/// A hardware driver address: `(board << 16) | port`, written `b.d`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverId {
    /// CAN board address.
    pub board: u16,
    /// Driver port on the board.
    pub port: u16,
}

impl DriverId {
    /// Create a driver id from board and port numbers.
    pub fn new(board: u16, port: u16) -> DriverId {
        DriverId { board, port }
    }

    /// The combined numeric form `(board << 16) | port`.
    pub fn value(self) -> u32 {
        (u32::from(self.board) << 16) | u32::from(self.port)
    }

    /// Split a combined numeric form back into board and port.
    pub fn from_value(value: u32) -> DriverId {
        DriverId {
            board: (value >> 16) as u16,
            port: (value & 0xFFFF) as u16,
        }
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.board, self.port)
    }
}

impl FromStr for DriverId {
    type Err = ();

    /// Parse `"b.d"` (explicit board) or `"d"` (board 0).
    fn from_str(s: &str) -> Result<DriverId, ()> {
        match s.split_once('.') {
            Some((board, port)) => {
                let board = board.parse().map_err(|_| ())?;
                let port = port.parse().map_err(|_| ())?;
                Ok(DriverId { board, port })
            }
            None => {
                let port = s.parse().map_err(|_| ())?;
                Ok(DriverId { board: 0, port })
            }
        }
    }
}

/// A letter-tagged parameter value.
///
/// The source text is stored verbatim and parsed on demand by the `as_*`
/// coercions; quoted string values are stored decoded (doubled `""` collapsed)
/// with a marker so string and numeric sources stay distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    letter: char,
    raw: String,
    quoted: bool,
}

impl Parameter {
    /// Create a parameter from unquoted source text. The letter is uppercased.
    pub fn new(letter: char, raw: impl Into<String>) -> Parameter {
        Parameter {
            letter: letter.to_ascii_uppercase(),
            raw: raw.into(),
            quoted: false,
        }
    }

    /// Create a parameter holding a decoded quoted-string value.
    pub fn new_string(letter: char, value: impl Into<String>) -> Parameter {
        Parameter {
            letter: letter.to_ascii_uppercase(),
            raw: value.into(),
            quoted: true,
        }
    }

    /// The uppercased parameter letter.
    pub fn letter(&self) -> char {
        self.letter
    }

    /// The stored source text (decoded for quoted strings).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the value came from a quoted string literal.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Whether the value is a `{...}` expression placeholder.
    pub fn is_expression(&self) -> bool {
        !self.quoted && self.raw.starts_with('{')
    }

    fn mismatch(&self, requested: &'static str) -> TypeMismatch {
        TypeMismatch {
            letter: self.letter,
            requested,
            stored: self.raw.clone(),
        }
    }

    /// The value as a signed integer. Empty values read as 0; a stored float
    /// is rounded.
    pub fn as_integer(&self) -> Result<i64, TypeMismatch> {
        if self.is_expression() {
            return Err(self.mismatch("integer"));
        }
        let text = self.raw.trim();
        if text.is_empty() {
            return Ok(0);
        }
        if let Ok(value) = text.parse::<i64>() {
            return Ok(value);
        }
        match text.parse::<f64>() {
            Ok(value) => Ok(value.round() as i64),
            Err(_) => Err(self.mismatch("integer")),
        }
    }

    /// The value as an unsigned integer. Negative values fail.
    pub fn as_unsigned(&self) -> Result<u64, TypeMismatch> {
        let value = self.as_integer().map_err(|mut e| {
            e.requested = "unsigned integer";
            e
        })?;
        u64::try_from(value).map_err(|_| self.mismatch("unsigned integer"))
    }

    /// The value as a float. Empty values read as 0.
    pub fn as_float(&self) -> Result<f64, TypeMismatch> {
        if self.is_expression() {
            return Err(self.mismatch("float"));
        }
        let text = self.raw.trim();
        if text.is_empty() {
            return Ok(0.0);
        }
        text.parse().map_err(|_| self.mismatch("float"))
    }

    /// The value as a boolean: `true`/`false` or a non-zero number.
    pub fn as_bool(&self) -> Result<bool, TypeMismatch> {
        match self.raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                let value = self.as_integer().map_err(|mut e| {
                    e.requested = "bool";
                    e
                })?;
                Ok(value != 0)
            }
        }
    }

    /// The value as a string. Quoted values are returned decoded; numeric
    /// values are reformatted canonically (`005.50` becomes `5.5`);
    /// everything else (including expressions) is returned trimmed.
    pub fn as_string(&self) -> String {
        if self.quoted {
            return self.raw.clone();
        }
        let text = self.raw.trim();
        if !self.is_expression() {
            if let Ok(value) = text.parse::<i64>() {
                return value.to_string();
            }
            if let Ok(value) = text.parse::<f64>() {
                return value.to_string();
            }
        }
        text.to_string()
    }

    /// The value as a signed integer array (colon-separated; scalars become
    /// singletons).
    pub fn as_integer_array(&self) -> Result<Vec<i64>, TypeMismatch> {
        self.parse_array("integer array", |p| p.as_integer())
    }

    /// The value as an unsigned integer array.
    pub fn as_unsigned_array(&self) -> Result<Vec<u64>, TypeMismatch> {
        self.parse_array("unsigned integer array", |p| p.as_unsigned())
    }

    /// The value as a float array.
    pub fn as_float_array(&self) -> Result<Vec<f64>, TypeMismatch> {
        self.parse_array("float array", |p| p.as_float())
    }

    /// The value as a driver id, from `"b.d"` form or a combined integer.
    pub fn as_driver_id(&self) -> Result<DriverId, TypeMismatch> {
        if self.is_expression() {
            return Err(self.mismatch("driver id"));
        }
        let text = self.raw.trim();
        if text.is_empty() {
            return Ok(DriverId::default());
        }
        text.parse().map_err(|()| self.mismatch("driver id"))
    }

    /// The value as a driver id array.
    pub fn as_driver_id_array(&self) -> Result<Vec<DriverId>, TypeMismatch> {
        self.parse_array("driver id array", |p| p.as_driver_id())
    }

    /// Split the raw text on `:` and convert each element. An empty element
    /// (e.g. a trailing `:`) is an error; an entirely empty value yields the
    /// scalar conversion of the empty string as a singleton.
    fn parse_array<T>(
        &self,
        requested: &'static str,
        convert: impl Fn(&Parameter) -> Result<T, TypeMismatch>,
    ) -> Result<Vec<T>, TypeMismatch> {
        if self.is_expression() {
            return Err(self.mismatch(requested));
        }
        let text = self.raw.trim();
        if !text.contains(':') {
            return Ok(vec![convert(self).map_err(|mut e| {
                e.requested = requested;
                e
            })?]);
        }
        let mut values = Vec::new();
        for element in text.split(':') {
            if element.is_empty() {
                return Err(self.mismatch(requested));
            }
            let scalar = Parameter {
                letter: self.letter,
                raw: element.to_string(),
                quoted: self.quoted,
            };
            values.push(convert(&scalar).map_err(|mut e| {
                e.requested = requested;
                e.stored = self.raw.clone();
                e
            })?);
        }
        Ok(values)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.letter != '@' {
            write!(f, "{}", self.letter)?;
        }
        if self.quoted {
            write!(f, "\"{}\"", self.raw.replace('"', "\"\""))
        } else {
            f.write_str(&self.raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_coercions() {
        assert_eq!(Parameter::new('X', "5").as_integer().unwrap(), 5);
        assert_eq!(Parameter::new('H', "-1").as_integer().unwrap(), -1);
        assert_eq!(Parameter::new('X', "").as_integer().unwrap(), 0);
        assert_eq!(Parameter::new('X', "2.6").as_integer().unwrap(), 3);
        assert!(Parameter::new('X', "abc").as_integer().is_err());
    }

    #[test]
    fn unsigned_rejects_negative() {
        assert_eq!(Parameter::new('S', "22").as_unsigned().unwrap(), 22);
        let err = Parameter::new('H', "-1").as_unsigned().unwrap_err();
        assert_eq!(err.letter, 'H');
        assert_eq!(err.requested, "unsigned integer");
    }

    #[test]
    fn float_coercions() {
        assert!((Parameter::new('S', "0.5").as_float().unwrap() - 0.5).abs() < 1e-4);
        assert_eq!(Parameter::new('S', "").as_float().unwrap(), 0.0);
        assert!(Parameter::new('S', "x").as_float().is_err());
    }

    #[test]
    fn bool_coercions() {
        assert!(Parameter::new('P', "1").as_bool().unwrap());
        assert!(!Parameter::new('P', "0").as_bool().unwrap());
        assert!(Parameter::new('P', "true").as_bool().unwrap());
        assert!(!Parameter::new('P', "false").as_bool().unwrap());
    }

    #[test]
    fn string_coercions() {
        assert_eq!(Parameter::new_string('C', "Fancy \" Fan").as_string(), "Fancy \" Fan");
        assert_eq!(Parameter::new('X', " 5 ").as_string(), "5");
    }

    #[test]
    fn string_from_number_is_formatted_canonically() {
        assert_eq!(Parameter::new('X', "005.50").as_string(), "5.5");
        assert_eq!(Parameter::new('X', "+5").as_string(), "5");
        assert_eq!(Parameter::new('X', "-1").as_string(), "-1");
        assert_eq!(Parameter::new('X', "0.5").as_string(), "0.5");
        // Non-numeric unquoted text passes through trimmed.
        assert_eq!(Parameter::new('P', "2:0.3:1.4").as_string(), "2:0.3:1.4");
    }

    #[test]
    fn expressions_fail_numeric_coercions() {
        let parameter = Parameter::new('R', "{move.axes[0].max}");
        assert!(parameter.is_expression());
        assert!(parameter.as_integer().is_err());
        assert!(parameter.as_float().is_err());
        assert!(parameter.as_integer_array().is_err());
        assert_eq!(parameter.as_string(), "{move.axes[0].max}");
    }

    #[test]
    fn quoted_string_is_not_an_expression() {
        let parameter = Parameter::new_string('C', "{not an expression}");
        assert!(!parameter.is_expression());
    }

    #[test]
    fn arrays_split_on_colons() {
        assert_eq!(
            Parameter::new('P', "1:2:3").as_integer_array().unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(Parameter::new('P', "7").as_integer_array().unwrap(), vec![7]);
        assert_eq!(
            Parameter::new('E', "0.4:0.6").as_float_array().unwrap(),
            vec![0.4, 0.6]
        );
    }

    #[test]
    fn trailing_empty_array_element_is_an_error() {
        assert!(Parameter::new('P', "1:2:").as_integer_array().is_err());
        assert!(Parameter::new('P', "1::2").as_integer_array().is_err());
    }

    #[test]
    fn driver_ids() {
        let driver = Parameter::new('P', "1.2").as_driver_id().unwrap();
        assert_eq!(driver, DriverId::new(1, 2));
        assert_eq!(driver.value(), (1 << 16) | 2);
        assert_eq!(Parameter::new('P', "4").as_driver_id().unwrap().value(), 4);
        assert_eq!(DriverId::from_value((3 << 16) | 7), DriverId::new(3, 7));
        assert_eq!(DriverId::new(1, 2).to_string(), "1.2");
    }

    #[test]
    fn driver_id_arrays() {
        let drivers = Parameter::new('P', "2:0.3:1.4").as_driver_id_array().unwrap();
        let values: Vec<u32> = drivers.iter().map(|d| d.value()).collect();
        assert_eq!(values, vec![2, 3, (1 << 16) | 4]);
    }

    #[test]
    fn mismatch_message_names_the_letter() {
        let err = Parameter::new('H', "nope").as_integer().unwrap_err();
        assert_eq!(err.to_string(), "cannot convert parameter 'H' value \"nope\" to integer");
    }
}
