use std::fmt;
use std::rc::Rc;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::actions::HeyActions;
use crate::environment::Frame;
use crate::error::Result;
use crate::shape::Shape;

/// Dynamic runtime value produced by evaluating a Hey expression.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Color(Color),
    /// Ordered, indexable data: results of `range`, `concat`, `repeat`, ...
    Sequence(Rc<[Value]>),
    Vector(Vector),
    Shape(Rc<Shape>),
    Function(Rc<Function>),
    Builtin(Builtin),
}

impl Value {
    pub fn sequence(values: Vec<Value>) -> Self {
        Value::Sequence(values.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Palette color named by this value.  Color literals and strings that
    /// spell a palette entry both qualify.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            Value::String(s) => Color::from_name(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Rc<[Value]>> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&Rc<Shape>> {
        match self {
            Value::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vector> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Shape(a), Value::Shape(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<Shape> for Value {
    fn from(shape: Shape) -> Self {
        Value::Shape(Rc::new(shape))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => fmt_number(*n, f),

            Value::String(s) => write!(f, "{}", s),

            Value::Color(c) => write!(f, "{}", c),

            Value::Sequence(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    v.fmt_nested(f)?;
                }
                write!(f, "]")
            }

            Value::Vector(v) => write!(f, "{}", v),

            Value::Shape(shape) => write!(f, "{}", shape),

            Value::Function(fun) => write!(f, "{}", fun),

            Value::Builtin(b) => write!(f, "{}", b),
        }
    }
}

/// Integral numbers print without a fractional part.
pub(crate) fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        let mut buf = itoa::Buffer::new();
        f.write_str(buf.format(n as i64))
    } else {
        write!(f, "{}", n)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Color(c) => c.serialize(serializer),
            Value::Sequence(values) => serializer.collect_seq(values.iter()),
            Value::Vector(v) => v.serialize(serializer),
            Value::Shape(shape) => shape.serialize(serializer),
            Value::Function(fun) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("name", "function")?;
                map.serialize_entry("source", &fun.to_string())?;
                map.end()
            }
            Value::Builtin(b) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("name", b.name())?;
                map.serialize_entry("source", &b.to_string())?;
                map.end()
            }
        }
    }
}

// ───────────────────────────── colors ─────────────────────────────

/// The fixed drawing palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Blue,
    Yellow,
    Red,
    Purple,
    Grey,
    Black,
    White,
    Orange,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::Purple => "purple",
            Color::Grey => "grey",
            Color::Black => "black",
            Color::White => "white",
            Color::Orange => "orange",
        }
    }

    pub fn from_name(name: &str) -> Option<Color> {
        let color = match name {
            "green" => Color::Green,
            "blue" => Color::Blue,
            "yellow" => Color::Yellow,
            "red" => Color::Red,
            "purple" => Color::Purple,
            "grey" => Color::Grey,
            "black" => Color::Black,
            "white" => Color::White,
            "orange" => Color::Orange,
            _ => return None,
        };
        Some(color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ───────────────────────────── vectors ────────────────────────────

/// 2‑D displacement, consumed by the geometry layer (e.g. `merge` anchors).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x:")?;
        fmt_number(self.x, f)?;
        write!(f, " y:")?;
        fmt_number(self.y, f)?;
        write!(f, ")")
    }
}

// ──────────────────────────── built‑ins ───────────────────────────

/// Built‑in operations.  Each is also a first‑class value: writing `square`
/// without arguments yields something that can be passed around and called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Builtin {
    Range,
    Square,
    Parallelogram,
    Merge,
    Vector,
    Concat,
    Repeat,
    Slice,
    Length,
    AdaLovelace,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Range => "range",
            Builtin::Square => "square",
            Builtin::Parallelogram => "parallelogram",
            Builtin::Merge => "merge",
            Builtin::Vector => "vector",
            Builtin::Concat => "concat",
            Builtin::Repeat => "repeat",
            Builtin::Slice => "slice",
            Builtin::Length => "length",
            Builtin::AdaLovelace => "ada-lovelace",
        }
    }

    /// Parameter names; the ones past [`Builtin::arity`]'s minimum are optional.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Builtin::Range => &["count", "start", "step"],
            Builtin::Square => &["size", "color", "rotation"],
            Builtin::Parallelogram => &["base", "height", "offset", "color", "rotation"],
            Builtin::Merge => &["shape1", "shape2", "anchor", "rotation"],
            Builtin::Vector => &["x", "y"],
            Builtin::Concat => &["values"],
            Builtin::Repeat => &["data", "count"],
            Builtin::Slice => &["data", "start", "end"],
            Builtin::Length => &["data"],
            Builtin::AdaLovelace => &["n"],
        }
    }

    pub fn arity(self) -> Arity {
        let max = self.params().len();
        match self {
            Builtin::Concat => Arity::at_least(0),
            Builtin::Range | Builtin::Square | Builtin::Merge | Builtin::Slice => {
                Arity::between(2, max)
            }
            Builtin::Parallelogram => Arity::between(4, max),
            Builtin::Vector | Builtin::Repeat | Builtin::Length | Builtin::AdaLovelace => {
                Arity::exactly(max)
            }
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arity = self.arity();
        let params: Vec<String> = self
            .params()
            .iter()
            .enumerate()
            .map(|(i, p)| match arity.max {
                None => format!("{}...", p),
                Some(_) if i >= arity.min => format!("{}?", p),
                Some(_) => p.to_string(),
            })
            .collect();
        let params = params.join(" ");
        write!(f, "({}) -> {}({})", params, self.name(), params)
    }
}

/// Accepted argument counts of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic callables.
    pub max: Option<usize>,
}

impl Arity {
    pub fn exactly(n: usize) -> Self {
        Arity {
            min: n,
            max: Some(n),
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Arity {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: usize) -> Self {
        Arity { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{}-{}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

// ──────────────────────────── functions ───────────────────────────

/// Deferred body of a user function, run against the interpreter state at
/// call time.
pub type Thunk = Rc<dyn Fn(&mut HeyActions) -> Result<Value>>;

/// A user‑defined callable.
pub struct Function {
    /// Identifier the function was bound to by `def`, if any.
    pub name: Option<String>,

    /// Parameter names, fixed at definition time.
    pub params: Vec<String>,

    /// Snapshot of the frames visible where the function was created.
    pub closure: Vec<Frame>,

    pub body: Thunk,

    /// Rendering shown to the user, e.g. `(size) -> square(size green)`.
    pub text: String,
}

impl Function {
    pub fn arity(&self) -> Arity {
        Arity::exactly(self.params.len())
    }

    /// The same callable, bound to `name`.
    pub fn with_name(&self, name: &str) -> Function {
        Function {
            name: Some(name.to_string()),
            params: self.params.clone(),
            closure: self.closure.clone(),
            body: self.body.clone(),
            text: self.text.clone(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("frames", &self.closure.len())
            .field("text", &self.text)
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(12.0).to_string(), "12");
        assert_eq!(Value::Number(-2.5).to_string(), "-2.5");
    }

    #[test]
    fn sequences_quote_nested_strings() {
        let seq = Value::sequence(vec![1.0.into(), "a\"b".into(), Color::Blue.into()]);
        assert_eq!(seq.to_string(), "[1 \"a\"\"b\" blue]");
    }

    #[test]
    fn builtin_renders_its_signature() {
        assert_eq!(
            Builtin::Square.to_string(),
            "(size color rotation?) -> square(size color rotation?)"
        );
        assert_eq!(
            Builtin::Concat.to_string(),
            "(values...) -> concat(values...)"
        );
    }

    #[test]
    fn strings_naming_a_palette_entry_are_colors() {
        assert_eq!(Value::from("red").as_color(), Some(Color::Red));
        assert_eq!(Value::from("transparent").as_color(), None);
    }

    #[test]
    fn arity_ranges() {
        assert!(Builtin::Range.arity().accepts(2));
        assert!(Builtin::Range.arity().accepts(3));
        assert!(!Builtin::Range.arity().accepts(4));
        assert!(Builtin::Concat.arity().accepts(0));
        assert_eq!(Builtin::Range.arity().to_string(), "2-3");
        assert_eq!(Builtin::Length.arity().to_string(), "1");
    }

    #[test]
    fn values_serialize_to_json() {
        let seq = Value::sequence(vec![1.0.into(), Color::Red.into()]);
        assert_eq!(serde_json::to_string(&seq).unwrap(), "[1.0,\"red\"]");
    }
}
