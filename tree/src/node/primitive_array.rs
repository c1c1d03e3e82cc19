use crate::error::TreeError;
use crate::primitive::{Integer, Primitive, PrimitiveKind};

/// Flat storage for a homogeneous run of primitives.
///
/// One vector per kind, so a mixed-kind array cannot be constructed. Mixed
/// sequences belong in an [`ArrayNode`](super::ArrayNode).
///
/// An empty array has no element kind: empty arrays compare equal whatever
/// vector backs them, and convert to any kind on read.
#[derive(Clone, Debug)]
pub enum PrimitiveArray {
    Bool(Vec<bool>),
    Int(Vec<Integer>),
    Float(Vec<f64>),
    String(Vec<String>),
}

impl PrimitiveArray {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveArray::Bool(_) => PrimitiveKind::Bool,
            PrimitiveArray::Int(_) => PrimitiveKind::Int,
            PrimitiveArray::Float(_) => PrimitiveKind::Float,
            PrimitiveArray::String(_) => PrimitiveKind::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Bool(v) => v.len(),
            PrimitiveArray::Int(v) => v.len(),
            PrimitiveArray::Float(v) => v.len(),
            PrimitiveArray::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, boxed as a [`Primitive`].
    pub fn get(&self, index: usize) -> Option<Primitive> {
        match self {
            PrimitiveArray::Bool(v) => v.get(index).map(|x| Primitive::Bool(*x)),
            PrimitiveArray::Int(v) => v.get(index).map(|x| Primitive::Int(*x)),
            PrimitiveArray::Float(v) => v.get(index).map(|x| Primitive::Float(*x)),
            PrimitiveArray::String(v) => v.get(index).map(|x| Primitive::String(x.clone())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Primitive> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Pack a homogeneous list of primitives.
    ///
    /// Returns `None` for an empty list (the kind is unknown), for lists
    /// containing `Null`, and for mixed kinds.
    pub fn from_primitives(values: Vec<Primitive>) -> Option<Self> {
        let kind = values.first()?.kind();
        if values.iter().any(|v| v.kind() != kind) {
            return None;
        }
        macro_rules! collect {
            ($variant:ident) => {
                PrimitiveArray::$variant(
                    values
                        .into_iter()
                        .filter_map(|v| match v {
                            Primitive::$variant(x) => Some(x),
                            _ => None,
                        })
                        .collect(),
                )
            };
        }
        Some(match kind {
            PrimitiveKind::Null => return None,
            PrimitiveKind::Bool => collect!(Bool),
            PrimitiveKind::Int => collect!(Int),
            PrimitiveKind::Float => collect!(Float),
            PrimitiveKind::String => collect!(String),
        })
    }
}

impl PartialEq for PrimitiveArray {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_empty() && b.is_empty() => true,
            (PrimitiveArray::Bool(a), PrimitiveArray::Bool(b)) => a == b,
            (PrimitiveArray::Int(a), PrimitiveArray::Int(b)) => a == b,
            (PrimitiveArray::Float(a), PrimitiveArray::Float(b)) => a == b,
            (PrimitiveArray::String(a), PrimitiveArray::String(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! impl_from_int_vec {
    ($($t:ty),*) => {
        $(
            impl From<Vec<$t>> for PrimitiveArray {
                fn from(v: Vec<$t>) -> Self {
                    PrimitiveArray::Int(v.into_iter().map(Integer::from).collect())
                }
            }
        )*
    };
}

impl_from_int_vec!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<Vec<Integer>> for PrimitiveArray {
    fn from(v: Vec<Integer>) -> Self {
        PrimitiveArray::Int(v)
    }
}

impl From<Vec<f32>> for PrimitiveArray {
    fn from(v: Vec<f32>) -> Self {
        PrimitiveArray::Float(v.into_iter().map(f64::from).collect())
    }
}

impl From<Vec<f64>> for PrimitiveArray {
    fn from(v: Vec<f64>) -> Self {
        PrimitiveArray::Float(v)
    }
}

impl From<Vec<bool>> for PrimitiveArray {
    fn from(v: Vec<bool>) -> Self {
        PrimitiveArray::Bool(v)
    }
}

impl From<Vec<char>> for PrimitiveArray {
    fn from(v: Vec<char>) -> Self {
        PrimitiveArray::String(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for PrimitiveArray {
    fn from(v: Vec<String>) -> Self {
        PrimitiveArray::String(v)
    }
}

impl From<Vec<&str>> for PrimitiveArray {
    fn from(v: Vec<&str>) -> Self {
        PrimitiveArray::String(v.into_iter().map(str::to_owned).collect())
    }
}

/// A compact array node for homogeneous primitive sequences.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveArrayNode {
    pub name: Option<String>,
    pub type_tag: Option<String>,
    pub values: PrimitiveArray,
}

impl PrimitiveArrayNode {
    pub fn new(values: impl Into<PrimitiveArray>) -> Self {
        Self {
            name: None,
            type_tag: None,
            values: values.into(),
        }
    }

    pub fn named(name: impl Into<String>, values: impl Into<PrimitiveArray>) -> Self {
        Self {
            name: Some(name.into()),
            type_tag: None,
            values: values.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_bool_vec(&self) -> Result<Vec<bool>, TreeError> {
        match &self.values {
            PrimitiveArray::Bool(v) => Ok(v.clone()),
            _ => self.convert(Primitive::as_bool),
        }
    }

    pub fn as_i32_vec(&self) -> Result<Vec<i32>, TreeError> {
        self.convert(Primitive::as_i32)
    }

    pub fn as_i64_vec(&self) -> Result<Vec<i64>, TreeError> {
        self.convert(Primitive::as_i64)
    }

    pub fn as_u32_vec(&self) -> Result<Vec<u32>, TreeError> {
        self.convert(Primitive::as_u32)
    }

    pub fn as_u64_vec(&self) -> Result<Vec<u64>, TreeError> {
        self.convert(Primitive::as_u64)
    }

    pub fn as_f32_vec(&self) -> Result<Vec<f32>, TreeError> {
        self.convert(Primitive::as_f32)
    }

    pub fn as_f64_vec(&self) -> Result<Vec<f64>, TreeError> {
        match &self.values {
            PrimitiveArray::Float(v) => Ok(v.clone()),
            _ => self.convert(Primitive::as_f64),
        }
    }

    pub fn as_char_vec(&self) -> Result<Vec<char>, TreeError> {
        self.convert(Primitive::as_char)
    }

    pub fn as_string_vec(&self) -> Result<Vec<String>, TreeError> {
        match &self.values {
            PrimitiveArray::String(v) => Ok(v.clone()),
            _ => self.convert(|p| p.as_str().map(str::to_owned)),
        }
    }

    fn convert<T>(
        &self,
        f: impl Fn(&Primitive) -> Result<T, TreeError>,
    ) -> Result<Vec<T>, TreeError> {
        self.values.iter().map(|p| f(&p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_numeric_kinds() {
        let node = PrimitiveArrayNode::new(vec![1i32, 2, 3]);
        assert_eq!(node.as_i32_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(node.as_u64_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(node.as_f32_vec().unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(node.as_string_vec().is_err());
    }

    #[test]
    fn empty_array_converts_to_any_kind() {
        let node = PrimitiveArrayNode::new(Vec::<i64>::new());
        assert!(node.as_string_vec().unwrap().is_empty());
        assert!(node.as_bool_vec().unwrap().is_empty());
        assert!(node.as_f64_vec().unwrap().is_empty());
    }

    #[test]
    fn empty_arrays_are_equal_across_kinds() {
        assert_eq!(
            PrimitiveArray::from(Vec::<String>::new()),
            PrimitiveArray::from(Vec::<u8>::new())
        );
        assert_ne!(PrimitiveArray::from(vec![1u8]), PrimitiveArray::from(vec![1.0f64]));
    }

    #[test]
    fn from_primitives_requires_one_kind() {
        let same = vec![Primitive::from(1i64), Primitive::from(2u64)];
        assert_eq!(
            PrimitiveArray::from_primitives(same),
            Some(PrimitiveArray::from(vec![1i64, 2]))
        );
        let mixed = vec![Primitive::from(1i64), Primitive::from("x")];
        assert_eq!(PrimitiveArray::from_primitives(mixed), None);
        assert_eq!(PrimitiveArray::from_primitives(vec![Primitive::Null]), None);
        assert_eq!(PrimitiveArray::from_primitives(Vec::new()), None);
    }

    #[test]
    fn chars_are_stored_as_strings() {
        let node = PrimitiveArrayNode::new(vec!['a', 'b']);
        assert_eq!(node.values, PrimitiveArray::from(vec!["a", "b"]));
        assert_eq!(node.as_char_vec().unwrap(), vec!['a', 'b']);
        let strings = PrimitiveArrayNode::new(vec!["x", "yz"]);
        assert!(strings.as_char_vec().is_err());
    }
}
