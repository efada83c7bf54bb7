//! Surrogate keys and dictionary-encoded quads

use super::dispatch::{ContextShape, ObjectShape, QuadShape, SubjectShape};
use crate::error::StoreResult;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! surrogate_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                $name(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                $name(id)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($name)
            }
        }
    };
}

surrogate_key!(
    /// Key of an interned URI in the `RESOURCE` table
    ResourceId
);
surrogate_key!(
    /// Key of an interned literal in the `LITERAL` table
    LiteralId
);
surrogate_key!(
    /// Key of an interned blank node in the `BNODE` table
    BnodeId
);
surrogate_key!(
    /// Key of a statement row in the `QUAD` table
    QuadId
);

/// Result of a get-or-create dictionary call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interned<T> {
    pub id: T,
    /// True when this call allocated the row
    pub created: bool,
}

impl<T> Interned<T> {
    pub fn existing(id: T) -> Self {
        Self { id, created: false }
    }

    pub fn created(id: T) -> Self {
        Self { id, created: true }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Interned<U> {
        Interned {
            id: f(self.id),
            created: self.created,
        }
    }
}

/// Encoded subject: a URI or a blank node, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Resource(ResourceId),
    Bnode(BnodeId),
}

impl SubjectKey {
    pub fn shape(&self) -> SubjectShape {
        match self {
            SubjectKey::Resource(_) => SubjectShape::Uri,
            SubjectKey::Bnode(_) => SubjectShape::Blank,
        }
    }

    fn value(&self) -> i64 {
        match self {
            SubjectKey::Resource(id) => id.0,
            SubjectKey::Bnode(id) => id.0,
        }
    }
}

/// Encoded object: exactly one of URI, blank node or literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Resource(ResourceId),
    Bnode(BnodeId),
    Literal(LiteralId),
}

impl ObjectKey {
    pub fn shape(&self) -> ObjectShape {
        match self {
            ObjectKey::Resource(_) => ObjectShape::Uri,
            ObjectKey::Bnode(_) => ObjectShape::Blank,
            ObjectKey::Literal(_) => ObjectShape::Literal,
        }
    }

    fn value(&self) -> i64 {
        match self {
            ObjectKey::Resource(id) => id.0,
            ObjectKey::Bnode(id) => id.0,
            ObjectKey::Literal(id) => id.0,
        }
    }
}

/// A quad whose terms have all been resolved to dictionary keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedQuad {
    pub subject: SubjectKey,
    pub predicate: ResourceId,
    pub object: ObjectKey,
    /// None = default graph
    pub context: Option<ResourceId>,
}

impl EncodedQuad {
    pub fn new(
        subject: SubjectKey,
        predicate: ResourceId,
        object: ObjectKey,
        context: Option<ResourceId>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            context,
        }
    }

    /// Rebuild from the seven `QUAD` columns.
    ///
    /// Zero or two subject kinds, or anything other than exactly one object kind,
    /// is a contract violation.
    pub fn from_columns(
        s_uri: Option<i64>,
        s_blank: Option<i64>,
        p_uri: i64,
        o_uri: Option<i64>,
        o_blank: Option<i64>,
        o_literal: Option<i64>,
        c_uri: Option<i64>,
    ) -> StoreResult<Self> {
        let shape = QuadShape::classify(
            s_uri.is_some(),
            s_blank.is_some(),
            o_uri.is_some(),
            o_blank.is_some(),
            o_literal.is_some(),
            c_uri.is_some(),
        )?;

        // classify guarantees the column of each shape is set
        let subject = match shape.subject {
            SubjectShape::Uri => SubjectKey::Resource(ResourceId(s_uri.unwrap_or_default())),
            SubjectShape::Blank => SubjectKey::Bnode(BnodeId(s_blank.unwrap_or_default())),
        };
        let object = match shape.object {
            ObjectShape::Uri => ObjectKey::Resource(ResourceId(o_uri.unwrap_or_default())),
            ObjectShape::Blank => ObjectKey::Bnode(BnodeId(o_blank.unwrap_or_default())),
            ObjectShape::Literal => ObjectKey::Literal(LiteralId(o_literal.unwrap_or_default())),
        };

        Ok(Self::new(subject, ResourceId(p_uri), object, c_uri.map(ResourceId)))
    }

    /// Which of the twelve lookup variants this quad needs
    pub fn shape(&self) -> QuadShape {
        QuadShape {
            subject: self.subject.shape(),
            object: self.object.shape(),
            context: if self.context.is_some() {
                ContextShape::Present
            } else {
                ContextShape::Absent
            },
        }
    }

    /// Values bound to a lookup statement, in placeholder order.
    ///
    /// Three values for the default graph (context matched with IS NULL), four otherwise.
    pub fn lookup_params(&self) -> Vec<i64> {
        let mut params = vec![self.subject.value(), self.predicate.0, self.object.value()];
        if let Some(context) = self.context {
            params.push(context.0);
        }
        params
    }

    /// Column values in `QUAD` order: S_URI, S_BLANK, P_URI, O_URI, O_BLANK, O_LITERAL, C_URI
    pub fn columns(&self) -> [Option<i64>; 7] {
        let (s_uri, s_blank) = match self.subject {
            SubjectKey::Resource(id) => (Some(id.0), None),
            SubjectKey::Bnode(id) => (None, Some(id.0)),
        };
        let (o_uri, o_blank, o_literal) = match self.object {
            ObjectKey::Resource(id) => (Some(id.0), None, None),
            ObjectKey::Bnode(id) => (None, Some(id.0), None),
            ObjectKey::Literal(id) => (None, None, Some(id.0)),
        };
        [
            s_uri,
            s_blank,
            Some(self.predicate.0),
            o_uri,
            o_blank,
            o_literal,
            self.context.map(|c| c.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_from_columns_roundtrip() {
        let quad = EncodedQuad::from_columns(Some(1), None, 2, None, None, Some(3), Some(4)).unwrap();
        assert_eq!(quad.subject, SubjectKey::Resource(ResourceId(1)));
        assert_eq!(quad.object, ObjectKey::Literal(LiteralId(3)));
        assert_eq!(quad.columns(), [Some(1), None, Some(2), None, None, Some(3), Some(4)]);
    }

    #[test]
    fn test_from_columns_rejects_bad_subject() {
        let both = EncodedQuad::from_columns(Some(1), Some(1), 2, Some(3), None, None, None);
        assert!(matches!(both, Err(StoreError::ContractViolation(_))));

        let neither = EncodedQuad::from_columns(None, None, 2, Some(3), None, None, None);
        assert!(matches!(neither, Err(StoreError::ContractViolation(_))));
    }

    #[test]
    fn test_from_columns_rejects_bad_object() {
        let none = EncodedQuad::from_columns(Some(1), None, 2, None, None, None, None);
        assert!(matches!(none, Err(StoreError::ContractViolation(_))));

        let two = EncodedQuad::from_columns(Some(1), None, 2, Some(3), Some(4), None, None);
        assert!(matches!(two, Err(StoreError::ContractViolation(_))));
    }

    #[test]
    fn test_lookup_params_arity() {
        let quad = EncodedQuad::new(
            SubjectKey::Bnode(BnodeId(7)),
            ResourceId(2),
            ObjectKey::Resource(ResourceId(3)),
            None,
        );
        assert_eq!(quad.lookup_params(), vec![7, 2, 3]);

        let named = EncodedQuad {
            context: Some(ResourceId(9)),
            ..quad
        };
        assert_eq!(named.lookup_params(), vec![7, 2, 3, 9]);
    }

    #[test]
    fn test_interned_map() {
        let interned = Interned::created(ResourceId(5)).map(SubjectKey::Resource);
        assert!(interned.created);
        assert_eq!(interned.id, SubjectKey::Resource(ResourceId(5)));
    }
}
