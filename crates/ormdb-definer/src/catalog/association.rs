//! Associations between catalog models.

use crate::types::ReferentialAction;
use serde::Serialize;

/// Kind of an association, seen from the model holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssociationKind {
    /// The source holds a foreign key to the target.
    BelongsTo,
    /// The target holds a unique foreign key to the source.
    HasOne,
    /// The target holds a foreign key to the source.
    HasMany,
    /// Source and target are linked through a join model.
    BelongsToMany,
}

/// An association declared on a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    /// Label, unique within the source model.
    pub label: String,
    pub kind: AssociationKind,
    /// Model holding the association.
    pub source: String,
    /// Associated model.
    pub target: String,
    /// Foreign key column.
    pub foreign_key: String,
    /// Join model column pointing at the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_key: Option<String>,
    /// Join model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl AssociationKind {
    /// Check if at most one target row is associated.
    pub fn is_single(self) -> bool {
        matches!(self, AssociationKind::BelongsTo | AssociationKind::HasOne)
    }

    /// Check if any number of target rows can be associated.
    pub fn is_multi(self) -> bool {
        !self.is_single()
    }
}

impl Association {
    /// Check if this association goes through a join model.
    pub fn is_many_to_many(&self) -> bool {
        self.kind == AssociationKind::BelongsToMany
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AssociationKind::BelongsTo => "belongs to",
            AssociationKind::HasOne => "has one",
            AssociationKind::HasMany => "has many",
            AssociationKind::BelongsToMany => "belongs to many",
        })
    }
}
