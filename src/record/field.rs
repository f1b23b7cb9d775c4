//! Canonical ticket fields, the column names they are read from, and which
//! of them a given snapshot actually carries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Categorical (string) fields of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Requester,
    Status,
    ServiceName,
    ContractNumber,
}

impl TextField {
    pub const ALL: [TextField; 4] = [
        TextField::Requester,
        TextField::Status,
        TextField::ServiceName,
        TextField::ContractNumber,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TextField::Requester => "requester",
            TextField::Status => "status",
            TextField::ServiceName => "service_name",
            TextField::ContractNumber => "contract_number",
        }
    }
}

/// Timestamp fields of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    OpenedAt,
    LastModifiedAt,
    ClosedAt,
}

impl TimeField {
    pub const ALL: [TimeField; 3] = [
        TimeField::OpenedAt,
        TimeField::LastModifiedAt,
        TimeField::ClosedAt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimeField::OpenedAt => "opened_at",
            TimeField::LastModifiedAt => "last_modified_at",
            TimeField::ClosedAt => "closed_at",
        }
    }
}

/// Any canonical field the core can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Text(TextField),
    Time(TimeField),
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Text(f) => f.name(),
            Field::Time(f) => f.name(),
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Field::Time(_))
    }
}

impl From<TextField> for Field {
    fn from(f: TextField) -> Self {
        Field::Text(f)
    }
}

impl From<TimeField> for Field {
    fn from(f: TimeField) -> Self {
        Field::Time(f)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Source column names for every canonical field
///
/// Defaults match the `ODS_ITSM` export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub id: String,
    pub opened_at: String,
    pub last_modified_at: String,
    pub closed_at: String,
    pub requester: String,
    pub status: String,
    pub service_name: String,
    pub contract_number: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "TICKET_PRINCIPAL".to_string(),
            opened_at: "DTABERTURA".to_string(),
            last_modified_at: "DTULTIMAMODIFICACAO".to_string(),
            closed_at: "DTFIM".to_string(),
            requester: "DEMANDANTE".to_string(),
            status: "STATUS".to_string(),
            service_name: "NOMESERVICO".to_string(),
            contract_number: "NUMEROCONTRATO".to_string(),
        }
    }
}

impl ColumnMap {
    pub fn column(&self, field: Field) -> &str {
        match field {
            Field::Text(TextField::Requester) => &self.requester,
            Field::Text(TextField::Status) => &self.status,
            Field::Text(TextField::ServiceName) => &self.service_name,
            Field::Text(TextField::ContractNumber) => &self.contract_number,
            Field::Time(TimeField::OpenedAt) => &self.opened_at,
            Field::Time(TimeField::LastModifiedAt) => &self.last_modified_at,
            Field::Time(TimeField::ClosedAt) => &self.closed_at,
        }
    }

    /// Whether `column` is mapped to a canonical field (or the id)
    pub fn is_mapped(&self, column: &str) -> bool {
        column == self.id
            || TextField::ALL.iter().any(|f| self.column((*f).into()) == column)
            || TimeField::ALL.iter().any(|f| self.column((*f).into()) == column)
    }
}

/// Raised by any component that needs a field the snapshot does not carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("field unavailable: {0}")]
pub struct FieldUnavailable(pub Field);

/// Field availability of one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    fields: BTreeSet<Field>,
    has_id: bool,
}

impl Schema {
    /// Schema with every canonical field present
    pub fn complete() -> Self {
        let mut schema = Self::default();
        for f in TextField::ALL {
            schema.mark(f.into());
        }
        for f in TimeField::ALL {
            schema.mark(f.into());
        }
        schema.has_id = true;
        schema
    }

    pub fn mark(&mut self, field: Field) {
        self.fields.insert(field);
    }

    pub fn mark_id(&mut self) {
        self.has_id = true;
    }

    pub fn has(&self, field: impl Into<Field>) -> bool {
        self.fields.contains(&field.into())
    }

    pub fn has_id(&self) -> bool {
        self.has_id
    }

    /// Availability check used before any component depends on a field
    pub fn require(&self, field: impl Into<Field>) -> Result<(), FieldUnavailable> {
        let field = field.into();
        if self.fields.contains(&field) {
            Ok(())
        } else {
            Err(FieldUnavailable(field))
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }
}
