//! Normalized ticket records and the borrowed views the engines work on

use super::field::{Schema, TextField, TimeField};
use super::value::RawValue;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// One normalized row of the ticket dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketRecord {
    pub id: Option<String>,
    pub opened_at: Option<NaiveDateTime>,
    pub last_modified_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
    pub requester: String,
    pub status: String,
    pub service_name: String,
    pub contract_number: String,
    /// Columns the core does not interpret (summary text and the like)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, RawValue>,
}

impl TicketRecord {
    /// Empty record with every string at the placeholder and no timestamps
    pub fn blank() -> Self {
        Self {
            id: None,
            opened_at: None,
            last_modified_at: None,
            closed_at: None,
            requester: String::new(),
            status: String::new(),
            service_name: String::new(),
            contract_number: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Requester => &self.requester,
            TextField::Status => &self.status,
            TextField::ServiceName => &self.service_name,
            TextField::ContractNumber => &self.contract_number,
        }
    }

    pub fn time(&self, field: TimeField) -> Option<NaiveDateTime> {
        match field {
            TimeField::OpenedAt => self.opened_at,
            TimeField::LastModifiedAt => self.last_modified_at,
            TimeField::ClosedAt => self.closed_at,
        }
    }

    /// Open tickets have no closing timestamp
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// Immutable snapshot of one reporting session
#[derive(Debug, Clone, Default)]
pub struct TicketSnapshot {
    records: Vec<TicketRecord>,
    schema: Schema,
}

impl TicketSnapshot {
    pub fn new(records: Vec<TicketRecord>, schema: Schema) -> Self {
        Self { records, schema }
    }

    pub fn records(&self) -> &[TicketRecord] {
        &self.records
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// View over every record of the snapshot
    pub fn view(&self) -> TicketView<'_> {
        TicketView {
            schema: &self.schema,
            records: self.records.iter().collect(),
        }
    }
}

/// A filtered, borrowed subset of a snapshot
///
/// Views never copy or mutate records; several can coexist over the same snapshot.
#[derive(Debug, Clone)]
pub struct TicketView<'a> {
    schema: &'a Schema,
    records: Vec<&'a TicketRecord>,
}

impl<'a> TicketView<'a> {
    pub fn new(schema: &'a Schema, records: Vec<&'a TicketRecord>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn records(&self) -> &[&'a TicketRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TicketRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Narrow this view with a predicate, producing a new view
    pub fn filter<P>(&self, mut predicate: P) -> TicketView<'a>
    where
        P: FnMut(&TicketRecord) -> bool,
    {
        TicketView {
            schema: self.schema,
            records: self.records.iter().copied().filter(|r| predicate(r)).collect(),
        }
    }
}
