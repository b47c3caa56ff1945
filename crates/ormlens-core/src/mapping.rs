//! Mapping snapshot — read-only ORM metadata supplied whole per
//! analysis run: per-entity table names and association metadata.

use serde::{Deserialize, Serialize};

use crate::errors::MappingError;

/// Association cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Declared fetch strategy for an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchStrategy {
    Eager,
    Lazy,
    /// Loaded by a secondary select.
    Select,
    /// Loaded by a join on the owning query.
    Join,
}

/// One declared relationship between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub field_name: String,
    pub cardinality: Cardinality,
    pub target_entity: String,
    /// None means nullability is unknown to the mapping layer.
    pub nullable: Option<bool>,
    pub fetch: FetchStrategy,
    /// Foreign-key column on the owning table, when mapped.
    pub join_column: Option<String>,
}

impl Association {
    pub fn to_one(field_name: impl Into<String>, target_entity: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            cardinality: Cardinality::ToOne,
            target_entity: target_entity.into(),
            nullable: None,
            fetch: FetchStrategy::Lazy,
            join_column: None,
        }
    }

    pub fn to_many(field_name: impl Into<String>, target_entity: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            cardinality: Cardinality::ToMany,
            target_entity: target_entity.into(),
            nullable: None,
            fetch: FetchStrategy::Lazy,
            join_column: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_join_column(mut self, column: impl Into<String>) -> Self {
        self.join_column = Some(column.into());
        self
    }

    pub fn with_fetch(mut self, fetch: FetchStrategy) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Mapping metadata for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    pub entity_name: String,
    pub table_name: String,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl EntityMapping {
    pub fn new(entity_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            table_name: table_name.into(),
            associations: Vec::new(),
        }
    }

    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }
}

/// The whole mapping picture for one analysis run. Consistent for
/// the duration of the run; never mutated by detectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingSnapshot {
    entities: Vec<EntityMapping>,
}

impl MappingSnapshot {
    /// Snapshot with no entities — trace-only analysis. Detectors
    /// that need mapping metadata yield nothing against it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entities(entities: Vec<EntityMapping>) -> Self {
        Self { entities }
    }

    pub fn entities(&self) -> &[EntityMapping] {
        &self.entities
    }

    /// Look up an entity by table name, case-insensitively.
    pub fn entity_by_table(&self, table: &str) -> Option<&EntityMapping> {
        self.entities
            .iter()
            .find(|e| e.table_name.eq_ignore_ascii_case(table))
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&EntityMapping> {
        self.entities.iter().find(|e| e.entity_name == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// The external mapping boundary. Implementations wrap whatever
/// metadata source the host application has; the engine tolerates
/// failure by falling back to an empty snapshot.
pub trait MappingProvider: Send + Sync {
    fn snapshot(&self) -> Result<MappingSnapshot, MappingError>;
}

/// Provider over an already-materialized snapshot. Handy for tests
/// and for hosts that build the snapshot up front.
pub struct StaticMappingProvider {
    snapshot: MappingSnapshot,
}

impl StaticMappingProvider {
    pub fn new(snapshot: MappingSnapshot) -> Self {
        Self { snapshot }
    }
}

impl MappingProvider for StaticMappingProvider {
    fn snapshot(&self) -> Result<MappingSnapshot, MappingError> {
        Ok(self.snapshot.clone())
    }
}
