//! Declared field layouts per entity kind.
//!
//! Every kind of entity a document uses registers one [`FieldSchema`] at
//! startup: an ordered list of named columns with defaults and flags.
//! Consumers that need per-kind behavior (renderers, inspectors) register an
//! adapter under the same tag. Lookup is by tag only.
//!
//! ```
//! use trellis::model::{CellValue, EntityKind, FieldSchema, KindRegistry};
//!
//! const CAMERA: EntityKind = EntityKind::new("camera");
//!
//! let mut registry: KindRegistry<&'static str> = KindRegistry::new();
//! registry.register(
//!     FieldSchema::new(CAMERA)
//!         .field("name", "Camera")
//!         .field("fov", 60.0),
//! );
//! registry.register_adapter(CAMERA, "camera-gizmo");
//!
//! let camera = registry.create(CAMERA).unwrap();
//! assert_eq!(camera.entity().kind(), CAMERA);
//! assert_eq!(registry.adapter(CAMERA), Some(&"camera-gizmo"));
//! ```

use std::collections::HashMap;

use super::aspect::{Aspect, CellValue, ItemFlags};
use super::cell_store::{CellStore, DEFAULT_BUILD_ASPECTS};
use super::entity::{Entity, EntityKind, TreeEntity};
use crate::error::{ModelError, ModelResult};

/// One declared column of a kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub default: CellValue,
    pub flags: ItemFlags,
}

impl FieldDef {
    /// Header label: the name with its first letter upper-cased.
    pub fn label(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Ordered field layout of one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    kind: EntityKind,
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Append a field with default flags.
    pub fn field(self, name: &'static str, default: impl Into<CellValue>) -> Self {
        self.field_with_flags(name, default, ItemFlags::default())
    }

    pub fn field_with_flags(mut self, name: &'static str, default: impl Into<CellValue>, flags: ItemFlags) -> Self {
        self.fields.push(FieldDef {
            name,
            default: default.into(),
            flags,
        });
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column of the field called `name`.
    pub fn column_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Header cells: one capitalised label per field.
    pub fn header(&self) -> CellStore {
        CellStore::build_from(
            self.fields.iter().map(FieldDef::label).enumerate(),
            &[Aspect::Display],
        )
    }

    /// A fresh entity of this kind with every field at its default.
    pub fn instantiate(&self) -> TreeEntity {
        let cells = CellStore::build_from(
            self.fields.iter().map(|field| field.default.clone()).enumerate(),
            &DEFAULT_BUILD_ASPECTS,
        );
        let mut entity = Entity::with_cells(self.kind, cells);
        for (column, field) in self.fields.iter().enumerate() {
            if field.flags != ItemFlags::default() {
                entity.set_flags(column, field.flags);
            }
        }
        TreeEntity::new(entity)
    }
}

/// Startup-populated table from kind tag to schema and adapter.
#[derive(Debug, Clone)]
pub struct KindRegistry<A> {
    schemas: HashMap<EntityKind, FieldSchema>,
    adapters: HashMap<EntityKind, A>,
}

impl<A> Default for KindRegistry<A> {
    fn default() -> Self {
        Self {
            schemas: HashMap::new(),
            adapters: HashMap::new(),
        }
    }
}

impl<A> KindRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under its kind, returning the schema it replaces.
    pub fn register(&mut self, schema: FieldSchema) -> Option<FieldSchema> {
        self.schemas.insert(schema.kind(), schema)
    }

    pub fn schema(&self, kind: EntityKind) -> Option<&FieldSchema> {
        self.schemas.get(&kind)
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.schemas.contains_key(&kind)
    }

    /// Registered kinds, sorted by tag.
    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<_> = self.schemas.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn register_adapter(&mut self, kind: EntityKind, adapter: A) -> Option<A> {
        self.adapters.insert(kind, adapter)
    }

    pub fn adapter(&self, kind: EntityKind) -> Option<&A> {
        self.adapters.get(&kind)
    }

    /// A blank entity of `kind`.
    pub fn create(&self, kind: EntityKind) -> ModelResult<TreeEntity> {
        self.schema(kind)
            .map(FieldSchema::instantiate)
            .ok_or(ModelError::UnknownKind(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESH: EntityKind = EntityKind::new("mesh");
    const LIGHT: EntityKind = EntityKind::new("light");

    fn mesh_schema() -> FieldSchema {
        FieldSchema::new(MESH)
            .field("name", "Mesh")
            .field_with_flags("vertices", vec![0.0, 0.0, 0.0], ItemFlags::ENABLED)
            .field("visible", true)
    }

    #[test]
    fn test_header_labels() {
        let header = mesh_schema().header();
        assert_eq!(header.len(), 3);
        assert_eq!(
            header.get(Aspect::Display, 1),
            Some(&CellValue::from("Vertices"))
        );
    }

    #[test]
    fn test_instantiate_defaults() {
        let schema = mesh_schema();
        let tree = schema.instantiate();
        let entity = tree.entity();

        assert_eq!(entity.kind(), MESH);
        assert_eq!(entity.column_count(), 3);
        assert_eq!(entity.data(0, Aspect::Edit), CellValue::from("Mesh"));
        assert_eq!(entity.data(2, Aspect::Display), CellValue::from(true));
        assert_eq!(entity.flags(1), ItemFlags::ENABLED);
        assert_eq!(entity.flags(0), ItemFlags::default());
        assert_eq!(schema.column_of("visible"), Some(2));
    }

    #[test]
    fn test_instances_are_distinct() {
        let schema = mesh_schema();
        assert_ne!(schema.instantiate().id(), schema.instantiate().id());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry: KindRegistry<u32> = KindRegistry::new();
        assert!(registry.register(mesh_schema()).is_none());
        registry.register(FieldSchema::new(LIGHT).field("name", "Light"));
        registry.register_adapter(LIGHT, 7);

        assert_eq!(registry.kinds(), vec![LIGHT, MESH]);
        assert_eq!(registry.adapter(LIGHT), Some(&7));
        assert_eq!(registry.adapter(MESH), None);
        assert_eq!(registry.create(LIGHT).unwrap().entity().kind(), LIGHT);
    }

    #[test]
    fn test_unknown_kind() {
        let registry: KindRegistry<()> = KindRegistry::new();
        let camera = EntityKind::new("camera");
        assert_eq!(
            registry.create(camera).unwrap_err(),
            ModelError::UnknownKind(camera)
        );
    }
}
