//! Model-wide properties checked across mediators, commands and filters.

use std::sync::Arc;

use trellis::command::{CommandExecutor, CommandFactory, ExecutorConfig};
use trellis::model::{
    Aspect, CellValue, EditableModel, Entity, EntityKind, FieldSchema, FilterView, ItemModel,
    KindRegistry, ListModel, ModelIndex, Orientation, TableModel, TreeEntity, TreeModel,
};

const ASPECTS: [Aspect; 5] = [
    Aspect::Display,
    Aspect::Edit,
    Aspect::ToolTip,
    Aspect::CheckState,
    Aspect::User(3),
];

#[test]
fn entity_reads_back_what_it_writes() {
    let mut entity = Entity::new();
    let values = [
        CellValue::from("text"),
        CellValue::from(42),
        CellValue::from(2.5),
        CellValue::from(true),
        CellValue::from(vec![1.0, 2.0]),
    ];
    for (column, value) in values.iter().enumerate() {
        for aspect in ASPECTS {
            entity.set_data(column, value.clone(), aspect);
            assert_eq!(&entity.data(column, aspect), value);
        }
    }
}

#[test]
fn fresh_entity_reads_defaults() {
    let entity = Entity::new();
    for column in 0..4 {
        for aspect in ASPECTS {
            assert_eq!(entity.data(column, aspect), CellValue::None);
            assert_eq!(
                entity.data_or(column, aspect, CellValue::from(-1)),
                CellValue::from(-1)
            );
        }
    }
}

#[test]
fn set_cell_round_trip() {
    let model = Arc::new(ListModel::from_values(["old"]));
    let index = model.index(0, 0, &ModelIndex::invalid());
    let mut command = model
        .set_data_command(&index, "new".into(), Aspect::Display)
        .unwrap();

    let before = model.data(&index, Aspect::Display);
    command.redo().unwrap();
    let after = model.data(&index, Aspect::Display);
    command.undo().unwrap();
    assert_eq!(model.data(&index, Aspect::Display), before);
    command.redo().unwrap();
    assert_eq!(model.data(&index, Aspect::Display), after);
}

#[test]
fn structural_round_trip_keeps_other_rows() {
    let tree = Arc::new(TreeModel::with_header(["Name"]));
    let root = ModelIndex::invalid();
    for name in ["a", "b", "c", "d"] {
        tree.append(&root, TreeEntity::from_values([name])).unwrap();
    }
    let before = tree.child_ids(tree.root_id());

    let mut executor = CommandExecutor::with_history(ExecutorConfig::default());
    executor.insert_rows(&tree, 1, 3, &root).unwrap();
    assert_eq!(tree.row_count(&root), 7);
    executor.remove_rows(&tree, 1, 3, &root).unwrap();

    assert_eq!(tree.child_ids(tree.root_id()), before);
}

#[test]
fn undone_macro_leaves_nothing_applied() {
    let table = Arc::new(TableModel::new(["Name", "Size"]));
    table.append_row(["a", "1"]).unwrap();
    let root = ModelIndex::invalid();
    let mut executor = CommandExecutor::with_history(ExecutorConfig::default());

    executor
        .with_macro("Edit table", |exec| {
            exec.insert_rows(&table, 1, 2, &root)?;
            let cell = table.index(0, 1, &root);
            exec.set_data(&table, &cell, "10".into(), Aspect::Display)?;
            exec.remove_rows(&table, 2, 1, &root)
        })
        .unwrap();
    assert_eq!(table.row_count(&root), 2);

    executor.undo().unwrap();
    assert_eq!(table.row_count(&root), 1);
    assert_eq!(
        table.data(&table.index(0, 1, &root), Aspect::Display),
        CellValue::from("1")
    );
}

#[test]
fn child_addressing_resolves_back() {
    let tree = TreeModel::with_header(["Name"]);
    let root = ModelIndex::invalid();
    let parent = tree.append(&root, TreeEntity::from_values(["p"])).unwrap();
    for name in ["x", "y", "z"] {
        let child = TreeEntity::from_values([name]);
        let id = child.id();
        let index = tree.append(&parent, child).unwrap();

        let again = tree.index(index.row(), 0, &parent);
        assert_eq!(tree.entity_id(&again), Some(id));
        assert_eq!(tree.parent(&again), parent);
    }
}

#[test]
fn removed_subtree_is_unreachable() {
    let tree = TreeModel::with_header(["Name"]);
    let root = ModelIndex::invalid();
    let branch = TreeEntity::from_values(["branch"]).with_child(
        TreeEntity::from_values(["twig"]).with_child(TreeEntity::from_values(["leaf"])),
    );
    let branch_id = branch.id();
    let twig_id = branch.children()[0].id();
    let leaf_id = branch.children()[0].children()[0].id();
    tree.append(&root, branch).unwrap();
    tree.append(&root, TreeEntity::from_values(["other"])).unwrap();
    assert_eq!(tree.entity_count(), 4);

    let removed = tree.remove_rows(0, 1, &root).unwrap();
    assert_eq!(removed[0].id(), branch_id);
    assert_eq!(removed[0].subtree_len(), 3);

    assert_eq!(tree.entity_count(), 1);
    for id in [branch_id, twig_id, leaf_id] {
        assert!(!tree.item_index(id, 0).is_valid());
        assert!(tree.with_entity(id, |_| ()).is_none());
    }
}

#[test]
fn tree_filter_keeps_ancestors_of_matches() {
    let tree = Arc::new(TreeModel::with_header(["Name"]));
    let root = ModelIndex::invalid();
    tree.append(
        &root,
        TreeEntity::from_values(["scene"])
            .with_child(TreeEntity::from_values(["group"]).with_child(TreeEntity::from_values(["Xform"])))
            .with_child(TreeEntity::from_values(["mesh"])),
    )
    .unwrap();
    tree.append(&root, TreeEntity::from_values(["camera"])).unwrap();

    let view = FilterView::builder(tree.clone())
        .text_contains(0, "x")
        .recursive(true)
        .build();

    assert_eq!(view.row_count(&root), 1);
    let scene = view.index(0, 0, &root);
    assert_eq!(view.display_text(&scene).as_deref(), Some("scene"));
    assert_eq!(view.row_count(&scene), 1);
    let group = view.index(0, 0, &scene);
    assert_eq!(view.display_text(&group).as_deref(), Some("group"));
    let xform = view.index(0, 0, &group);
    assert_eq!(view.display_text(&xform).as_deref(), Some("Xform"));

    // The match disappearing hides its ancestors too.
    let source_xform = view.map_to_source(&xform);
    assert!(tree.set_data(&source_xform, "node".into(), Aspect::Display));
    assert_eq!(view.row_count(&root), 0);
}

#[test]
fn filter_follows_executor_edits() {
    let list = Arc::new(ListModel::from_values(["apple", "banana", "cherry"]));
    let view = FilterView::builder(list.clone()).text_contains(0, "an").build();
    let root = ModelIndex::invalid();
    let mut executor = CommandExecutor::with_history(ExecutorConfig::default());
    assert_eq!(view.row_count(&root), 1);

    executor
        .append(&list, TreeEntity::from_values(["mango"]), &root)
        .unwrap();
    assert_eq!(view.row_count(&root), 2);

    executor.undo().unwrap();
    assert_eq!(view.row_count(&root), 1);
}

#[test]
fn table_header_drives_columns() {
    let table = TableModel::new(["Name", "Size"]);
    let root = ModelIndex::invalid();
    table.append_row(["readme", "4"]).unwrap();

    assert_eq!(table.column_count(&root), 2);
    assert_eq!(
        table.header_data(1, Orientation::Horizontal, Aspect::Display),
        CellValue::from("Size")
    );
    table.set_headers(["Name", "Size", "Kind"]);
    assert_eq!(table.column_count(&root), 3);
    assert_eq!(
        table.data(&table.index(0, 2, &root), Aspect::Display),
        CellValue::None
    );
}

#[test]
fn registry_builds_insertable_entities() {
    const LIGHT: EntityKind = EntityKind::new("light");
    let mut registry: KindRegistry<()> = KindRegistry::new();
    registry.register(
        FieldSchema::new(LIGHT)
            .field("name", "Light")
            .field("intensity", 1.0),
    );

    let schema = registry.schema(LIGHT).unwrap();
    let tree = Arc::new(TreeModel::new(Entity::with_cells(EntityKind::GENERIC, schema.header())));
    let root = ModelIndex::invalid();
    let mut executor = CommandExecutor::new();
    let light = executor
        .append(&tree, registry.create(LIGHT).unwrap(), &root)
        .unwrap();

    assert_eq!(
        tree.header_data(1, Orientation::Horizontal, Aspect::Display),
        CellValue::from("Intensity")
    );
    assert_eq!(tree.display_text(&light).as_deref(), Some("Light"));
    assert_eq!(
        tree.data(&light.with_column(1), Aspect::Edit),
        CellValue::from(1.0)
    );
}
