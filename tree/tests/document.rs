//! Render/parse integration tests for the document tree.
//!
//! ```bash
//! cargo test -p savebox-tree --test document
//! ```

use std::time::Duration;

use rstest::rstest;
use serde::{Deserialize, Serialize};

use savebox_tree::{
    from_node, parse_document, render_async, to_node, ArrayNode, FrameBudget, Node, ObjectNode,
    PrimitiveArray, PrimitiveArrayNode, RenderOptions, RenderStatus, RenderTask, ScalarNode,
};

fn entity_record() -> Node {
    let mut data = ObjectNode::named("Data");
    data.add_simple_child("health", 42).unwrap();

    let mut record = ObjectNode::named("Entity1");
    record.type_tag = Some("game::Npc".into());
    record.add_simple_child("SaveIdentifier", "abc-123").unwrap();
    record.add_simple_child("DeserializationPriority", 5).unwrap();
    record.add_child(data).unwrap();
    Node::from(record)
}

fn mixed_tree() -> Node {
    let mut inventory = ArrayNode::named("inventory");
    inventory.type_tag = Some("Vec<Item>".into());
    let mut sword = ObjectNode::new();
    sword.type_tag = Some("game::Item".into());
    sword.add_simple_child("name", "sword \"Excalibur\"").unwrap();
    sword.add_simple_child("weight", 3.5f64).unwrap();
    inventory.push(sword);
    inventory.push(ScalarNode::new(7));
    inventory.push(ArrayNode::new());

    let mut flags = PrimitiveArrayNode::named("flags", vec![true, false, true]);
    flags.type_tag = Some("bool[]".into());

    // an untagged list led by a tag-only object
    let mut unit = ObjectNode::new();
    unit.type_tag = Some("game::Marker".into());
    let mut markers = ArrayNode::named("markers");
    markers.push(unit);
    markers.push(ScalarNode::new(1));

    let mut root = ObjectNode::new();
    root.type_tag = Some("game::Player".into());
    root.add_simple_child("level", 12).unwrap();
    root.add_simple_child("ratio", -0.25f64).unwrap();
    root.add_simple_child("title", None::<String>).unwrap();
    root.add_simple_child("seed", u64::MAX).unwrap();
    root.add_simple_child("speed", 0.1f32).unwrap();
    root.add_simple_child("grade", 'A').unwrap();
    root.add_child(inventory).unwrap();
    root.add_child(flags).unwrap();
    root.add_child(PrimitiveArrayNode::named("names", vec!["a", "b\nc"]))
        .unwrap();
    root.add_child(PrimitiveArrayNode::named("ids", vec![3u64, u64::MAX]))
        .unwrap();
    root.add_child(PrimitiveArrayNode::named("weights", vec![0.5f32, 1.5]))
        .unwrap();
    root.add_child(PrimitiveArrayNode::named("letters", vec!['x', 'y']))
        .unwrap();
    root.add_child(markers).unwrap();
    root.add_child(ObjectNode::named("empty")).unwrap();
    Node::from(root)
}

#[test]
fn pretty_record_nests_health_one_level_in() {
    let text = entity_record().render_to_string(RenderOptions::pretty());
    assert!(text.contains("\n  \"Data\": {\n    \"health\": 42\n  }"));
    assert!(text.contains("\"SaveIdentifier\": \"abc-123\""));
    assert!(text.contains("\"DeserializationPriority\": 5"));
    assert!(!text.contains("\"42\""));
}

#[rstest]
#[case::pretty(RenderOptions::pretty())]
#[case::compact(RenderOptions::compact())]
fn render_then_parse_restores_tree(#[case] options: RenderOptions) {
    let tree = mixed_tree();
    let text = tree.render_to_string(options);
    let parsed = parse_document(&text).unwrap();
    assert_eq!(parsed, tree);

    let object = parsed.expect_object().unwrap();
    assert_eq!(object.primitive("seed").unwrap().as_u64().unwrap(), u64::MAX);
    assert_eq!(object.primitive("speed").unwrap().as_f32().unwrap(), 0.1f32);
    assert_eq!(object.primitive("grade").unwrap().as_char().unwrap(), 'A');
    let markers = object.child("markers").unwrap().expect_array().unwrap();
    assert_eq!(markers.type_tag, None);
    assert_eq!(markers.items()[0].type_tag(), Some("game::Marker"));
}

#[rstest]
#[case::pretty(RenderOptions::pretty())]
#[case::compact(RenderOptions::compact())]
fn rendering_is_idempotent(#[case] options: RenderOptions) {
    let first = mixed_tree().render_to_string(options);
    let second = parse_document(&first).unwrap().render_to_string(options);
    assert_eq!(first, second);
}

#[test]
fn untagged_render_drops_every_tag() {
    let options = RenderOptions {
        pretty_print: true,
        emit_type_tags: false,
    };
    let parsed = parse_document(&mixed_tree().render_to_string(options)).unwrap();
    let object = parsed.expect_object().unwrap();
    assert_eq!(object.type_tag, None);
    assert_eq!(object.child("inventory").unwrap().type_tag(), None);
    assert_eq!(object.child("flags").unwrap().type_tag(), None);
}

#[rstest]
#[case::pretty(RenderOptions::pretty())]
#[case::compact(RenderOptions::compact())]
fn async_render_is_byte_identical(#[case] options: RenderOptions) {
    let tree = mixed_tree();
    let budget = FrameBudget::from_interval(Duration::ZERO);
    let text = pollster::block_on(render_async(&tree, options, budget));
    assert_eq!(text, tree.render_to_string(options));
}

#[test]
fn zero_budget_suspends_once_per_node() {
    let tree = mixed_tree();
    let mut task = RenderTask::new(
        &tree,
        RenderOptions::compact(),
        FrameBudget::from_interval(Duration::ZERO),
    );
    while task.step() == RenderStatus::Suspended {}
    // root + 14 children + 3 inventory items + 2 sword fields + 2 markers
    assert_eq!(task.suspensions(), 22);
}

#[test]
fn generous_budget_never_suspends() {
    let tree = mixed_tree();
    let mut task = RenderTask::new(
        &tree,
        RenderOptions::pretty(),
        FrameBudget::from_interval(Duration::from_secs(3600)),
    );
    assert_eq!(task.step(), RenderStatus::Finished);
    assert_eq!(task.suspensions(), 0);
}

#[rstest]
#[case::ints("[{\"IsStbPrimitiveArray\":true},1,2,3]")]
#[case::floats("[{\"IsStbPrimitiveArray\":true},1.0,2.0,3.0]")]
fn primitive_arrays_convert_between_kinds(#[case] text: &str) {
    let node = parse_document(text).unwrap();
    let array = node.expect_primitive_array().unwrap();
    assert_eq!(array.as_i32_vec().unwrap(), vec![1, 2, 3]);
    assert_eq!(array.as_f64_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    assert_eq!(array.as_u64_vec().unwrap(), vec![1, 2, 3]);
}

#[test]
fn empty_primitive_array_reads_as_any_kind() {
    let node = parse_document("[{\"IsStbPrimitiveArray\":true}]").unwrap();
    let array = node.expect_primitive_array().unwrap();
    assert_eq!(array.values, PrimitiveArray::from(Vec::<String>::new()));
    assert!(array.as_string_vec().unwrap().is_empty());
    assert!(array.as_f32_vec().unwrap().is_empty());
}

#[test]
fn serde_values_survive_the_text_form() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Stance {
        Idle,
        Patrol { waypoints: Vec<(i32, i32)> },
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Guard {
        name: String,
        initial: char,
        health: u16,
        aggro: f32,
        stance: Stance,
        backup: Option<Box<Guard>>,
    }

    let guard = Guard {
        name: "Ser Rust".into(),
        initial: 'R',
        health: 300,
        aggro: 0.75,
        stance: Stance::Patrol {
            waypoints: vec![(0, 0), (4, -2)],
        },
        backup: Some(Box::new(Guard {
            name: "Squire".into(),
            initial: 'S',
            health: 50,
            aggro: 0.0,
            stance: Stance::Idle,
            backup: None,
        })),
    };

    let text = to_node(&guard)
        .unwrap()
        .render_to_string(RenderOptions::compact());
    let restored: Guard = from_node(&parse_document(&text).unwrap()).unwrap();
    assert_eq!(restored, guard);
}
