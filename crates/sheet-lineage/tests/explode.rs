//! Dependency explosion over in-memory workbooks

use std::path::Path;

use pretty_assertions::assert_eq;
use sheet_lineage::prelude::*;

const MAIN: &str = "/books/Main.xlsx";

/// Build a workbook from `(sheet, [(cell, content)])`; content starting with
/// `=` is a formula, numeric content a number, anything else text.
fn book(sheets: &[(&str, Vec<(&str, &str)>)]) -> Workbook {
    let mut wb = Workbook::empty();
    for (name, cells) in sheets {
        wb.add_worksheet_with_name(name).unwrap();
        let ws = wb.worksheet_by_name_mut(name).unwrap();
        for (cell, content) in cells {
            if content.starts_with('=') {
                ws.set_cell_formula(cell, content).unwrap();
            } else if let Ok(n) = content.parse::<f64>() {
                ws.set_cell_value(cell, n).unwrap();
            } else {
                ws.set_cell_value(cell, *content).unwrap();
            }
        }
    }
    wb
}

fn single(cells: &[(&str, &str)]) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert(MAIN, book(&[("Sheet1", cells.to_vec())]));
    store
}

fn explode(
    store: &MemoryStore,
    cell: &str,
    max_depth: usize,
) -> (DependencyNode, ExplosionSummary) {
    explode_dependencies(store, store, Path::new(MAIN), "Sheet1", cell, max_depth).unwrap()
}

fn explode_with(store: &MemoryStore, cell: &str, options: ExplodeOptions) -> Explosion {
    Exploder::with_options(store, store, options)
        .explode(Path::new(MAIN), "Sheet1", CellAddress::parse(cell).unwrap())
        .unwrap()
}

fn child_addresses(node: &DependencyNode) -> Vec<&str> {
    node.children.iter().map(|c| c.address.as_str()).collect()
}

#[test]
fn test_two_cell_cycle() {
    let store = single(&[("A1", "=B1"), ("B1", "=A1")]);
    let (root, summary) = explode(&store, "A1", 10);

    assert_eq!(root.node_type(), NodeType::Formula);
    let b1 = &root.children[0];
    assert_eq!(b1.address, "Sheet1!B1");
    assert_eq!(b1.node_type(), NodeType::Formula);

    let again = &b1.children[0];
    assert_eq!(again.address, "Sheet1!A1");
    assert_eq!(again.node_type(), NodeType::CircularRef);
    assert_eq!(again.depth, 2);
    assert!(again.is_leaf());

    assert_eq!(summary.circular_reference_count(), 1);
}

#[test]
fn test_depth_limit_on_long_chain() {
    let mut cells: Vec<(String, String)> = (1..20)
        .map(|i| (format!("A{}", i), format!("=A{}", i + 1)))
        .collect();
    cells.push(("A20".to_string(), "1".to_string()));
    let refs: Vec<(&str, &str)> = cells
        .iter()
        .map(|(c, v)| (c.as_str(), v.as_str()))
        .collect();
    let store = single(&refs);

    let (root, summary) = explode(&store, "A1", 5);

    let mut types = Vec::new();
    let mut node = &root;
    loop {
        types.push(node.node_type());
        match node.children.first() {
            Some(child) => node = child,
            None => break,
        }
    }
    assert_eq!(
        types,
        vec![
            NodeType::Formula,
            NodeType::Formula,
            NodeType::Formula,
            NodeType::Formula,
            NodeType::Formula,
            NodeType::LimitReached,
        ]
    );
    assert_eq!(node.address, "Sheet1!A6");
    assert_eq!(summary.total_nodes, 6);
    assert_eq!(summary.max_depth, 5);
    assert_eq!(summary.circular_reference_count(), 0);
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let store = single(&[
        ("A1", "=B1+C1"),
        ("B1", "=D1*2"),
        ("C1", "=D1+1"),
        ("D1", "5"),
    ]);
    let (root, summary) = explode(&store, "A1", 10);

    assert_eq!(child_addresses(&root), vec!["Sheet1!B1", "Sheet1!C1"]);
    assert_eq!(child_addresses(&root.children[0]), vec!["Sheet1!D1"]);
    assert_eq!(child_addresses(&root.children[1]), vec!["Sheet1!D1"]);

    let d1s: Vec<&DependencyNode> = root.iter().filter(|n| n.address == "Sheet1!D1").collect();
    assert_eq!(d1s.len(), 2);
    assert!(d1s.iter().all(|n| n.node_type() == NodeType::Value));

    assert_eq!(summary.circular_reference_count(), 0);
    assert_eq!(summary.total_nodes, 5);
    assert_eq!(summary.max_depth, 2);
    assert_eq!(summary.count_of(NodeType::Formula), 3);
    assert_eq!(summary.count_of(NodeType::Value), 2);
}

#[test]
fn test_sheet_qualified_and_relative_children() {
    let mut store = MemoryStore::new();
    store.insert(
        MAIN,
        book(&[
            ("Sheet1", vec![("C1", "=Sheet2!A1+B2"), ("B2", "3")]),
            ("Sheet2", vec![("A1", "4")]),
        ]),
    );
    let (root, _) = explode(&store, "C1", 10);

    assert_eq!(root.address, "[Main.xlsx]Sheet1!C1");
    assert_eq!(root.full_address, "'/books/[Main.xlsx]Sheet1'!C1");
    assert_eq!(child_addresses(&root), vec!["Sheet2!A1", "Sheet1!B2"]);
    assert_eq!(
        root.children[0].kind.value().as_ref(),
        &CellValue::Number(4.0)
    );
}

#[test]
fn test_unreadable_child_does_not_stop_siblings() {
    let store = single(&[("A1", "=Missing!A1+B1"), ("B1", "2")]);
    let (root, summary) = explode(&store, "A1", 10);

    assert_eq!(root.children.len(), 2);
    let missing = &root.children[0];
    assert_eq!(missing.node_type(), NodeType::Error);
    assert!(missing.kind.error().unwrap().contains("Missing"));
    assert_eq!(root.children[1].node_type(), NodeType::Value);
    assert_eq!(summary.count_of(NodeType::Error), 1);
}

#[test]
fn test_indirect_address_becomes_late_bound_child() {
    let mut store = MemoryStore::new();
    store.insert(
        MAIN,
        book(&[
            (
                "Sheet1",
                vec![("A1", "=INDIRECT(\"Sheet\"&B5&\"!A1\")"), ("B5", "2")],
            ),
            ("Sheet2", vec![("A1", "42")]),
        ]),
    );
    let (root, summary) = explode(&store, "A1", 10);

    assert_eq!(child_addresses(&root), vec!["Sheet1!B5", "Sheet2!A1"]);
    assert!(!root.children[0].late_bound);
    assert!(root.children[1].late_bound);
    assert_eq!(
        root.children[1].kind.value().as_ref(),
        &CellValue::Number(42.0)
    );
    assert!(summary.unresolved_indirects.is_empty());
}

#[test]
fn test_indirect_through_vlookup_and_row() {
    let mut store = MemoryStore::new();
    store.insert(
        MAIN,
        book(&[
            (
                "Sheet1",
                vec![
                    ("B1", "10"),
                    ("C1", "3"),
                    ("B2", "20"),
                    ("C2", "7"),
                    ("B3", "30"),
                    ("C3", "9"),
                    ("A5", "=INDIRECT(\"Data!D\"&VLOOKUP(20,B1:C3,2))"),
                    ("A6", "=INDIRECT(\"Data!E\"&ROW())"),
                ],
            ),
            ("Data", vec![("D7", "70"), ("E6", "60")]),
        ]),
    );

    let (root, _) = explode(&store, "A5", 10);
    assert_eq!(
        child_addresses(&root),
        vec!["Sheet1!B1", "Sheet1!C3", "Data!D7"]
    );
    assert!(root.children[2].late_bound);

    let (root, _) = explode(&store, "A6", 10);
    assert_eq!(child_addresses(&root), vec!["Data!E6"]);
}

#[test]
fn test_unresolved_indirect_is_recorded() {
    let store = single(&[("A1", "=INDIRECT(\"Sheet\"&OFFSET(B1,1,0)&\"!A1\")")]);
    let (root, summary) = explode(&store, "A1", 10);

    assert!(root.children.iter().all(|c| !c.late_bound));
    assert_eq!(summary.unresolved_indirects.len(), 1);
    let unresolved = &summary.unresolved_indirects[0];
    assert_eq!(unresolved.cell.cell.to_string(), "A1");
    assert_eq!(unresolved.partial, "SheetOFFSET(B1,1,0)!A1");
}

#[test]
fn test_indirect_can_be_disabled() {
    let mut store = MemoryStore::new();
    store.insert(
        MAIN,
        book(&[
            ("Sheet1", vec![("A1", "=INDIRECT(\"Sheet2!A1\")")]),
            ("Sheet2", vec![("A1", "1")]),
        ]),
    );

    let on = explode_with(&store, "A1", ExplodeOptions::default());
    assert_eq!(child_addresses(&on.root), vec!["Sheet2!A1"]);

    let off = explode_with(
        &store,
        "A1",
        ExplodeOptions::default().with_resolve_indirect(false),
    );
    assert!(off.root.children.is_empty());
    assert_eq!(off.root.node_type(), NodeType::Formula);
}

#[test]
fn test_external_file_reference() {
    let mut store = MemoryStore::new();
    let formula = r"='C:\Reports\[GDP.xlsx]Data'!B2*2";
    store.insert(MAIN, book(&[("Sheet1", vec![("A1", formula)])]));
    store.insert(
        r"C:\Reports\GDP.xlsx",
        book(&[("Data", vec![("B2", "=C2"), ("C2", "8")])]),
    );

    let (root, _) = explode(&store, "A1", 10);
    let gdp = &root.children[0];
    assert_eq!(gdp.short_address, "[GDP.xlsx]Data!B2");
    assert_eq!(gdp.full_address, r"'C:\Reports\[GDP.xlsx]Data'!B2");
    assert_eq!(gdp.workbook_path, Path::new(r"C:\Reports\GDP.xlsx"));

    // C2 lives in the external workbook, so it keeps the bracketed form
    assert_eq!(child_addresses(gdp), vec!["[GDP.xlsx]Data!C2"]);
}

#[test]
fn test_declared_link_index() {
    let mut main = book(&[("Sheet1", vec![("A1", "=[1]Data!B2+[2]Data!B2")])]);
    main.add_external_link("Other.xlsx");
    let mut store = MemoryStore::new();
    store.insert(MAIN, main);
    store.insert("/books/Other.xlsx", book(&[("Data", vec![("B2", "4")])]));

    let explosion = explode_with(&store, "A1", ExplodeOptions::default());
    assert_eq!(
        explosion.links.resolve(1),
        Some(Path::new("/books/Other.xlsx"))
    );

    let root = &explosion.root;
    assert_eq!(root.children[0].address, "[Other.xlsx]Data!B2");
    assert_eq!(root.children[0].node_type(), NodeType::Value);

    // index 2 is not declared
    assert_eq!(root.children[1].workbook_path, Path::new("Unknown_2"));
    assert_eq!(root.children[1].node_type(), NodeType::Error);
    let unknown: Vec<u32> = explosion.summary.unknown_links.iter().copied().collect();
    assert_eq!(unknown, vec![2]);
}

#[test]
fn test_inferred_link_index() {
    let mut store = MemoryStore::new();
    store.insert(MAIN, book(&[("Sheet1", vec![("A1", "=[1]Sheet1!A1")])]));
    store.insert("/books/Data.xlsx", book(&[("Sheet1", vec![("A1", "9")])]));

    let explosion = explode_with(&store, "A1", ExplodeOptions::default());
    assert!(explosion.links.is_inferred());
    assert_eq!(explosion.root.children[0].address, "[Data.xlsx]Sheet1!A1");
    assert!(explosion.summary.unknown_links.is_empty());
}

#[test]
fn test_same_cell_in_sibling_branches_of_a_cycle() {
    // B1 -> A1 closes a cycle only on the branch that went through A1
    let store = single(&[("A1", "=B1+C1"), ("B1", "=A1"), ("C1", "=B1")]);
    let (root, summary) = explode(&store, "A1", 10);

    let cycles: Vec<&DependencyNode> = root
        .iter()
        .filter(|n| n.node_type() == NodeType::CircularRef)
        .collect();
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().all(|n| n.address == "Sheet1!A1"));
    assert_eq!(summary.circular_reference_count(), 2);
    assert_eq!(summary.circular_references[1].chain.len(), 4);
}

#[test]
fn test_serialized_record_shape() {
    let store = single(&[("A1", "=B1"), ("B1", "=A1")]);
    let (root, summary) = explode(&store, "A1", 10);

    let json = serde_json::to_value(&root).unwrap();
    assert_eq!(json["address"], "[Main.xlsx]Sheet1!A1");
    assert_eq!(json["type"], "formula");
    assert_eq!(json["formula"], "=B1");
    assert_eq!(json["cell_address"], "A1");
    assert_eq!(json["depth"], 0);
    assert_eq!(json["late_bound"], false);
    assert!(json["error"].is_null());

    let cycle = &json["children"][0]["children"][0];
    assert_eq!(cycle["type"], "circular_ref");
    assert_eq!(cycle["value"], "Circular reference");
    assert_eq!(cycle["error"], "Circular reference detected");

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["total_nodes"], 3);
    assert_eq!(json["type_distribution"]["formula"], 2);
    assert_eq!(json["type_distribution"]["circular_ref"], 1);
}
