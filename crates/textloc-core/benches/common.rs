// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#![allow(dead_code)]

use textloc_core::config::LocatorConfig;
use textloc_core::descriptor::Descriptor;
use textloc_core::serializer::{SerializeOptions, Serializer};
use textloc_core::tree::TreeAdapter;
use textloc_memtree::{ElementId, MemTree, MemTreeAdapter};

/// Build a `<main>` with `count` `<p id="p{n}">paragraph {n}</p>` children,
/// the performance envelope's shape for spec.md §8.4 ("trees of ≤ 5,000
/// elements under the scope").
pub fn build_paragraph_tree(count: usize) -> (MemTree, ElementId) {
    let mut tree = MemTree::new();
    let root = tree.root();
    let main = tree.append_element(root, "main");
    tree.set_classes(main, &["app"]);

    let mut last_p = main;
    for n in 0..count {
        let p = tree.append_element(main, "p");
        tree.set_id(p, format!("p{n}"));
        tree.set_classes(p, &["item"]);
        tree.append_text(p, &format!("paragraph number {n} body text"));
        last_p = p;
    }
    (tree, last_p)
}

/// Serialize a selection over the last paragraph of a freshly-built tree,
/// for use as `restore()` input in the layer benches.
pub fn descriptor_for_last_paragraph(count: usize) -> Descriptor {
    let (tree, last_p) = build_paragraph_tree(count);
    let adapter = MemTreeAdapter::new(tree);
    let text_nodes = adapter.walk_text_nodes(&last_p);
    let (t, len) = text_nodes[0].clone();
    let range = adapter.make_range(&t, 0, &t, len);

    let config = LocatorConfig::new();
    let serializer = Serializer::new(&config);
    serializer
        .serialize(&adapter, &range, SerializeOptions::default())
        .expect("non-empty selection serializes")
}

/// Same shape as [`build_paragraph_tree`], but without element ids — forces
/// L1 out so the L2/L3/L4 benches exercise their own layer.
pub fn build_paragraph_tree_no_ids(count: usize) -> (MemTree, ElementId) {
    let mut tree = MemTree::new();
    let root = tree.root();
    let main = tree.append_element(root, "main");
    tree.set_classes(main, &["app"]);

    let mut last_p = main;
    for n in 0..count {
        let p = tree.append_element(main, "p");
        tree.set_classes(p, &["item"]);
        tree.append_text(p, &format!("paragraph number {n} body text"));
        last_p = p;
    }
    (tree, last_p)
}

/// Descriptor captured over the id-less shape, so `paths`/`multi`/
/// `fingerprint` anchors are all populated from tag/class signatures
/// rather than an id lookup.
pub fn descriptor_for_last_paragraph_no_ids(count: usize) -> Descriptor {
    let (tree, last_p) = build_paragraph_tree_no_ids(count);
    let adapter = MemTreeAdapter::new(tree);
    let text_nodes = adapter.walk_text_nodes(&last_p);
    let (t, len) = text_nodes[0].clone();
    let range = adapter.make_range(&t, 0, &t, len);

    let config = LocatorConfig::new();
    let serializer = Serializer::new(&config);
    serializer
        .serialize(&adapter, &range, SerializeOptions::default())
        .expect("non-empty selection serializes")
}

/// Same paragraphs, wrapped in an intervening `<section class="wrapper">`.
/// The L2 path captured over [`build_paragraph_tree_no_ids`] encodes
/// `main > p:nth-of-type(n)` and no longer resolves, while the `p.item`
/// tag/class signature L3 ranks on survives (spec.md S3).
pub fn build_wrapped_paragraph_tree(count: usize) -> (MemTree, ElementId) {
    let mut tree = MemTree::new();
    let root = tree.root();
    let main = tree.append_element(root, "main");
    tree.set_classes(main, &["app"]);
    let section = tree.append_element(main, "section");
    tree.set_classes(section, &["wrapper"]);

    let mut last_p = section;
    for n in 0..count {
        let p = tree.append_element(section, "p");
        tree.set_classes(p, &["item"]);
        tree.append_text(p, &format!("paragraph number {n} body text"));
        last_p = p;
    }
    (tree, last_p)
}

/// Same paragraphs rebuilt as `<div class="block">`, breaking L3's exact
/// `query_all("p")` lookup entirely while staying in `p`'s semantic tag
/// group, so only L4's expansion table (spec.md §4.7) finds it (spec.md
/// S4).
pub fn build_div_paragraph_tree(count: usize) -> (MemTree, ElementId) {
    let mut tree = MemTree::new();
    let root = tree.root();
    let main = tree.append_element(root, "main");
    tree.set_classes(main, &["app"]);

    let mut last_p = main;
    for n in 0..count {
        let p = tree.append_element(main, "div");
        tree.set_classes(p, &["block"]);
        tree.append_text(p, &format!("paragraph number {n} body text"));
        last_p = p;
    }
    (tree, last_p)
}

/// A tree sharing none of the original's tags, classes, or text — every
/// layer is attempted and every layer fails (spec.md S5, the §8.4 cascade
/// failure envelope).
pub fn build_unrelated_tree(count: usize) -> MemTree {
    let mut tree = MemTree::new();
    let root = tree.root();
    let nav = tree.append_element(root, "nav");
    tree.set_classes(nav, &["menu"]);
    for n in 0..count {
        let li = tree.append_element(nav, "li");
        tree.set_classes(li, &["entry"]);
        tree.append_text(li, &format!("menu link {n}"));
    }
    tree
}
