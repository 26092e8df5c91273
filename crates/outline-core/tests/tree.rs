use outline_core::{DetachedElement, ElementId, ElementSnapshot, Note, TreeError};
use pretty_assertions::assert_eq;

struct Fixture {
    note: Note,
    first: ElementId,
    second: ElementId,
    child: ElementId,
    third: ElementId,
}

fn fixture() -> Fixture {
    let mut note = Note::new("Tree");
    let root = note.root();
    let first = note.add_child(root, DetachedElement::new("first")).unwrap();
    let second = note.add_child(root, DetachedElement::new("second")).unwrap();
    let child = note.add_child(second, DetachedElement::new("child")).unwrap();
    let third = note.add_child(root, DetachedElement::new("third")).unwrap();
    Fixture {
        note,
        first,
        second,
        child,
        third,
    }
}

#[test]
fn print_tree_indents_by_depth() {
    let f = fixture();
    assert_eq!(
        f.note.print_tree(),
        "Tree\n    - first\n    - second\n        - child\n    - third\n"
    );
}

#[test]
fn insert_after_none_prepends_and_index_is_clamped() {
    let mut f = fixture();
    let root = f.note.root();
    let head = f
        .note
        .insert_after(root, DetachedElement::new("head"), None)
        .unwrap();
    let tail = f
        .note
        .insert(root, DetachedElement::new("tail"), 99)
        .unwrap();

    assert_eq!(
        f.note.children(root),
        &[head, f.first, f.second, f.third, tail]
    );
    let after_first = f
        .note
        .insert_after(root, DetachedElement::new("x"), Some(f.first))
        .unwrap();
    assert_eq!(f.note.index_in_parent(after_first), Some(2));
}

#[test]
fn siblings_and_visibility() {
    let mut f = fixture();
    let n = &f.note;
    assert_eq!(n.previous_sibling(f.first), None);
    assert_eq!(n.next_sibling(f.first), Some(f.second));
    assert_eq!(n.previous_visible(f.third), Some(f.child));
    assert_eq!(n.previous_visible(f.child), Some(f.second));
    assert_eq!(n.previous_visible(f.first), None);
    assert_eq!(n.next_visible(f.second), Some(f.child));
    assert_eq!(n.next_visible(f.child), Some(f.third));
    assert_eq!(n.highest_next_sibling(f.child), Some(f.third));
    assert_eq!(n.next_visible(f.third), None);
    assert_eq!(n.deepest_child(f.second), f.child);
    assert_eq!(n.depth(f.child), 1);

    f.note.set_open(f.second, false).unwrap();
    assert_eq!(f.note.previous_visible(f.third), Some(f.second));
    assert_eq!(f.note.next_visible(f.second), Some(f.third));
}

#[test]
fn remove_returns_the_whole_subtree() {
    let mut f = fixture();
    let before = f.note.clone();
    let removed = f.note.remove(f.second).unwrap();

    assert_eq!(removed.ids(), vec![f.second, f.child]);
    assert!(!f.note.contains(f.child));
    assert_eq!(f.note.len(), 3);

    f.note.insert(f.note.root(), removed, 1).unwrap();
    assert_eq!(f.note, before);
}

#[test]
fn remove_child_checks_the_parent() {
    let mut f = fixture();
    let root = f.note.root();
    assert_eq!(
        f.note.remove_child(root, f.child).unwrap_err(),
        TreeError::NotAChild {
            parent: root,
            child: f.child
        }
    );
    assert_eq!(f.note.remove(root).unwrap_err(), TreeError::Root(root));
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut f = fixture();
    let root = f.note.root();
    let copy = f.note.subtree(f.second).unwrap();
    assert_eq!(
        f.note.insert(root, copy, 0).unwrap_err(),
        TreeError::DuplicateId(f.second)
    );
}

#[test]
fn move_into_own_subtree_is_a_cycle() {
    let mut f = fixture();
    assert_eq!(
        f.note.move_element(f.second, f.child, 0).unwrap_err(),
        TreeError::Cycle(f.second)
    );
    f.note.move_element(f.third, f.first, 0).unwrap();
    assert_eq!(f.note.parent(f.third), Some(f.first));
    assert_eq!(f.note.find_element(f.first, f.third).map(|e| e.id()), Some(f.third));
    assert!(f.note.find_element(f.second, f.third).is_none());
}

#[test]
fn transaction_restores_on_error() {
    let mut f = fixture();
    let before = f.note.clone();
    let result: Result<(), TreeError> = f.note.transaction(|note| {
        note.remove(f.first)?;
        note.move_element(f.second, f.child, 0)
    });

    assert_eq!(result, Err(TreeError::Cycle(f.second)));
    assert_eq!(f.note, before);
}

#[test]
fn snapshot_restores_same_ids() {
    let mut f = fixture();
    let before = f.note.clone();
    let snapshot = ElementSnapshot::encode(&f.note.subtree(f.second).unwrap()).unwrap();

    f.note.remove(f.second).unwrap();
    f.note
        .insert(f.note.root(), snapshot.decode().unwrap(), 1)
        .unwrap();

    assert_eq!(f.note, before);
}
