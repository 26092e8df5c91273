use outline_core::{
    CommandManager, DEFAULT_MAX_UNDO, DetachedElement, EditCommand, EditSession, ElementId,
    ElementRef, HistoryConfig, HistoryEntry, IncreaseIndentation, InsertText, Note, NoteStore,
    Notes,
};
use pretty_assertions::assert_eq;

const NOTE: &str = "History";

struct Fixture {
    session: EditSession,
    history: CommandManager<EditCommand>,
    a: ElementRef,
    b: ElementRef,
}

impl Fixture {
    fn new(config: HistoryConfig) -> anyhow::Result<Self> {
        let mut note = Note::new(NOTE);
        let root = note.root();
        let a = note.add_child(root, DetachedElement::new("alpha"))?;
        let b = note.add_child(root, DetachedElement::new("beta"))?;
        Ok(Self {
            a: note.reference(a),
            b: note.reference(b),
            session: EditSession::new(Notes::from_iter([note])),
            history: CommandManager::new(config),
        })
    }

    fn run(&mut self, command: impl Into<EditCommand>) -> bool {
        self.history.run(command.into(), &mut self.session)
    }

    fn note(&self) -> &Note {
        self.session.note(NOTE).unwrap()
    }

    fn text(&self, element: &ElementRef) -> String {
        self.note().text(element.element).unwrap().text()
    }

    fn remove(&mut self, element: &ElementRef) -> DetachedElement {
        self.session
            .note_mut(NOTE)
            .unwrap()
            .remove(element.element)
            .unwrap()
    }
}

#[test]
fn config_defaults() -> anyhow::Result<()> {
    let config: HistoryConfig = serde_json::from_str("{}")?;
    assert_eq!(config.max_undo, DEFAULT_MAX_UNDO);

    let config: HistoryConfig = serde_json::from_str(r#"{ "max_undo": 0 }"#)?;
    assert_eq!(config.with_defaults().max_undo, 200);
    Ok(())
}

#[test]
fn oldest_entries_are_dropped_past_the_limit() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig { max_undo: 2 })?;
    for word in ["one ", "two ", "three "] {
        assert!(f.run(InsertText::new(f.a.clone(), word, 0)));
    }
    assert_eq!(f.history.undo_depth(), 2);

    assert!(f.history.undo(&mut f.session));
    assert!(f.history.undo(&mut f.session));
    assert!(!f.history.undo(&mut f.session));
    assert_eq!(f.text(&f.a), "one alpha");
    Ok(())
}

#[test]
fn group_undoes_and_redoes_as_one() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    let before = f.note().clone();

    f.history.begin_group("Indent and type");
    assert!(f.run(InsertText::new(f.b.clone(), "!", 4)));
    assert!(f.run(IncreaseIndentation::new(f.b.clone())));
    f.history.end_group();

    assert_eq!(f.history.undo_depth(), 1);
    let Some(HistoryEntry::Group(group)) = f.history.undo_entries().next() else {
        panic!("expected a group entry");
    };
    assert_eq!(group.name(), "Indent and type");
    assert_eq!(group.commands().len(), 2);

    assert!(f.history.undo(&mut f.session));
    assert_eq!(f.note(), &before);

    assert!(f.history.redo(&mut f.session));
    assert_eq!(f.text(&f.b), "beta!");
    assert_eq!(f.note().parent(f.b.element), Some(f.a.element));
    Ok(())
}

#[test]
fn single_command_group_is_unwrapped_and_empty_group_dropped() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;

    f.history.begin_group("empty");
    f.history.end_group();
    assert!(f.history.is_empty());

    f.history.begin_group("one");
    f.run(InsertText::new(f.a.clone(), "x", 0));
    f.history.end_group();
    assert!(matches!(
        f.history.undo_entries().next(),
        Some(HistoryEntry::Single(EditCommand::InsertText(_)))
    ));
    Ok(())
}

#[test]
fn failure_inside_group_rolls_it_back() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    let before = f.note().clone();

    f.history.begin_group("Broken");
    assert!(f.run(InsertText::new(f.a.clone(), "typed ", 0)));
    assert!(!f.run(IncreaseIndentation::new(f.a.clone())));
    assert_eq!(f.note(), &before);

    assert!(!f.run(InsertText::new(f.b.clone(), "ignored", 0)));
    f.history.end_group();

    assert!(!f.history.can_undo());
    assert_eq!(f.note(), &before);

    assert!(f.run(InsertText::new(f.b.clone(), "after ", 0)));
    assert_eq!(f.history.undo_depth(), 1);
    Ok(())
}

#[test]
fn nested_groups_extend_the_outer_group() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;

    f.history.begin_group("outer");
    f.run(InsertText::new(f.a.clone(), "1", 0));
    f.history.begin_group("inner");
    f.run(InsertText::new(f.b.clone(), "2", 0));
    f.history.end_group();
    assert!(f.history.is_grouping());
    f.run(IncreaseIndentation::new(f.b.clone()));
    f.history.end_group();

    assert_eq!(f.history.undo_depth(), 1);
    assert!(f.history.undo(&mut f.session));
    assert_eq!(f.text(&f.a), "alpha");
    assert_eq!(f.text(&f.b), "beta");
    Ok(())
}

#[test]
fn undo_closes_an_open_group() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    f.history.begin_group("typing");
    f.run(InsertText::new(f.a.clone(), "x", 0));
    f.run(InsertText::new(f.b.clone(), "y", 0));

    assert!(f.history.undo(&mut f.session));
    assert!(!f.history.is_grouping());
    assert_eq!(f.text(&f.a), "alpha");
    assert_eq!(f.text(&f.b), "beta");
    Ok(())
}

#[test]
fn failed_undo_keeps_the_entry() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    assert!(f.run(InsertText::new(f.a.clone(), "x", 0)));
    let a = f.a.clone();
    f.remove(&a);

    assert!(!f.history.undo(&mut f.session));
    assert!(f.history.can_undo());
    assert!(!f.history.can_redo());
    Ok(())
}

#[test]
fn failed_group_undo_rolls_forward() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    f.history.begin_group("pair");
    f.run(InsertText::new(f.a.clone(), "x", 0));
    f.run(InsertText::new(f.b.clone(), "y", 0));
    f.history.end_group();

    let a = f.a.clone();
    f.remove(&a);

    assert!(!f.history.undo(&mut f.session));
    assert_eq!(f.text(&f.b), "ybeta");
    assert_eq!(f.history.undo_depth(), 1);
    assert_eq!(f.history.redo_depth(), 0);
    Ok(())
}

#[test]
fn redo_after_external_change_can_fail() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    assert!(f.run(InsertText::new(f.a.clone(), "x", 5)));
    assert!(f.history.undo(&mut f.session));

    f.session
        .note_mut(NOTE)
        .unwrap()
        .text_mut(f.a.element)?
        .remove(3, 0)?;

    assert!(!f.history.redo(&mut f.session));
    assert!(f.history.can_redo());
    assert_eq!(f.text(&f.a), "ha");
    Ok(())
}

#[test]
fn unknown_element_is_refused() -> anyhow::Result<()> {
    let mut f = Fixture::new(HistoryConfig::default())?;
    let ghost = ElementRef::new(NOTE, ElementId::new());
    assert!(!f.run(InsertText::new(ghost, "boo", 0)));
    assert!(f.history.is_empty());
    Ok(())
}
