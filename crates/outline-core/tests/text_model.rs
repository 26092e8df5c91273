use outline_core::{AttributedText, Attribute, ElementId, Run, TextError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn styled() -> AttributedText {
    AttributedText::from(vec![
        Run::new("plain ", Vec::new()),
        Run::new("bold", vec![Attribute::Strong]),
        Run::new(" tail", Vec::new()),
    ])
}

#[test]
fn insert_inherits_attributes_of_the_run() {
    let mut text = AttributedText::with_attributes("bold", vec![Attribute::Strong]);
    text.insert("er", 4).unwrap();

    assert_eq!(text.text(), "bolder");
    assert_eq!(
        text.runs(),
        &[Run::new("bolder", vec![Attribute::Strong])]
    );
}

#[test]
fn insert_with_attributes_creates_a_run() {
    let mut text = AttributedText::new("hello world");
    text.insert_with_attributes("big ", 6, &[Attribute::Emphasis])
        .unwrap();

    assert_eq!(
        text.runs(),
        &[
            Run::new("hello ", Vec::new()),
            Run::new("big ", vec![Attribute::Emphasis]),
            Run::new("world", Vec::new()),
        ]
    );
}

#[test]
fn remove_spans_several_runs() {
    let mut text = AttributedText::from(vec![
        Run::new("ab", Vec::new()),
        Run::new("cd", vec![Attribute::Strong]),
        Run::new("ef", Vec::new()),
    ]);
    text.remove(2, 1).unwrap();

    assert_eq!(
        text.runs(),
        &[
            Run::new("a", Vec::new()),
            Run::new("d", vec![Attribute::Strong]),
            Run::new("ef", Vec::new()),
        ]
    );
}

#[test]
fn extract_keeps_attributes() {
    let text = styled();
    let sub = text.extract(4..8).unwrap();

    assert_eq!(
        sub.runs(),
        &[
            Run::new("n ", Vec::new()),
            Run::new("bo", vec![Attribute::Strong]),
        ]
    );
    assert_eq!(text.prefix(3).unwrap().text(), "pla");
    assert_eq!(text.suffix(4).unwrap().text(), "tail");
    assert_eq!(
        text.suffix(16),
        Err(TextError::OutOfBounds {
            position: 16,
            len: 15
        })
    );
}

#[test]
fn invalid_range_is_rejected() {
    let text = styled();
    let start = 5;
    let end = 2;
    assert_eq!(
        text.extract(start..end),
        Err(TextError::InvalidRange { start: 5, end: 2 })
    );
}

#[test]
fn adjacent_runs_with_equal_attributes_merge() {
    let mut text = AttributedText::new("hello world");
    text.add_attributes(&[Attribute::Strong], 0..5).unwrap();
    assert_eq!(text.runs().len(), 2);

    text.add_attributes(&[Attribute::Strong], 5..11).unwrap();
    assert_eq!(
        text.runs(),
        &[Run::new("hello world", vec![Attribute::Strong])]
    );
}

#[test]
fn attribute_order_does_not_split_runs() {
    let text = AttributedText::from(vec![
        Run::new("ab", vec![Attribute::Strong, Attribute::Emphasis]),
        Run::new("cd", vec![Attribute::Emphasis, Attribute::Strong]),
    ]);
    assert_eq!(text.runs().len(), 1);
}

#[test]
fn remove_attributes_matches_by_tag() {
    let mut text = AttributedText::with_attributes(
        "link",
        vec![Attribute::Link("https://example.com".into()), Attribute::Strong],
    );
    text.remove_attributes(&[Attribute::Link(String::new())], 0..4)
        .unwrap();

    assert_eq!(text.runs(), &[Run::new("link", vec![Attribute::Strong])]);
}

#[test]
fn toggle_attribute_applies_then_removes() {
    let mut text = AttributedText::new("hello");

    assert!(text.toggle_attribute(&Attribute::Emphasis, 1..3).unwrap());
    assert!(text.contains_attribute(&Attribute::Emphasis, 1..3).unwrap());
    assert_eq!(text.runs().len(), 3);

    assert!(!text.toggle_attribute(&Attribute::Emphasis, 1..3).unwrap());
    assert_eq!(text, AttributedText::new("hello"));
}

#[test]
fn replace_subrange_swaps_text() {
    let mut text = AttributedText::new("some text");
    text.replace_subrange(5..9, &AttributedText::new("words"))
        .unwrap();
    assert_eq!(text.text(), "some words");
}

#[test]
fn internal_links_report_their_range() {
    let id = ElementId::new();
    let text = AttributedText::from(vec![
        Run::new("see ", Vec::new()),
        Run::new("target", vec![Attribute::InternalLink(id)]),
    ]);
    assert_eq!(text.internal_links(), vec![(4..10, id)]);
}

#[test]
fn deserialized_runs_are_normalized() {
    let text: AttributedText =
        serde_json::from_str(r#"[{"text":"a"},{"text":""},{"text":"b"}]"#).unwrap();
    assert_eq!(text.runs(), &[Run::new("ab", Vec::new())]);
    assert_eq!(serde_json::to_string(&text).unwrap(), r#"[{"text":"ab"}]"#);
}

#[derive(Debug, Clone)]
enum TextOp {
    Insert(String, usize),
    Remove(usize, usize),
    Bold(usize, usize),
    Unbold(usize, usize),
}

fn text_op() -> impl Strategy<Value = TextOp> {
    prop_oneof![
        ("[a-cé ]{0,4}", any::<usize>()).prop_map(|(s, at)| TextOp::Insert(s, at)),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| TextOp::Remove(a, b)),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| TextOp::Bold(a, b)),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| TextOp::Unbold(a, b)),
    ]
}

fn span(len: usize, a: usize, b: usize) -> (usize, usize) {
    let a = a % (len + 1);
    let b = b % (len + 1);
    (a.min(b), a.max(b))
}

proptest! {
    #[test]
    fn runs_stay_normalized(ops in prop::collection::vec(text_op(), 0..24)) {
        let mut text = AttributedText::new("");
        let mut model: Vec<char> = Vec::new();

        for op in ops {
            let len = model.len();
            match op {
                TextOp::Insert(s, at) => {
                    let at = at % (len + 1);
                    text.insert(&s, at).unwrap();
                    for (offset, c) in s.chars().enumerate() {
                        model.insert(at + offset, c);
                    }
                }
                TextOp::Remove(a, b) => {
                    let (start, end) = span(len, a, b);
                    text.remove_subrange(start..end).unwrap();
                    model.drain(start..end);
                }
                TextOp::Bold(a, b) => {
                    let (start, end) = span(len, a, b);
                    text.add_attributes(&[Attribute::Strong], start..end).unwrap();
                }
                TextOp::Unbold(a, b) => {
                    let (start, end) = span(len, a, b);
                    text.remove_attributes(&[Attribute::Strong], start..end).unwrap();
                }
            }

            prop_assert_eq!(text.text(), model.iter().collect::<String>());
            prop_assert_eq!(text.len(), model.len());

            let runs = text.runs();
            prop_assert!(!runs.is_empty());
            if runs.len() > 1 {
                prop_assert!(runs.iter().all(|run| !run.is_empty()));
            }
            for pair in runs.windows(2) {
                prop_assert_ne!(&pair[0].attributes, &pair[1].attributes);
            }
        }
    }
}
