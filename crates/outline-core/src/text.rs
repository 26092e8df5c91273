use std::fmt;
use std::mem;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::ElementId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Attribute {
    Strong,
    Emphasis,
    Strikethrough,
    Underline,
    Link(String),
    InternalLink(ElementId),
}

impl Attribute {
    pub fn is_link(&self) -> bool {
        matches!(self, Attribute::Link(_) | Attribute::InternalLink(_))
    }

    /// Attributes with the same tag are interchangeable for removal, whatever their payload.
    pub fn same_tag(&self, other: &Attribute) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl Run {
    pub fn new(text: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            text: text.into(),
            attributes,
        }
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("position {position} out of bounds (length {len})")]
    OutOfBounds { position: usize, len: usize },
    #[error("invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
}

/// Outcome of [`AttributedText::split_run_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSplit {
    /// Index of the first run starting at the split position.
    pub index: usize,
    /// Number of runs created by the split (0 or 1).
    pub inserted: usize,
}

/// Text made of attributed runs, addressed by character offset.
///
/// There is always at least one run; an empty text is a single empty run.
/// Every mutation leaves the runs normalized: attribute sets sorted, adjacent
/// runs with equal attributes merged and empty runs dropped. The one exception
/// is [`split_run_at`](Self::split_run_at) with `create_empty_runs`, which keeps
/// the empty runs it creates until the next mutation normalizes them away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Run>", into = "Vec<Run>")]
pub struct AttributedText {
    runs: Vec<Run>,
}

impl Default for AttributedText {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<Vec<Run>> for AttributedText {
    fn from(runs: Vec<Run>) -> Self {
        let mut text = Self { runs };
        text.normalize();
        text
    }
}

impl From<AttributedText> for Vec<Run> {
    fn from(text: AttributedText) -> Self {
        text.runs
    }
}

impl From<&str> for AttributedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for AttributedText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for AttributedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for run in &self.runs {
            f.write_str(&run.text)?;
        }
        Ok(())
    }
}

impl AttributedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_attributes(text, Vec::new())
    }

    pub fn with_attributes(text: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self::from(vec![Run::new(text, attributes)])
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(Run::is_empty)
    }

    pub fn whole_range(&self) -> Range<usize> {
        0..self.len()
    }

    fn check_position(&self, position: usize) -> Result<(), TextError> {
        let len = self.len();
        if position > len {
            return Err(TextError::OutOfBounds { position, len });
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), TextError> {
        if range.start > range.end {
            return Err(TextError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        self.check_position(range.end)
    }

    /// First run whose span contains `position` (boundaries belong to the left run).
    fn locate(&self, position: usize) -> (usize, usize) {
        let mut start = 0;
        for (ix, run) in self.runs.iter().enumerate() {
            let len = run.len();
            if position <= start + len {
                return (ix, position - start);
            }
            start += len;
        }
        let last = self.runs.len() - 1;
        (last, self.runs[last].len())
    }

    /// Split the run containing `position` in two.
    ///
    /// Without `create_empty_runs` a position already on a run boundary is left
    /// untouched and reports zero inserted runs. With it a run is always
    /// inserted, even an empty one (so an empty text ends up with two empty runs).
    pub fn split_run_at(
        &mut self,
        position: usize,
        create_empty_runs: bool,
    ) -> Result<RunSplit, TextError> {
        self.check_position(position)?;
        let (ix, offset) = self.locate(position);
        let len = self.runs[ix].len();

        if !create_empty_runs {
            if offset == 0 {
                return Ok(RunSplit {
                    index: ix,
                    inserted: 0,
                });
            }
            if offset == len {
                return Ok(RunSplit {
                    index: ix + 1,
                    inserted: 0,
                });
            }
        }

        let run = &mut self.runs[ix];
        let split = byte_offset(&run.text, offset);
        let tail = Run::new(run.text[split..].to_string(), run.attributes.clone());
        run.text.truncate(split);
        self.runs.insert(ix + 1, tail);
        Ok(RunSplit {
            index: ix + 1,
            inserted: 1,
        })
    }

    /// Insert plain text, inheriting the attributes of the run it lands in.
    pub fn insert(&mut self, text: &str, position: usize) -> Result<(), TextError> {
        self.check_position(position)?;
        if text.is_empty() {
            return Ok(());
        }
        let (ix, offset) = self.locate(position);
        let run = &mut self.runs[ix];
        let at = byte_offset(&run.text, offset);
        run.text.insert_str(at, text);
        self.normalize();
        Ok(())
    }

    pub fn insert_with_attributes(
        &mut self,
        text: &str,
        position: usize,
        attributes: &[Attribute],
    ) -> Result<(), TextError> {
        self.check_position(position)?;
        if text.is_empty() {
            return Ok(());
        }
        let split = self.split_run_at(position, false)?;
        self.runs
            .insert(split.index, Run::new(text, attributes.to_vec()));
        self.normalize();
        Ok(())
    }

    pub fn insert_text(&mut self, text: &AttributedText, position: usize) -> Result<(), TextError> {
        self.check_position(position)?;
        let mut at = position;
        for run in &text.runs {
            self.insert_with_attributes(&run.text, at, &run.attributes)?;
            at += run.len();
        }
        Ok(())
    }

    pub fn remove(&mut self, count: usize, position: usize) -> Result<(), TextError> {
        let end = position
            .checked_add(count)
            .ok_or(TextError::InvalidRange {
                start: position,
                end: usize::MAX,
            })?;
        self.check_range(&(position..end))?;
        if count == 0 {
            return Ok(());
        }
        let first = self.split_run_at(position, false)?.index;
        let last = self.split_run_at(end, false)?.index;
        self.runs.drain(first..last);
        self.normalize();
        Ok(())
    }

    pub fn remove_subrange(&mut self, range: Range<usize>) -> Result<(), TextError> {
        self.check_range(&range)?;
        self.remove(range.len(), range.start)
    }

    pub fn replace_subrange(
        &mut self,
        range: Range<usize>,
        with: &AttributedText,
    ) -> Result<(), TextError> {
        self.check_range(&range)?;
        self.remove(range.len(), range.start)?;
        self.insert_text(with, range.start)
    }

    pub fn extract(&self, range: Range<usize>) -> Result<AttributedText, TextError> {
        self.check_range(&range)?;
        let len = self.len();
        let mut out = self.clone();
        out.remove(len - range.end, range.end)?;
        out.remove(range.start, 0)?;
        Ok(out)
    }

    pub fn prefix(&self, count: usize) -> Result<AttributedText, TextError> {
        self.extract(0..count)
    }

    pub fn suffix(&self, count: usize) -> Result<AttributedText, TextError> {
        let len = self.len();
        let start = len.checked_sub(count).ok_or(TextError::OutOfBounds {
            position: count,
            len,
        })?;
        self.extract(start..len)
    }

    /// Append plain text to the last run.
    pub fn append(&mut self, text: &str) {
        if let Some(last) = self.runs.last_mut() {
            last.text.push_str(text);
        }
        self.normalize();
    }

    pub fn append_text(&mut self, text: &AttributedText) {
        self.runs.extend(text.runs.iter().cloned());
        self.normalize();
    }

    fn map_attributes(
        &mut self,
        range: Range<usize>,
        apply: impl Fn(&mut Vec<Attribute>),
    ) -> Result<(), TextError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let first = self.split_run_at(range.start, false)?.index;
        let last = self.split_run_at(range.end, false)?.index;
        for run in &mut self.runs[first..last] {
            apply(&mut run.attributes);
        }
        self.normalize();
        Ok(())
    }

    pub fn add_attributes(
        &mut self,
        attributes: &[Attribute],
        range: Range<usize>,
    ) -> Result<(), TextError> {
        self.map_attributes(range, |current| {
            for attribute in attributes {
                if !current.contains(attribute) {
                    current.push(attribute.clone());
                }
            }
        })
    }

    pub fn set_attributes(
        &mut self,
        attributes: &[Attribute],
        range: Range<usize>,
    ) -> Result<(), TextError> {
        self.map_attributes(range, |current| *current = attributes.to_vec())
    }

    pub fn remove_attributes(
        &mut self,
        attributes: &[Attribute],
        range: Range<usize>,
    ) -> Result<(), TextError> {
        self.map_attributes(range, |current| {
            current.retain(|a| !attributes.iter().any(|r| r.same_tag(a)));
        })
    }

    /// True when any run overlapping `range` carries an attribute with the same tag.
    pub fn contains_attribute(
        &self,
        attribute: &Attribute,
        range: Range<usize>,
    ) -> Result<bool, TextError> {
        let sub = self.extract(range)?;
        Ok(sub
            .runs
            .iter()
            .filter(|run| !run.is_empty())
            .any(|run| run.attributes.iter().any(|a| a.same_tag(attribute))))
    }

    /// Returns true if the attribute was added, false if it was removed.
    pub fn toggle_attribute(
        &mut self,
        attribute: &Attribute,
        range: Range<usize>,
    ) -> Result<bool, TextError> {
        if self.contains_attribute(attribute, range.clone())? {
            self.remove_attributes(std::slice::from_ref(attribute), range)?;
            Ok(false)
        } else {
            self.add_attributes(std::slice::from_ref(attribute), range)?;
            Ok(true)
        }
    }

    /// Attributes a caret at `position` types with. Links never carry over.
    pub fn attributes_at(&self, position: usize) -> Vec<Attribute> {
        let mut start = 0;
        let mut touching: Vec<&Run> = Vec::new();
        for run in &self.runs {
            let end = start + run.len();
            if start <= position && position <= end {
                touching.push(run);
                if touching.len() == 2 {
                    break;
                }
            } else if start > position {
                break;
            }
            start = end;
        }

        let has_link = |run: &Run| run.attributes.iter().any(Attribute::is_link);
        let chosen = match touching.as_slice() {
            [] => return Vec::new(),
            [only] => *only,
            [first, second, ..] => {
                if !has_link(first) {
                    *first
                } else if !has_link(second) {
                    *second
                } else {
                    *first
                }
            }
        };
        chosen
            .attributes
            .iter()
            .filter(|a| !a.is_link())
            .cloned()
            .collect()
    }

    pub fn internal_links(&self) -> Vec<(Range<usize>, ElementId)> {
        let mut links = Vec::new();
        let mut start = 0;
        for run in &self.runs {
            let end = start + run.len();
            for attribute in &run.attributes {
                if let Attribute::InternalLink(id) = attribute {
                    links.push((start..end, *id));
                }
            }
            start = end;
        }
        links
    }

    fn normalize(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for mut run in self.runs.drain(..) {
            if run.text.is_empty() {
                continue;
            }
            run.attributes.sort();
            run.attributes.dedup();
            match merged.last_mut() {
                Some(last) if last.attributes == run.attributes => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        if merged.is_empty() {
            merged.push(Run::default());
        }
        self.runs = merged;
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(ix, _)| ix)
        .unwrap_or(text.len())
}
