//! Tree-structured prompt builder with token budgeting.

use crate::error::PromptError;
use crate::tokenizer::Tokenizer;
use log::debug;
use std::sync::Arc;

/// Context-window limits for the model a prompt is built for.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub model_id: String,
    pub max_token_count: usize,
}

/// Handle to a section in a [`PromptBuilder`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionId(usize);

/// Outcome of an `add_text` call that fit, or an optional one that did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTextResult {
    pub did_fit: bool,
    pub token_count: usize,
    pub available_before: usize,
    pub available_after: usize,
}

enum Child {
    Section(usize),
    Text { token_count: usize, text: String },
}

struct Node {
    name: String,
    reserved: Option<usize>,
    parent: Option<usize>,
    children: Vec<Child>,
}

/// Assembles a prompt as a tree of sections with optional token reservations.
///
/// Text is measured before being appended. A reserved section can never grow
/// past its reservation, and the whole tree can never grow past
/// `max_token_count - reserved_output_tokens`.
pub struct PromptBuilder {
    model_info: ModelInfo,
    reserved_output_tokens: usize,
    tokenizer: Arc<dyn Tokenizer>,
    nodes: Vec<Node>,
}

impl PromptBuilder {
    pub fn new(
        model_info: ModelInfo,
        reserved_output_tokens: usize,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        Self {
            model_info,
            reserved_output_tokens,
            tokenizer,
            nodes: vec![Node {
                name: "root".to_string(),
                reserved: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root section of the tree.
    pub fn root(&self) -> SectionId {
        SectionId(0)
    }

    /// Add a child section, optionally reserving tokens from the parent's
    /// budget up front.
    pub fn add_section(
        &mut self,
        parent: SectionId,
        name: impl Into<String>,
        reserve: Option<usize>,
    ) -> Result<SectionId, PromptError> {
        let name = name.into();
        if let Some(requested) = reserve {
            let available = self.available_tokens(parent);
            if requested > available {
                return Err(PromptError::ReservationExceedsBudget {
                    section: name,
                    requested,
                    available,
                });
            }
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            name,
            reserved: reserve,
            parent: Some(parent.0),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(Child::Section(index));
        Ok(SectionId(index))
    }

    /// Tokens a section may still accept.
    ///
    /// A reserved section answers against its own reservation. An unreserved
    /// section shares its parent's budget, since its content already counts
    /// toward the parent's allocation.
    pub fn available_tokens(&self, section: SectionId) -> usize {
        let node = &self.nodes[section.0];
        match (node.reserved, node.parent) {
            (Some(reserved), _) => reserved.saturating_sub(self.allocated_tokens(section.0)),
            (None, Some(parent)) => self.available_tokens(SectionId(parent)),
            (None, None) => self
                .model_info
                .max_token_count
                .saturating_sub(self.reserved_output_tokens)
                .saturating_sub(self.allocated_tokens(section.0)),
        }
    }

    /// Append text, failing if it does not fit the section's budget.
    pub fn add_text(
        &mut self,
        section: SectionId,
        text: impl Into<String>,
    ) -> Result<AddTextResult, PromptError> {
        let text = text.into();
        match self.try_append(section, text) {
            Ok(result) => Ok(result),
            Err((text, token_count, available)) => Err(PromptError::DoesNotFit {
                section: self.nodes[section.0].name.clone(),
                token_count,
                available,
                usage_summary: self.usage_summary(),
                text,
            }),
        }
    }

    /// Append text followed by a newline, failing if it does not fit.
    pub fn add_line(
        &mut self,
        section: SectionId,
        text: impl AsRef<str>,
    ) -> Result<AddTextResult, PromptError> {
        self.add_text(section, format!("{}\n", text.as_ref()))
    }

    /// Append text if it fits; on a miss, reports `did_fit = false` and
    /// leaves the tree untouched.
    pub fn add_text_optional(&mut self, section: SectionId, text: impl Into<String>) -> AddTextResult {
        let text = text.into();
        match self.try_append(section, text) {
            Ok(result) => result,
            Err((_, token_count, available)) => {
                debug!(
                    "optional text skipped (section={}, token_count={}, available={})",
                    self.nodes[section.0].name, token_count, available
                );
                AddTextResult {
                    did_fit: false,
                    token_count,
                    available_before: available,
                    available_after: available,
                }
            }
        }
    }

    /// Append a line if it fits; mutation-free on a miss.
    pub fn add_line_optional(&mut self, section: SectionId, text: impl AsRef<str>) -> AddTextResult {
        self.add_text_optional(section, format!("{}\n", text.as_ref()))
    }

    /// Total tokens currently allocated across the whole tree.
    pub fn total_tokens(&self) -> usize {
        self.allocated_tokens(0)
    }

    /// Human-readable allocation breakdown, one line per section.
    pub fn usage_summary(&self) -> String {
        let mut lines = Vec::new();
        self.summarize(0, 0, &mut lines);
        lines.join("\n")
    }

    /// Concatenate all entries depth-first into the final prompt text.
    pub fn build_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(0, &mut out);
        out
    }

    fn try_append(
        &mut self,
        section: SectionId,
        text: String,
    ) -> Result<AddTextResult, (String, usize, usize)> {
        let token_count = self.tokenizer.count_tokens(&text);
        let available_before = self.available_tokens(section);
        if token_count > available_before {
            return Err((text, token_count, available_before));
        }
        self.nodes[section.0]
            .children
            .push(Child::Text { token_count, text });
        Ok(AddTextResult {
            did_fit: true,
            token_count,
            available_before,
            available_after: available_before - token_count,
        })
    }

    /// Tokens counted against a node's budget: entry tokens, plus each child
    /// section at its reservation (pre-committed) or its own allocation.
    fn allocated_tokens(&self, index: usize) -> usize {
        self.nodes[index]
            .children
            .iter()
            .map(|child| match child {
                Child::Section(child_index) => match self.nodes[*child_index].reserved {
                    Some(reserved) => reserved.max(self.allocated_tokens(*child_index)),
                    None => self.allocated_tokens(*child_index),
                },
                Child::Text { token_count, .. } => *token_count,
            })
            .sum()
    }

    fn summarize(&self, index: usize, depth: usize, lines: &mut Vec<String>) {
        let node = &self.nodes[index];
        let allocated = self.allocated_tokens(index);
        let reservation = match node.reserved {
            Some(reserved) => format!(" (reserved {reserved})"),
            None => String::new(),
        };
        lines.push(format!(
            "{}{}: {} tokens{}",
            "  ".repeat(depth),
            node.name,
            allocated,
            reservation
        ));
        for child in &node.children {
            if let Child::Section(child_index) = child {
                self.summarize(*child_index, depth + 1, lines);
            }
        }
    }

    fn collect_text(&self, index: usize, out: &mut String) {
        for child in &self.nodes[index].children {
            match child {
                Child::Section(child_index) => self.collect_text(*child_index, out),
                Child::Text { text, .. } => out.push_str(text),
            }
        }
    }
}
