//! Textual rendering of a node tree.
//!
//! All rendering goes through [`RenderTask`], an explicit-stack walker that
//! can stop at any node boundary. [`Node::render`] drives it to completion in
//! one go; [`render_async`] suspends whenever the [`FrameBudget`] runs out.
//! Both produce byte-identical output for the same options.
//!
//! Layout:
//!
//! - object: `{"StbTypeAssembly": "<tag>", "<field>": <node>, ...}`
//! - array: `[{"StbTypeAssembly": "<tag>"}, <node>, ...]`
//! - primitive array: `[{"IsStbPrimitiveArray": true}, {"StbTypeAssembly": "<tag>"}, <values>...]`
//!
//! Type tags are only written when [`RenderOptions::emit_type_tags`] is set.
//! An untagged array whose first item is a tagged empty object would read
//! back as a tagged array, so it gets a leading `{"StbTypeAssembly": null}`.
//! Pretty mode puts every entry on its own line, indented two spaces per
//! depth level.

use crate::frame_budget::{yield_now, FrameBudget};
use crate::node::{
    Node, ObjectNode, PrimitiveArrayNode, PRIMITIVE_ARRAY_MARKER_KEY, TYPE_TAG_KEY,
};
use crate::primitive::write_quoted;

const INDENT: &str = "  ";

/// Formatting switches for rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub pretty_print: bool,
    pub emit_type_tags: bool,
}

impl RenderOptions {
    pub fn pretty() -> Self {
        Self {
            pretty_print: true,
            emit_type_tags: true,
        }
    }

    pub fn compact() -> Self {
        Self {
            pretty_print: false,
            emit_type_tags: true,
        }
    }
}

/// Outcome of one [`RenderTask::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    /// The budget ran out; call `step` again to continue.
    Suspended,
    /// The whole tree has been written.
    Finished,
}

struct Frame<'a> {
    children: &'a [Node],
    next: usize,
    depth: usize,
    has_entries: bool,
    keyed: bool,
}

/// Resumable renderer for one node tree.
pub struct RenderTask<'a> {
    options: RenderOptions,
    budget: FrameBudget,
    buffer: String,
    pending_root: Option<&'a Node>,
    root_depth: usize,
    stack: Vec<Frame<'a>>,
    suspensions: usize,
}

impl<'a> RenderTask<'a> {
    pub fn new(root: &'a Node, options: RenderOptions, budget: FrameBudget) -> Self {
        Self::with_depth(root, options, budget, 0)
    }

    /// Render `root` as if it sat `depth` levels deep (affects indentation).
    pub fn with_depth(
        root: &'a Node,
        options: RenderOptions,
        budget: FrameBudget,
        depth: usize,
    ) -> Self {
        Self {
            options,
            budget,
            buffer: String::new(),
            pending_root: Some(root),
            root_depth: depth,
            stack: Vec::new(),
            suspensions: 0,
        }
    }

    /// Render until the budget asks for a suspension or the tree is done.
    pub fn step(&mut self) -> RenderStatus {
        if let Some(root) = self.pending_root.take() {
            self.enter(root, self.root_depth);
            if self.out_of_budget() {
                return RenderStatus::Suspended;
            }
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                return RenderStatus::Finished;
            };
            let children: &'a [Node] = frame.children;
            match children.get(frame.next) {
                Some(child) => {
                    frame.next += 1;
                    let depth = frame.depth + 1;
                    let keyed = frame.keyed;
                    let separate = std::mem::replace(&mut frame.has_entries, true);

                    self.begin_entry(separate, depth);
                    if keyed {
                        self.write_key(child.name().unwrap_or(""));
                    }
                    self.enter(child, depth);
                    if self.out_of_budget() {
                        return RenderStatus::Suspended;
                    }
                }
                None => {
                    let (keyed, depth, has_entries) = (frame.keyed, frame.depth, frame.has_entries);
                    self.stack.pop();
                    self.close(if keyed { '}' } else { ']' }, depth, has_entries);
                }
            }
        }
    }

    /// Step until finished, ignoring suspensions.
    pub fn run_to_end(&mut self) {
        while self.step() == RenderStatus::Suspended {}
    }

    pub fn is_finished(&self) -> bool {
        self.pending_root.is_none() && self.stack.is_empty()
    }

    /// How many times the task has suspended so far.
    pub fn suspensions(&self) -> usize {
        self.suspensions
    }

    /// Text written so far.
    pub fn output(&self) -> &str {
        &self.buffer
    }

    pub fn into_output(self) -> String {
        self.buffer
    }

    fn out_of_budget(&mut self) -> bool {
        if self.budget.should_yield() {
            self.suspensions += 1;
            log::trace!(
                "render suspended after {} bytes (suspension #{})",
                self.buffer.len(),
                self.suspensions
            );
            true
        } else {
            false
        }
    }

    fn enter(&mut self, node: &'a Node, depth: usize) {
        match node {
            Node::Scalar(n) => n.value.write_token(&mut self.buffer),
            Node::PrimitiveArray(n) => self.write_primitive_array(n, depth),
            Node::Object(n) => {
                self.buffer.push('{');
                let mut has_entries = false;
                if let Some(tag) = self.emitted_tag(n.type_tag.as_deref()) {
                    self.begin_entry(false, depth + 1);
                    self.write_key(TYPE_TAG_KEY);
                    write_quoted(&mut self.buffer, tag);
                    has_entries = true;
                }
                self.stack.push(Frame {
                    children: n.children(),
                    next: 0,
                    depth,
                    has_entries,
                    keyed: true,
                });
            }
            Node::Array(n) => {
                self.buffer.push('[');
                let mut has_entries = false;
                let tag = self.emitted_tag(n.type_tag.as_deref());
                let first_reads_as_tag = matches!(
                    n.items().first(),
                    Some(Node::Object(item)) if self.is_lone_tag(item)
                );
                if tag.is_some() || first_reads_as_tag {
                    self.begin_entry(false, depth + 1);
                    self.write_tag_marker(tag);
                    has_entries = true;
                }
                self.stack.push(Frame {
                    children: n.items(),
                    next: 0,
                    depth,
                    has_entries,
                    keyed: false,
                });
            }
        }
    }

    fn write_primitive_array(&mut self, node: &PrimitiveArrayNode, depth: usize) {
        self.buffer.push('[');
        self.begin_entry(false, depth + 1);
        self.buffer.push('{');
        self.write_key(PRIMITIVE_ARRAY_MARKER_KEY);
        self.buffer.push_str("true}");
        if let Some(tag) = self.emitted_tag(node.type_tag.as_deref()) {
            self.begin_entry(true, depth + 1);
            self.write_tag_marker(Some(tag));
        }
        for value in node.values.iter() {
            self.begin_entry(true, depth + 1);
            value.write_token(&mut self.buffer);
        }
        self.close(']', depth, true);
    }

    fn emitted_tag<'t>(&self, tag: Option<&'t str>) -> Option<&'t str> {
        tag.filter(|_| self.options.emit_type_tags)
    }

    /// An object rendered as nothing but its tag.
    fn is_lone_tag(&self, object: &ObjectNode) -> bool {
        object.is_empty() && self.emitted_tag(object.type_tag.as_deref()).is_some()
    }

    fn write_tag_marker(&mut self, tag: Option<&str>) {
        self.buffer.push('{');
        self.write_key(TYPE_TAG_KEY);
        match tag {
            Some(tag) => write_quoted(&mut self.buffer, tag),
            None => self.buffer.push_str("null"),
        }
        self.buffer.push('}');
    }

    fn begin_entry(&mut self, separate: bool, depth: usize) {
        if separate {
            self.buffer.push(',');
        }
        if self.options.pretty_print {
            self.buffer.push('\n');
            self.indent(depth);
        }
    }

    fn write_key(&mut self, key: &str) {
        write_quoted(&mut self.buffer, key);
        self.buffer.push(':');
        if self.options.pretty_print {
            self.buffer.push(' ');
        }
    }

    fn close(&mut self, bracket: char, depth: usize, has_entries: bool) {
        if has_entries && self.options.pretty_print {
            self.buffer.push('\n');
            self.indent(depth);
        }
        self.buffer.push(bracket);
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.buffer.push_str(INDENT);
        }
    }
}

impl Node {
    /// Append the textual form of this node and its subtree to `buffer`.
    ///
    /// `depth` is the indentation level of the node itself; the root of a
    /// document uses 0.
    pub fn render(&self, buffer: &mut String, options: RenderOptions, depth: usize) {
        let mut task = RenderTask::with_depth(self, options, FrameBudget::unbounded(), depth);
        task.run_to_end();
        buffer.push_str(task.output());
    }

    pub fn render_to_string(&self, options: RenderOptions) -> String {
        let mut task = RenderTask::new(self, options, FrameBudget::unbounded());
        task.run_to_end();
        task.into_output()
    }
}

/// Render `node`, suspending once each time `budget` is exhausted.
///
/// Callers awaiting this future must tolerate any number of suspensions.
pub async fn render_async(node: &Node, options: RenderOptions, budget: FrameBudget) -> String {
    let mut task = RenderTask::new(node, options, budget);
    while task.step() == RenderStatus::Suspended {
        yield_now().await;
    }
    task.into_output()
}
