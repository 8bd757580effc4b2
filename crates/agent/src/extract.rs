//! Tool-call recovery from model output.
//!
//! Structured backends hand back `tool_calls` directly; text backends bury
//! the same intent somewhere in free text. The extractor runs a fixed list of
//! patterns, in priority order, over one assistant message and returns a
//! deduplicated list of calls:
//!
//! 1. native structured `tool_calls`
//! 2. a known tool name immediately followed by a JSON object
//! 3. a known tool name alone on its own line
//! 4. a generic `{"name": ..., "arguments": {...}}` object
//! 5. `tool_name("single string")` call syntax
//! 6. `<tool_call>...</tool_call>` tags, only when nothing else matched
//!
//! A `{"type": "FINISH", "summary": ...}` object anywhere in the text wins
//! over everything else.

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::LazyLock;

use majordome_core::message::MessageToolCall;
use majordome_core::tool::{ToolCall, ToolRegistry};
use regex_lite::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// `name {` with optional whitespace (newlines included) before the brace.
static NAME_BEFORE_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\{").expect("name-object regex"));

/// `name("arg")`, `name('arg')` or `name(“arg”)`.
static CALL_SYNTAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*(?:"([^"]*)"|'([^']*)'|“([^”]*)”)\s*\)"#)
        .expect("call-syntax regex")
});

static TOOL_CALL_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<tool_call>(.*?)</tool_call>").expect("tool_call tag regex")
});

/// What one assistant message asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The model signalled it is done; nothing is dispatched.
    Finish { summary: String },

    /// Tool calls to dispatch, in order. Empty means a plain answer.
    Calls(Vec<ToolCall>),
}

impl Extraction {
    /// The calls, or an empty slice for a finish signal.
    pub fn calls(&self) -> &[ToolCall] {
        match self {
            Extraction::Calls(calls) => calls,
            Extraction::Finish { .. } => &[],
        }
    }
}

/// A balanced `{...}` span of the text and its parse, if it is valid JSON.
#[derive(Debug)]
struct ScannedObject {
    span: Range<usize>,
    value: Option<Value>,
}

/// Every balanced object of one message, nested ones included.
struct Scan {
    /// Ordered by start offset, so an enclosing object precedes its children
    objects: Vec<ScannedObject>,

    /// Outermost valid objects; disjoint and ordered
    roots: Vec<Range<usize>>,
}

impl Scan {
    fn new(content: &str) -> Self {
        let objects = scan_objects(content);
        let mut roots: Vec<Range<usize>> = Vec::new();
        for object in objects.iter().filter(|o| o.value.is_some()) {
            if roots.last().is_some_and(|r| object.span.start < r.end) {
                continue;
            }
            roots.push(object.span.clone());
        }
        Self { objects, roots }
    }

    /// Whether `pos` lies strictly inside a valid JSON object.
    fn inside_json(&self, pos: usize) -> bool {
        let idx = self.roots.partition_point(|r| r.start < pos);
        idx > 0 && pos < self.roots[idx - 1].end
    }

    /// The balanced object opening at byte `start`, if any.
    fn object_at(&self, start: usize) -> Option<&ScannedObject> {
        self.objects
            .binary_search_by_key(&start, |o| o.span.start)
            .ok()
            .map(|i| &self.objects[i])
    }

    fn values(&self) -> impl Iterator<Item = &Value> {
        self.objects.iter().filter_map(|o| o.value.as_ref())
    }
}

/// Disjoint text spans already turned into calls.
#[derive(Default)]
struct Claims {
    /// start -> end
    spans: BTreeMap<usize, usize>,
}

impl Claims {
    /// Claim `span` unless it overlaps an earlier claim.
    fn claim(&mut self, span: &Range<usize>) -> bool {
        // Claims are disjoint, so the closest one starting before `span.end`
        // is the only candidate for an overlap.
        let overlapping = self
            .spans
            .range(..span.end)
            .next_back()
            .is_some_and(|(_, &end)| end > span.start);
        if overlapping {
            return false;
        }
        self.spans.insert(span.start, span.end);
        true
    }

    fn is_free(&self, span: &Range<usize>) -> bool {
        !self
            .spans
            .range(..span.end)
            .next_back()
            .is_some_and(|(_, &end)| end > span.start)
    }
}

/// A call recovered from text, remembered with where it was found.
struct TextCall {
    position: usize,
    call: ToolCall,
}

/// Recovers tool calls for the tools of one registry.
pub struct ToolCallExtractor<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> ToolCallExtractor<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Extract the finish signal or the ordered, deduplicated calls.
    ///
    /// Native calls come first in the order given; text-derived calls follow
    /// in the order they appear in `content`.
    pub fn extract(&self, content: &str, native: &[MessageToolCall]) -> Extraction {
        let scan = Scan::new(content);

        if let Some(summary) = scan.values().find_map(finish_summary) {
            debug!("Finish signal found in model output");
            return Extraction::Finish { summary };
        }

        let mut seen = HashSet::new();
        let mut calls: Vec<ToolCall> = Vec::new();

        for tc in native {
            let call = ToolCall {
                id: if tc.id.is_empty() {
                    synthesized_id()
                } else {
                    tc.id.clone()
                },
                name: tc.name.clone(),
                arguments: parse_arguments(&Value::String(tc.arguments.clone())),
            };
            if seen.insert(tool_call_signature(&call.name, &call.arguments)) {
                calls.push(call);
            }
        }

        let mut claims = Claims::default();
        let mut text_calls: Vec<TextCall> = Vec::new();

        self.known_name_with_object(content, &scan, &mut claims, &mut text_calls);
        self.bare_name_lines(content, &scan, &mut claims, &mut text_calls);
        self.generic_objects(&scan, &mut claims, &mut text_calls);
        self.call_syntax(content, &scan, &mut claims, &mut text_calls);

        if calls.is_empty() && text_calls.is_empty() {
            self.tool_call_tags(content, &mut text_calls);
        }

        // Dedup in priority order (the order text_calls was filled), then
        // present the survivors in text order.
        let mut survivors: Vec<TextCall> = text_calls
            .into_iter()
            .filter(|tc| seen.insert(tool_call_signature(&tc.call.name, &tc.call.arguments)))
            .collect();
        survivors.sort_by_key(|tc| tc.position);
        calls.extend(survivors.into_iter().map(|tc| tc.call));

        if !calls.is_empty() {
            debug!(
                count = calls.len(),
                native = native.len(),
                "Extracted tool calls"
            );
        }
        Extraction::Calls(calls)
    }

    /// Pattern 2: `read_file {"path": "a.txt"}` or `get_time\n{}`.
    fn known_name_with_object(
        &self,
        content: &str,
        scan: &Scan,
        claims: &mut Claims,
        out: &mut Vec<TextCall>,
    ) {
        for caps in NAME_BEFORE_OBJECT_RE.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !self.registry.contains(name.as_str()) || scan.inside_json(whole.start()) {
                continue;
            }

            let brace = whole.end() - 1;
            let (span, arguments) = match scan.object_at(brace) {
                Some(object) => {
                    let arguments = object
                        .value
                        .clone()
                        .filter(Value::is_object)
                        .unwrap_or_else(empty_object);
                    (whole.start()..object.span.end, arguments)
                }
                None => (whole.start()..whole.end(), empty_object()),
            };

            if !claims.claim(&span) {
                continue;
            }
            out.push(TextCall {
                position: span.start,
                call: new_call(name.as_str(), arguments),
            });
        }
    }

    /// Pattern 3: a line holding nothing but a known tool name.
    fn bare_name_lines(
        &self,
        content: &str,
        scan: &Scan,
        claims: &mut Claims,
        out: &mut Vec<TextCall>,
    ) {
        let mut offset = 0;
        for line in content.split_inclusive('\n') {
            let span = offset..offset + line.len();
            offset += line.len();

            let name = line.trim();
            if name.is_empty()
                || !self.registry.contains(name)
                || scan.inside_json(span.start)
                || !claims.claim(&span)
            {
                continue;
            }
            out.push(TextCall {
                position: span.start,
                call: new_call(name, empty_object()),
            });
        }
    }

    /// Pattern 4: `{"name": "read_file", "arguments": {...}}` anywhere in the
    /// text, including inside wrappers such as `{"tool_calls": [...]}`.
    ///
    /// Objects are visited outermost first; once an envelope is claimed its
    /// argument objects can no longer be.
    fn generic_objects(&self, scan: &Scan, claims: &mut Claims, out: &mut Vec<TextCall>) {
        for object in &scan.objects {
            let Some(value) = &object.value else { continue };
            if !claims.is_free(&object.span) {
                continue;
            }
            let Some((name, arguments)) = self.envelope(value) else {
                continue;
            };
            claims.claim(&object.span);
            out.push(TextCall {
                position: object.span.start,
                call: new_call(&name, arguments),
            });
        }
    }

    /// Pattern 5: `read_file("notes.txt")`.
    fn call_syntax(
        &self,
        content: &str,
        scan: &Scan,
        claims: &mut Claims,
        out: &mut Vec<TextCall>,
    ) {
        for caps in CALL_SYNTAX_RE.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            let Some(field) = self.registry.positional_argument(name) else {
                continue;
            };
            let span = whole.start()..whole.end();
            if scan.inside_json(span.start) || !claims.claim(&span) {
                continue;
            }
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let mut arguments = Map::new();
            arguments.insert(field.to_string(), Value::String(value.to_string()));
            out.push(TextCall {
                position: span.start,
                call: new_call(name, Value::Object(arguments)),
            });
        }
    }

    /// Pattern 6: `<tool_call>{...}</tool_call>` or `<tool_call>get_time</tool_call>`.
    fn tool_call_tags(&self, content: &str, out: &mut Vec<TextCall>) {
        for caps in TOOL_CALL_TAG_RE.captures_iter(content) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let body = body.as_str().trim();

            let parsed = match find_json_end(body) {
                Some(len) => serde_json::from_str::<Value>(&body[..len])
                    .ok()
                    .and_then(|v| self.envelope(&v)),
                None if self.registry.contains(body) => Some((body.to_string(), empty_object())),
                None => None,
            };

            if let Some((name, arguments)) = parsed {
                out.push(TextCall {
                    position: whole.start(),
                    call: new_call(&name, arguments),
                });
            }
        }
    }

    /// Name and arguments of a call envelope naming a registered tool.
    ///
    /// Accepts `name`/`tool` for the name and `arguments`/`parameters`/`params`
    /// for the arguments, optionally nested under `function`.
    fn envelope(&self, value: &Value) -> Option<(String, Value)> {
        let obj = value.as_object()?;
        let target = obj
            .get("function")
            .and_then(Value::as_object)
            .unwrap_or(obj);

        let name = ["name", "tool"]
            .iter()
            .find_map(|k| target.get(*k).and_then(Value::as_str))?
            .trim();
        if !self.registry.contains(name) {
            return None;
        }

        let raw = ["arguments", "parameters", "params"]
            .iter()
            .find_map(|k| target.get(*k));
        let arguments = match raw {
            Some(raw) => parse_arguments(raw),
            None => empty_object(),
        };
        Some((name.to_string(), arguments))
    }
}

/// Summary of a finish signal, if `value` is one.
fn finish_summary(value: &Value) -> Option<String> {
    let kind = value.get("type")?.as_str()?;
    if !kind.eq_ignore_ascii_case("finish") {
        return None;
    }
    Some(match value.get("summary") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// Decode an arguments value; strings holding JSON are decoded, anything
/// that is not an object degrades to `{}`.
pub(crate) fn parse_arguments(raw: &Value) -> Value {
    let value = match raw {
        Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or(Value::Null),
        other => other.clone(),
    };
    if value.is_object() {
        value
    } else {
        empty_object()
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn synthesized_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

fn new_call(name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: synthesized_id(),
        name: name.to_string(),
        arguments,
    }
}

/// Every balanced `{...}` of the text, nested ones included, ordered by
/// start offset and parsed when valid JSON.
///
/// One left-to-right pass matching braces on a stack. Quotes only open a
/// string while a brace is open, and a newline ends any string (JSON strings
/// cannot hold one), so stray quotes in prose heal at the next line.
/// Unmatched braces are dropped without rescanning.
fn scan_objects(content: &str) -> Vec<ScannedObject> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in content.char_indices() {
        if in_string {
            match ch {
                '\n' => {
                    in_string = false;
                    escape_next = false;
                }
                _ if escape_next => escape_next = false,
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    spans.push(start..i + 1);
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|span| span.start);
    spans
        .into_iter()
        .map(|span| {
            let value = serde_json::from_str::<Value>(&content[span.clone()]).ok();
            ScannedObject { span, value }
        })
        .collect()
}

/// Byte length of the balanced object starting at `input[0] == '{'`.
///
/// Braces inside JSON strings (escapes honoured) do not count.
pub(crate) fn find_json_end(input: &str) -> Option<usize> {
    if !input.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in input.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Key-sorted copy of a JSON value, so that `{"a":1,"b":2}` and
/// `{"b":2,"a":1}` compare equal once serialized.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let mut ordered = Map::new();
            for key in keys {
                if let Some(child) = map.get(key) {
                    ordered.insert(key.clone(), canonicalize(child));
                }
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}

fn tool_call_signature(name: &str, arguments: &Value) -> (String, String) {
    (name.to_string(), canonicalize(arguments).to_string())
}
