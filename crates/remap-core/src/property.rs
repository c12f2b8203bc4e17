//! Properties and property path expressions.
//!
//! A path is resolved against an owner type into a chain of `Property`
//! steps. Supported syntax:
//!
//! | Expression        | Meaning                                          |
//! |-------------------|--------------------------------------------------|
//! | `a.b.c`           | nested property                                  |
//! | `a[2]`            | array or list element                            |
//! | `a['k']`          | map value under a string key                     |
//! | `a{b}`            | property `b` of every element of `a`             |
//! | `a{}`             | every element of `a` itself                      |
//!
//! `{...}` may nest (`a{b{c}}`) and must close the expression.

use crate::error::{MappingError, Result};
use crate::value::Value;
use dashmap::DashMap;
use remap_types::{TypeId, TypeInterner, TypeResolver};
use std::sync::Arc;
use tracing::trace;

/// How a step reaches its value from the value of the previous step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Field,
    ArrayIndex(usize),
    ListIndex(usize),
    MapKey(Arc<str>),
    /// The element itself, written `{}`.
    SelfElement,
}

#[derive(Clone, Debug)]
pub struct Property {
    /// Field name, `[n]`, `['k']` or empty for a self element.
    pub name: Arc<str>,
    /// Path from the owner without any element part, e.g. `address.city`.
    pub path: Arc<str>,
    /// Full expression including the element part, e.g. `names{first}`.
    pub expression: Arc<str>,
    pub ty: TypeId,
    pub readable: bool,
    pub writable: bool,
    pub kind: PropertyKind,
    /// Previous step of a nested path.
    pub container: Option<Arc<Property>>,
    /// Property of each element, relative to the element type.
    pub element: Option<Arc<Property>>,
}

impl Property {
    pub fn field(name: &str, ty: TypeId, readable: bool, writable: bool) -> Self {
        let name: Arc<str> = Arc::from(name);
        Self {
            path: name.clone(),
            expression: name.clone(),
            name,
            ty,
            readable,
            writable,
            kind: PropertyKind::Field,
            container: None,
            element: None,
        }
    }

    /// The `{}` property of an element of type `ty`.
    pub fn self_element(ty: TypeId) -> Self {
        let empty: Arc<str> = Arc::from("");
        Self {
            name: empty.clone(),
            path: empty.clone(),
            expression: empty,
            ty,
            readable: true,
            writable: false,
            kind: PropertyKind::SelfElement,
            container: None,
            element: None,
        }
    }

    /// Copy of this property that addresses `element` on every element.
    pub fn with_element(&self, element: Arc<Property>) -> Property {
        let mut prop = self.clone();
        prop.expression = Arc::from(format!("{}{{{}}}", self.path, element.expression));
        prop.element = Some(element);
        prop
    }

    pub fn is_self(&self) -> bool {
        self.kind == PropertyKind::SelfElement
    }

    /// `true` for `a{...}` paths.
    pub fn has_element(&self) -> bool {
        self.element.is_some()
    }

    /// Number of `{}` levels.
    pub fn element_depth(&self) -> usize {
        match &self.element {
            Some(el) => 1 + el.element_depth(),
            None => 0,
        }
    }

    /// `true` for a path of more than one step.
    pub fn is_nested(&self) -> bool {
        self.container.is_some()
    }

    /// Steps from the owner to this property, outermost first.
    pub fn steps(&self) -> Vec<&Property> {
        let mut steps = vec![self];
        let mut current = self;
        while let Some(container) = current.container.as_deref() {
            steps.push(container);
            current = container;
        }
        steps.reverse();
        steps
    }

    /// Value of this single step given the value of the previous step.
    pub fn read_from(&self, owner: &Value) -> Value {
        match &self.kind {
            PropertyKind::Field => owner.get(&self.name),
            PropertyKind::ArrayIndex(i) | PropertyKind::ListIndex(i) => owner
                .as_seq()
                .and_then(|seq| seq.get(*i))
                .unwrap_or(Value::Null),
            PropertyKind::MapKey(key) => owner
                .as_map()
                .and_then(|map| map.get(&Value::Str(key.clone())))
                .unwrap_or(Value::Null),
            PropertyKind::SelfElement => owner.clone(),
        }
    }

    /// Value of the whole path starting at `root`. A null step short-circuits.
    pub fn read(&self, root: &Value) -> Value {
        let mut value = root.clone();
        for step in self.steps() {
            if value.is_null() {
                return Value::Null;
            }
            value = step.read_from(&value);
        }
        value
    }

    /// Store `value` through this single step on `owner`.
    pub fn write_to(&self, owner: &Value, value: Value) -> Result<()> {
        match &self.kind {
            PropertyKind::Field => {
                let obj = owner.as_object().ok_or_else(|| self.owner_mismatch("an object"))?;
                obj.set(&self.name, value);
                Ok(())
            }
            PropertyKind::ArrayIndex(i) | PropertyKind::ListIndex(i) => {
                let seq = owner.as_seq().ok_or_else(|| self.owner_mismatch("a sequence"))?;
                if seq.set(*i, value) {
                    Ok(())
                } else {
                    Err(MappingError::IndexOutOfBounds {
                        property: self.path.to_string(),
                        index: *i,
                        len: seq.len(),
                    })
                }
            }
            PropertyKind::MapKey(key) => {
                let map = owner.as_map().ok_or_else(|| self.owner_mismatch("a map"))?;
                map.insert(Value::Str(key.clone()), value);
                Ok(())
            }
            PropertyKind::SelfElement => {
                Err(MappingError::NotWritable(self.expression.to_string()))
            }
        }
    }

    fn owner_mismatch(&self, expected: &str) -> MappingError {
        MappingError::ValueMismatch {
            expected: format!("{expected} holding `{}`", self.path),
            found: "a different value".to_string(),
        }
    }
}

// =============================================================================
// Property discovery
// =============================================================================

/// Source of the properties of a type.
pub trait PropertyResolver: Send + Sync {
    /// All properties of `owner`, with types resolved against it.
    fn properties(&self, types: &TypeInterner, owner: TypeId) -> Result<Arc<[Arc<Property>]>>;

    fn property(
        &self,
        types: &TypeInterner,
        owner: TypeId,
        name: &str,
    ) -> Result<Option<Arc<Property>>> {
        Ok(self
            .properties(types, owner)?
            .iter()
            .find(|p| &*p.name == name)
            .cloned())
    }
}

/// Resolves properties from the declarations registered with the interner.
#[derive(Default)]
pub struct DeclaredPropertyResolver {
    cache: DashMap<TypeId, Arc<[Arc<Property>]>>,
}

impl DeclaredPropertyResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyResolver for DeclaredPropertyResolver {
    fn properties(&self, types: &TypeInterner, owner: TypeId) -> Result<Arc<[Arc<Property>]>> {
        if let Some(hit) = self.cache.get(&owner) {
            return Ok(hit.value().clone());
        }
        let mut resolver = TypeResolver::new(types);
        let mut props = Vec::new();
        for (declaring, decl) in resolver.declared_properties(owner)? {
            let ty = resolver.resolve_ref(&decl.ty, declaring, Some(owner))?;
            props.push(Arc::new(Property::field(
                &decl.name,
                ty,
                decl.readable,
                decl.writable,
            )));
        }
        trace!(owner = owner.0, count = props.len(), "resolved properties");
        let props: Arc<[Arc<Property>]> = props.into();
        Ok(self.cache.entry(owner).or_insert(props).value().clone())
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Name(String),
    Index(usize),
    Key(String),
}

#[derive(Debug)]
struct Segment {
    steps: Vec<Step>,
    element: Option<String>,
}

struct ExpressionParser<'e> {
    expression: &'e str,
    chars: Vec<char>,
    pos: usize,
}

impl<'e> ExpressionParser<'e> {
    fn new(expression: &'e str) -> Self {
        Self {
            expression,
            chars: expression.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> MappingError {
        MappingError::InvalidExpression {
            expression: self.expression.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        loop {
            segments.push(self.segment()?);
            match self.peek() {
                None => return Ok(segments),
                Some('.') if segments.last().is_some_and(|s| s.element.is_none()) => {
                    self.pos += 1;
                }
                Some('.') => return Err(self.error("nothing may follow an element expression")),
                Some(c) => return Err(self.error(format!("unexpected `{c}` at {}", self.pos))),
            }
        }
    }

    fn segment(&mut self) -> Result<Segment> {
        let name = self.identifier()?;
        let mut steps = vec![Step::Name(name)];
        while self.peek() == Some('[') {
            self.pos += 1;
            steps.push(self.index()?);
        }
        let element = if self.peek() == Some('{') {
            Some(self.braced()?)
        } else {
            None
        };
        Ok(Segment { steps, element })
    }

    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error(format!("expected a property name at {start}")));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn index(&mut self) -> Result<Step> {
        if self.peek() == Some('\'') {
            self.pos += 1;
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c == '\'' {
                    break;
                }
                self.pos += 1;
            }
            let key: String = self.chars[start..self.pos].iter().collect();
            if self.peek() != Some('\'') {
                return Err(self.error("unterminated map key"));
            }
            self.pos += 1;
            self.expect(']')?;
            return Ok(Step::Key(key));
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let index = digits
            .parse::<usize>()
            .map_err(|_| self.error(format!("expected an index at {start}")))?;
        self.expect(']')?;
        Ok(Step::Index(index))
    }

    /// Text between a `{` and its matching `}`.
    fn braced(&mut self) -> Result<String> {
        self.pos += 1;
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(inner.trim().to_string());
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error("unbalanced `{`"))
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}` at {}", self.pos)))
        }
    }
}

/// Resolve `expression` against `owner`.
pub fn resolve_expression(
    resolver: &dyn PropertyResolver,
    types: &TypeInterner,
    owner: TypeId,
    expression: &str,
) -> Result<Arc<Property>> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(MappingError::InvalidExpression {
            expression: String::new(),
            reason: "empty expression".to_string(),
        });
    }
    let segments = ExpressionParser::new(expression).parse()?;

    let mut current: Option<Arc<Property>> = None;
    let mut current_owner = owner;
    for segment in segments {
        for step in segment.steps {
            let prop = match step {
                Step::Name(name) => {
                    let found = resolver.property(types, current_owner, &name)?.ok_or_else(|| {
                        MappingError::UnknownProperty {
                            owner: types.type_name(current_owner),
                            path: expression.to_string(),
                        }
                    })?;
                    let mut prop = (*found).clone();
                    if let Some(container) = &current {
                        prop.path = Arc::from(format!("{}.{}", container.path, name));
                        prop.expression = prop.path.clone();
                    }
                    prop.container = current.take();
                    prop
                }
                Step::Index(index) => {
                    let container = current
                        .take()
                        .ok_or_else(|| invalid(expression, "index without a property"))?;
                    let kind = if types.is_array(container.ty) {
                        PropertyKind::ArrayIndex(index)
                    } else if types.is_collection(container.ty) {
                        PropertyKind::ListIndex(index)
                    } else {
                        return Err(invalid(expression, "indexed property is not an array or list"));
                    };
                    let ty = types.element_type(container.ty).unwrap_or(TypeId::OBJECT);
                    indexed(container, kind, &format!("[{index}]"), ty)
                }
                Step::Key(key) => {
                    let container = current
                        .take()
                        .ok_or_else(|| invalid(expression, "key without a property"))?;
                    if !types.is_map(container.ty) {
                        return Err(invalid(expression, "keyed property is not a map"));
                    }
                    let (_, ty) = types.map_key_value(container.ty);
                    let name = format!("['{key}']");
                    indexed(container, PropertyKind::MapKey(Arc::from(key.as_str())), &name, ty)
                }
            };
            current_owner = prop.ty;
            current = Some(Arc::new(prop));
        }

        if let Some(inner) = segment.element {
            let container = current
                .take()
                .ok_or_else(|| invalid(expression, "element without a property"))?;
            let element_ty = types.element_type(container.ty).ok_or_else(|| {
                invalid(expression, "`{}` applied to a property that is not multi-occurrence")
            })?;
            let element = if inner.is_empty() {
                Arc::new(Property::self_element(element_ty))
            } else {
                resolve_expression(resolver, types, element_ty, &inner)?
            };
            current = Some(Arc::new(container.with_element(element)));
        }
    }
    current.ok_or_else(|| invalid(expression, "empty expression"))
}

fn indexed(container: Arc<Property>, kind: PropertyKind, name: &str, ty: TypeId) -> Property {
    let path: Arc<str> = Arc::from(format!("{}{}", container.path, name));
    Property {
        name: Arc::from(name),
        expression: path.clone(),
        path,
        ty,
        readable: container.readable,
        writable: container.readable,
        kind,
        container: Some(container),
        element: None,
    }
}

fn invalid(expression: &str, reason: &str) -> MappingError {
    MappingError::InvalidExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/property_tests.rs"]
mod tests;
