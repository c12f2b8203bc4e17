//! Human-readable type names for diagnostics.

use crate::intern::TypeInterner;
use crate::types::{RawKind, TypeId};
use std::fmt::Write;

pub struct TypeFormatter<'a> {
    interner: &'a TypeInterner,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(interner: &'a TypeInterner) -> Self {
        Self { interner }
    }

    /// `Map<String, List<Integer>>`, `int[]`, `Enum<Color>`.
    pub fn format(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id, 0);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId, depth: u32) {
        if depth > 16 {
            out.push_str("...");
            return;
        }
        let Some(data) = self.interner.lookup(id) else {
            let _ = write!(out, "<unknown #{}>", id.0);
            return;
        };
        if data.kind == RawKind::Array {
            match data.arg(0) {
                Some(component) => self.write_type(out, component, depth + 1),
                None => out.push_str("Object"),
            }
            out.push_str("[]");
            return;
        }
        match self.interner.raw_def(data.raw) {
            Ok(def) => out.push_str(&def.name),
            Err(_) => {
                let _ = write!(out, "<raw #{}>", data.raw.0);
            }
        }
        if data.args.is_empty() {
            return;
        }
        out.push('<');
        for (i, arg) in data.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_type(out, *arg, depth + 1);
        }
        out.push('>');
    }
}

impl TypeInterner {
    pub fn type_name(&self, id: TypeId) -> String {
        TypeFormatter::new(self).format(id)
    }
}
