// src/generation/source.rs
//! Source emission for synthesized implementations
//!
//! Renders a descriptor as a typed Rust wrapper over `Proxy::invoke_index`,
//! one method per vtable entry. Persisted files are named after the
//! descriptor's structural fingerprint so a rerun overwrites the same file.

use crate::model::{ParamMode, TypeRef};
use crate::proxy::{GeneratedMember, ProxyTypeDescriptor};
use crate::utils::errors::Result;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "crate", "else", "enum", "fn", "for", "if", "impl", "in", "let",
    "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self", "static", "struct",
    "super", "trait", "type", "use", "where", "while",
];

/// Rust source renderer for descriptors
#[derive(Debug, Clone, Default)]
pub struct SourceEmitter {
    header: Option<String>,
}

impl SourceEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comment line written above the generated wrapper
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Render the wrapper source
    pub fn render(&self, descriptor: &ProxyTypeDescriptor) -> String {
        let struct_name = type_ident(descriptor.name());
        let mut out = String::new();

        if let Some(header) = &self.header {
            let _ = writeln!(out, "// {}", header);
        }
        let _ = writeln!(out, "// generated from {}", descriptor.key());
        let _ = writeln!(out, "// fingerprint {}", descriptor.fingerprint());
        out.push('\n');
        out.push_str("use dynaproxy::model::{TypeRef, Value};\n");
        out.push_str("use dynaproxy::proxy::Proxy;\n");
        out.push_str("use std::sync::Arc;\n\n");

        let _ = writeln!(out, "/// Typed wrapper over `{}`", descriptor.name());
        let _ = writeln!(out, "pub struct {} {{", struct_name);
        out.push_str("    inner: Arc<Proxy>,\n");
        out.push_str("}\n\n");
        let _ = writeln!(out, "impl {} {{", struct_name);
        out.push_str("    pub fn new(inner: Arc<Proxy>) -> Self {\n");
        out.push_str("        Self { inner }\n");
        out.push_str("    }\n");

        let mut counts: HashMap<String, usize> = HashMap::new();
        for member in descriptor.members() {
            *counts.entry(snake_ident(member.name())).or_default() += 1;
        }

        for member in descriptor.members() {
            let base = snake_ident(member.name());
            let method = if counts.get(&base).copied().unwrap_or(0) > 1 {
                format!("{}_{}", base, member.index())
            } else {
                base
            };
            out.push('\n');
            render_method(&mut out, member, &method);
        }

        out.push_str("}\n");
        out
    }

    /// Write the rendered source to `<dir>/<fingerprint>.rs`
    pub fn persist(&self, descriptor: &ProxyTypeDescriptor, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.rs", descriptor.fingerprint()));
        fs::write(&path, self.render(descriptor))?;

        info!("Persisted source for {} to {}", descriptor.name(), path.display());
        Ok(path)
    }
}

fn render_method(out: &mut String, member: &GeneratedMember, method: &str) {
    let signature = member.member().signature();
    let generic = signature.is_generic();

    let mut params = vec!["&self".to_string()];
    if generic {
        params.push("generic_args: &[TypeRef]".to_string());
    }
    let names: Vec<String> = signature.params.iter().map(|p| snake_ident(&p.name)).collect();
    for (param, name) in signature.params.iter().zip(&names) {
        match param.mode {
            ParamMode::In => params.push(format!("{}: Value", name)),
            ParamMode::Ref | ParamMode::Out => params.push(format!("{}: &mut Value", name)),
        }
    }

    let _ = writeln!(
        out,
        "    /// `{}` -> {}",
        member.shape(),
        describe_return(&signature.returns)
    );
    let _ = writeln!(
        out,
        "    pub fn {}({}) -> anyhow::Result<Value> {{",
        method,
        params.join(", ")
    );

    let slots: Vec<String> = signature
        .params
        .iter()
        .zip(&names)
        .map(|(param, name)| match param.mode {
            ParamMode::In => name.clone(),
            ParamMode::Ref | ParamMode::Out => format!("std::mem::replace({}, Value::Unit)", name),
        })
        .collect();
    let generic_args = if generic { "generic_args" } else { "&[]" };

    let _ = writeln!(out, "        let mut args = [{}];", slots.join(", "));
    let _ = writeln!(
        out,
        "        let result = self.inner.invoke_index({}, {}, &mut args);",
        member.index(),
        generic_args
    );
    for slot in member.by_ref_slots() {
        if let Some(name) = names.get(*slot) {
            let _ = writeln!(
                out,
                "        *{} = std::mem::replace(&mut args[{}], Value::Unit);",
                name, slot
            );
        }
    }
    out.push_str("        result\n");
    out.push_str("    }\n");
}

fn describe_return(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Unit => "()".to_string(),
        other => other.to_string(),
    }
}

fn type_ident(name: &str) -> String {
    let ident: String = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if ident.is_empty() {
        "GeneratedProxy".to_string()
    } else {
        ident
    }
}

fn snake_ident(name: &str) -> String {
    let mut ident = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                ident.push('_');
            }
            ident.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            ident.push(c);
            prev_lower = true;
        } else if !ident.ends_with('_') {
            ident.push('_');
            prev_lower = false;
        }
    }

    let ident = ident.trim_matches('_').to_string();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("m_{}", ident)
    } else if KEYWORDS.contains(&ident.as_str()) {
        format!("{}_", ident)
    } else {
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::request::ProxyRequest;
    use crate::model::{MemberBuilder, TypeBuilder};
    use crate::proxy::ProxyGenerator;
    use tempfile::TempDir;

    fn descriptor() -> std::sync::Arc<ProxyTypeDescriptor> {
        let repo = TypeBuilder::interface("IRepository")
            .member(
                MemberBuilder::method("FindById")
                    .param("id", TypeRef::Int)
                    .returns(TypeRef::Str),
            )
            .member(
                MemberBuilder::method("TryLoad")
                    .param("type", TypeRef::Str)
                    .out_param("value", TypeRef::Int)
                    .returns(TypeRef::Bool),
            )
            .member(MemberBuilder::method("Get").generic("T").returns(TypeRef::param("T")))
            .build()
            .unwrap();

        ProxyGenerator::default()
            .generate(&ProxyRequest::for_interfaces(&[repo]))
            .unwrap()
    }

    #[test]
    fn test_render_wrapper() {
        let source = SourceEmitter::new().with_header("do not edit").render(&descriptor());

        assert!(source.starts_with("// do not edit\n"));
        assert!(source.contains("pub struct ProxiesIRepositoryProxy {"));
        assert!(source.contains("pub fn find_by_id(&self, id: Value) -> anyhow::Result<Value> {"));
        assert!(source.contains("self.inner.invoke_index(0, &[], &mut args);"));
        assert!(source.contains("pub fn try_load(&self, type_: Value, value: &mut Value)"));
        assert!(source.contains("*value = std::mem::replace(&mut args[1], Value::Unit);"));
        assert!(source.contains("pub fn get(&self, generic_args: &[TypeRef])"));
    }

    #[test]
    fn test_persist_by_fingerprint() {
        let dir = TempDir::new().unwrap();
        let descriptor = descriptor();
        let emitter = SourceEmitter::new();

        let path = emitter.persist(&descriptor, dir.path()).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("{}.rs", descriptor.fingerprint()).as_str())
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), emitter.render(&descriptor));

        // Same shape lands on the same file
        let again = emitter.persist(&descriptor, dir.path()).unwrap();
        assert_eq!(path, again);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(snake_ident("FindById"), "find_by_id");
        assert_eq!(snake_ident("get_Value"), "get_value");
        assert_eq!(snake_ident("Match"), "match_");
        assert_eq!(snake_ident("2fa"), "m_2fa");
        assert_eq!(type_ident("Proxies.IRepositoryProxy"), "ProxiesIRepositoryProxy");
    }
}
