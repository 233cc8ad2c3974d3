// src/model/types.rs
//! Contract descriptions: interfaces, classes and their members
//!
//! A `TypeInfo` is immutable once built and shared through `Arc`. Member
//! lookup is by `CallShape` (name, parameter types and modes, generic arity),
//! which is also how interface members are matched against implementations.

use crate::model::metadata::MetadataEntry;
use crate::model::object::{Frame, Object};
use crate::model::value::{describe_values, TypeRef, Value};
use crate::utils::errors::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique contract identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u64);

impl TypeId {
    fn next() -> Self {
        TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Implementation of a class member
pub type MethodBody = Arc<dyn Fn(&Object, &mut Frame<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// Opaque object state produced by a constructor
pub type State = Box<dyn Any + Send + Sync>;

/// Constructor factory
pub type ConstructorFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<State> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Interface,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

/// How an argument flows between caller and callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamMode {
    In,
    /// Read and written; mutations are visible to the caller
    Ref,
    /// Written only; the incoming value is ignored
    Out,
}

impl ParamMode {
    pub fn is_by_ref(&self) -> bool {
        !matches!(self, ParamMode::In)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub mode: ParamMode,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            mode: ParamMode::In,
        }
    }
}

/// Member signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: TypeRef,
    pub generic_params: Vec<String>,
}

impl Signature {
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// Indices of parameters whose mutations flow back to the caller
    pub fn by_ref_slots(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.mode.is_by_ref())
            .map(|(i, _)| i)
            .collect()
    }

    /// Parameter type with generic arguments bound
    pub fn bound_param(&self, index: usize, generic_args: &[TypeRef]) -> Option<TypeRef> {
        self.params
            .get(index)
            .map(|p| p.ty.substitute(&self.generic_params, generic_args))
    }

    /// Return type with generic parameters renamed positionally, comparable
    /// across signatures that share a `CallShape`
    pub fn normalized_return(&self) -> TypeRef {
        normalize(&self.returns, &self.generic_params)
    }

    /// Return type with generic arguments bound
    pub fn bound_return(&self, generic_args: &[TypeRef]) -> TypeRef {
        self.returns.substitute(&self.generic_params, generic_args)
    }

    /// Check an argument list against this signature
    pub fn check_arguments(
        &self,
        args: &[Value],
        generic_args: &[TypeRef],
    ) -> std::result::Result<(), String> {
        if generic_args.len() != self.generic_params.len() {
            return Err(format!(
                "expected {} type arguments, got {}",
                self.generic_params.len(),
                generic_args.len()
            ));
        }

        if args.len() != self.params.len() {
            return Err(format!(
                "expected {} arguments, got {}",
                self.params.len(),
                args.len()
            ));
        }

        for (i, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if param.mode == ParamMode::Out {
                continue;
            }
            let ty = param.ty.substitute(&self.generic_params, generic_args);
            if !ty.admits(arg) {
                return Err(format!(
                    "argument {} ({}) expects {}, got {}",
                    i,
                    param.name,
                    ty,
                    arg.type_ref()
                ));
            }
        }

        Ok(())
    }
}

/// Generic parameters are renamed positionally so `Get<T>(T)` and `Get<U>(U)`
/// compare equal.
fn normalize(ty: &TypeRef, generic_params: &[String]) -> TypeRef {
    match ty {
        TypeRef::Param(name) => match generic_params.iter().position(|p| p == name) {
            Some(i) => TypeRef::Param(format!("#{}", i)),
            None => ty.clone(),
        },
        TypeRef::List(inner) => TypeRef::list(normalize(inner, generic_params)),
        other => other.clone(),
    }
}

/// Structural identity of a callable member
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallShape {
    pub name: String,
    pub params: Vec<(TypeRef, ParamMode)>,
    pub generic_arity: usize,
}

impl CallShape {
    pub fn of(name: &str, signature: &Signature) -> Self {
        Self {
            name: name.to_string(),
            params: signature
                .params
                .iter()
                .map(|p| (normalize(&p.ty, &signature.generic_params), p.mode))
                .collect(),
            generic_arity: signature.generic_params.len(),
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.generic_arity > 0 {
            write!(f, "<{}>", self.generic_arity)?;
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(ty, mode)| match mode {
                ParamMode::In => ty.to_string(),
                ParamMode::Ref => format!("ref {}", ty),
                ParamMode::Out => format!("out {}", ty),
            })
            .collect();
        write!(f, "({})", params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Method,
    PropertyGet { property: String },
    PropertySet { property: String },
}

/// Member of a contract
#[derive(Clone)]
pub struct MemberInfo {
    name: String,
    kind: MemberKind,
    signature: Signature,
    shape: CallShape,
    overridable: bool,
    visibility: Visibility,
    metadata: Vec<MetadataEntry>,
    body: Option<MethodBody>,
    declaring_type: String,
}

impl MemberInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn shape(&self) -> &CallShape {
        &self.shape
    }

    pub fn is_overridable(&self) -> bool {
        self.overridable
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn metadata(&self) -> &[MetadataEntry] {
        &self.metadata
    }

    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }

    /// Copy of this member as declared on a synthesized type
    pub(crate) fn synthesized(&self, declaring_type: &str, metadata: Vec<MetadataEntry>) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            signature: self.signature.clone(),
            shape: self.shape.clone(),
            overridable: true,
            visibility: self.visibility,
            metadata,
            body: None,
            declaring_type: declaring_type.to_string(),
        }
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("shape", &self.shape.to_string())
            .field("returns", &self.signature.returns)
            .field("overridable", &self.overridable)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// Builder for methods and property accessors
pub struct MemberBuilder {
    name: String,
    kind: MemberKind,
    params: Vec<Param>,
    returns: TypeRef,
    generic_params: Vec<String>,
    overridable: bool,
    visibility: Visibility,
    metadata: Vec<MetadataEntry>,
    body: Option<MethodBody>,
}

impl MemberBuilder {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            params: Vec::new(),
            returns: TypeRef::Unit,
            generic_params: Vec::new(),
            overridable: true,
            visibility: Visibility::Public,
            metadata: Vec::new(),
            body: None,
        }
    }

    /// Property getter `get_<property>`
    pub fn getter(property: impl Into<String>, ty: TypeRef) -> Self {
        let property = property.into();
        let mut builder = Self::method(format!("get_{}", property));
        builder.kind = MemberKind::PropertyGet { property };
        builder.returns = ty;
        builder
    }

    /// Property setter `set_<property>`
    pub fn setter(property: impl Into<String>, ty: TypeRef) -> Self {
        let property = property.into();
        let mut builder = Self::method(format!("set_{}", property));
        builder.kind = MemberKind::PropertySet { property };
        builder.params.push(Param::new("value", ty));
        builder
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn ref_param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
            mode: ParamMode::Ref,
        });
        self
    }

    pub fn out_param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
            mode: ParamMode::Out,
        });
        self
    }

    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generic_params.push(name.into());
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.returns = ty;
        self
    }

    /// Sealed/non-virtual member; cannot be overridden by a proxy
    pub fn non_overridable(mut self) -> Self {
        self.overridable = false;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn metadata(mut self, entry: MetadataEntry) -> Self {
        self.metadata.push(entry);
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Object, &mut Frame<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    fn build(self, declaring_type: &str) -> MemberInfo {
        let signature = Signature {
            params: self.params,
            returns: self.returns,
            generic_params: self.generic_params,
        };
        let shape = CallShape::of(&self.name, &signature);

        MemberInfo {
            name: self.name,
            kind: self.kind,
            signature,
            shape,
            overridable: self.overridable,
            visibility: self.visibility,
            metadata: self.metadata,
            body: self.body,
            declaring_type: declaring_type.to_string(),
        }
    }
}

/// Public field; never interceptable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
}

/// Class constructor
#[derive(Clone)]
pub struct ConstructorInfo {
    params: Vec<Param>,
    factory: ConstructorFn,
}

impl ConstructorInfo {
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| p.ty.admits(a))
    }

    pub(crate) fn construct(&self, args: &[Value]) -> anyhow::Result<State> {
        (self.factory)(args)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("params", &self.params)
            .finish()
    }
}

/// Interface or class description
pub struct TypeInfo {
    id: TypeId,
    name: String,
    kind: TypeKind,
    sealed: bool,
    base: Option<Arc<TypeInfo>>,
    interfaces: Vec<Arc<TypeInfo>>,
    all_interfaces: Vec<Arc<TypeInfo>>,
    declared: Vec<Arc<MemberInfo>>,
    members: Vec<Arc<MemberInfo>>,
    index: HashMap<CallShape, usize>,
    constructors: Vec<ConstructorInfo>,
    fields: Vec<FieldInfo>,
    metadata: Vec<MetadataEntry>,
}

impl TypeInfo {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn base(&self) -> Option<&Arc<TypeInfo>> {
        self.base.as_ref()
    }

    /// Directly declared interfaces
    pub fn interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.interfaces
    }

    /// Every interface this type satisfies, inherited ones included
    pub fn all_interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.all_interfaces
    }

    pub fn declared_members(&self) -> &[Arc<MemberInfo>] {
        &self.declared
    }

    /// Flattened member table (inherited members included, overrides applied)
    pub fn members(&self) -> &[Arc<MemberInfo>] {
        &self.members
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn metadata(&self) -> &[MetadataEntry] {
        &self.metadata
    }

    pub fn find_member(&self, shape: &CallShape) -> Option<&Arc<MemberInfo>> {
        self.index.get(shape).map(|&i| &self.members[i])
    }

    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<MemberInfo>> {
        self.members.iter().filter(move |m| m.name() == name)
    }

    /// Abstract classes have at least one member without a body
    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.members.iter().any(|m| m.is_abstract())
    }

    pub fn is_assignable_to(&self, other: &TypeInfo) -> bool {
        self.is_assignable_where(|t| t.id == other.id)
    }

    pub fn is_assignable_to_name(&self, name: &str) -> bool {
        self.is_assignable_where(|t| t.name == name)
    }

    fn is_assignable_where(&self, pred: impl Fn(&TypeInfo) -> bool) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if pred(ty) {
                return true;
            }
            current = ty.base.as_deref();
        }
        self.all_interfaces.iter().any(|i| pred(i.as_ref()))
    }

    /// Pick the single overload that fits a call
    pub fn resolve_call(
        &self,
        name: &str,
        generic_args: &[TypeRef],
        args: &[Value],
    ) -> Result<Arc<MemberInfo>> {
        let mut named = 0;
        let candidates: Vec<&Arc<MemberInfo>> = self
            .members_named(name)
            .inspect(|_| named += 1)
            .filter(|m| m.signature().check_arguments(args, generic_args).is_ok())
            .collect();

        match candidates.as_slice() {
            [member] => Ok(Arc::clone(member)),
            [] if named == 0 => Err(ProxyError::MemberNotFound {
                type_name: self.name.clone(),
                member: name.to_string(),
            }),
            [] => Err(ProxyError::ArgumentMismatch {
                member: format!("{}.{}", self.name, name),
                reason: format!("no overload accepts ({})", describe_values(args)),
            }),
            many => Err(ProxyError::AmbiguousCall {
                type_name: self.name.clone(),
                member: name.to_string(),
                candidates: many.len(),
            }),
        }
    }

    /// Type description for a synthesized proxy implementation
    pub(crate) fn synthesized(
        name: String,
        base: Option<Arc<TypeInfo>>,
        interfaces: Vec<Arc<TypeInfo>>,
        members: Vec<Arc<MemberInfo>>,
        metadata: Vec<MetadataEntry>,
    ) -> Arc<TypeInfo> {
        let all_interfaces = collect_interfaces(base.as_ref(), &interfaces);
        let index = members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.shape().clone(), i))
            .collect();

        Arc::new(TypeInfo {
            id: TypeId::next(),
            name,
            kind: TypeKind::Class,
            sealed: false,
            base,
            interfaces,
            all_interfaces,
            declared: members.clone(),
            members,
            index,
            constructors: Vec::new(),
            fields: Vec::new(),
            metadata,
        })
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("members", &self.members.len())
            .finish()
    }
}

fn collect_interfaces(base: Option<&Arc<TypeInfo>>, declared: &[Arc<TypeInfo>]) -> Vec<Arc<TypeInfo>> {
    let mut seen = HashSet::new();
    let mut all = Vec::new();

    let inherited = base.map(|b| b.all_interfaces.as_slice()).unwrap_or(&[]);
    for iface in inherited {
        if seen.insert(iface.id) {
            all.push(Arc::clone(iface));
        }
    }

    for iface in declared {
        if seen.insert(iface.id) {
            all.push(Arc::clone(iface));
        }
        for parent in &iface.all_interfaces {
            if seen.insert(parent.id) {
                all.push(Arc::clone(parent));
            }
        }
    }

    all
}

/// Builder for interfaces and classes
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    sealed: bool,
    base: Option<Arc<TypeInfo>>,
    interfaces: Vec<Arc<TypeInfo>>,
    members: Vec<MemberBuilder>,
    constructors: Vec<ConstructorInfo>,
    fields: Vec<FieldInfo>,
    metadata: Vec<MetadataEntry>,
}

impl TypeBuilder {
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::Interface)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::Class)
    }

    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            sealed: false,
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn extends(mut self, base: &Arc<TypeInfo>) -> Self {
        self.base = Some(Arc::clone(base));
        self
    }

    /// Implemented interface (classes) or inherited interface (interfaces)
    pub fn implements(mut self, iface: &Arc<TypeInfo>) -> Self {
        self.interfaces.push(Arc::clone(iface));
        self
    }

    pub fn member(mut self, member: MemberBuilder) -> Self {
        self.members.push(member);
        self
    }

    pub fn constructor<F>(mut self, params: Vec<Param>, factory: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<State> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorInfo {
            params,
            factory: Arc::new(factory),
        });
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldInfo {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
        });
        self
    }

    pub fn metadata(mut self, entry: MetadataEntry) -> Self {
        self.metadata.push(entry);
        self
    }

    pub fn build(self) -> Result<Arc<TypeInfo>> {
        let invalid = |reason: String| ProxyError::InvalidType {
            type_name: self.name.clone(),
            reason,
        };

        if let Some(iface) = self.interfaces.iter().find(|i| !i.is_interface()) {
            return Err(invalid(format!("{} is not an interface", iface.name)));
        }

        match self.kind {
            TypeKind::Interface => {
                if self.base.is_some() || self.sealed {
                    return Err(invalid("interfaces cannot extend classes or be sealed".into()));
                }
                if !self.constructors.is_empty() || !self.fields.is_empty() {
                    return Err(invalid("interfaces cannot declare constructors or fields".into()));
                }
                if self.members.iter().any(|m| m.body.is_some()) {
                    return Err(invalid("interface members cannot have bodies".into()));
                }
            }
            TypeKind::Class => {
                if let Some(base) = &self.base {
                    if base.is_interface() {
                        return Err(invalid(format!("{} is an interface, not a base class", base.name)));
                    }
                    if base.sealed {
                        return Err(invalid(format!("cannot extend sealed class {}", base.name)));
                    }
                }
            }
        }

        let is_interface = self.kind == TypeKind::Interface;
        let declared: Vec<Arc<MemberInfo>> = self
            .members
            .into_iter()
            .map(|builder| {
                let mut member = builder.build(&self.name);
                if is_interface {
                    member.overridable = true;
                    member.visibility = Visibility::Public;
                }
                Arc::new(member)
            })
            .collect();

        let mut seen = HashSet::new();
        for member in &declared {
            if !seen.insert(member.shape.clone()) {
                return Err(invalid(format!("duplicate member {}", member.shape)));
            }
        }

        let all_interfaces = collect_interfaces(self.base.as_ref(), &self.interfaces);

        let (mut members, mut index): (Vec<Arc<MemberInfo>>, HashMap<CallShape, usize>) =
            match &self.base {
                Some(base) => (base.members.clone(), base.index.clone()),
                None => (Vec::new(), HashMap::new()),
            };

        for member in &declared {
            match index.get(&member.shape) {
                Some(&i) => {
                    if !members[i].overridable {
                        return Err(invalid(format!(
                            "{} overrides non-overridable {}",
                            member.shape,
                            members[i].qualified_name()
                        )));
                    }
                    members[i] = Arc::clone(member);
                }
                None => {
                    index.insert(member.shape.clone(), members.len());
                    members.push(Arc::clone(member));
                }
            }
        }

        if is_interface {
            // Inherited interface members collapse by shape
            for parent in &all_interfaces {
                for member in &parent.members {
                    if !index.contains_key(&member.shape) {
                        index.insert(member.shape.clone(), members.len());
                        members.push(Arc::clone(member));
                    }
                }
            }
        } else {
            for iface in &all_interfaces {
                for required in &iface.members {
                    match index.get(&required.shape) {
                        None => {
                            return Err(invalid(format!(
                                "does not implement {}",
                                required.qualified_name()
                            )))
                        }
                        Some(&i)
                            if members[i].signature.normalized_return()
                                != required.signature.normalized_return() =>
                        {
                            return Err(invalid(format!(
                                "{} returns {}, {} requires {}",
                                members[i].shape,
                                members[i].signature.returns,
                                iface.name,
                                required.signature.returns
                            )))
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        Ok(Arc::new(TypeInfo {
            id: TypeId::next(),
            name: self.name,
            kind: self.kind,
            sealed: self.sealed,
            base: self.base,
            interfaces: self.interfaces,
            all_interfaces,
            declared,
            members,
            index,
            constructors: self.constructors,
            fields: self.fields,
            metadata: self.metadata,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeter() -> Arc<TypeInfo> {
        TypeBuilder::interface("IGreeter")
            .member(
                MemberBuilder::method("Greet")
                    .param("name", TypeRef::Str)
                    .returns(TypeRef::Str),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_class_must_implement_interfaces() {
        let iface = greeter();
        let result = TypeBuilder::class("Silent").implements(&iface).build();
        assert!(matches!(result, Err(ProxyError::InvalidType { .. })));

        let class = TypeBuilder::class("Polite")
            .implements(&iface)
            .member(
                MemberBuilder::method("Greet")
                    .param("name", TypeRef::Str)
                    .returns(TypeRef::Str)
                    .body(|_, frame| Ok(Value::Str(format!("Hello, {}", frame.str(0)?)))),
            )
            .build()
            .unwrap();
        assert!(class.is_assignable_to(&iface));
        assert!(class.is_assignable_to_name("IGreeter"));
        assert!(!class.is_abstract());
    }

    #[test]
    fn test_generic_shapes_normalize() {
        let a = MemberBuilder::method("Get")
            .generic("T")
            .param("key", TypeRef::param("T"))
            .build("A");
        let b = MemberBuilder::method("Get")
            .generic("U")
            .param("key", TypeRef::param("U"))
            .build("B");
        assert_eq!(a.shape(), b.shape());
        assert_eq!(a.shape().to_string(), "Get<1>(#0)");
    }

    #[test]
    fn test_renamed_generic_return_satisfies_interface() {
        let store = TypeBuilder::interface("IStore")
            .member(MemberBuilder::method("Get").generic("T").returns(TypeRef::param("T")))
            .build()
            .unwrap();
        let class = TypeBuilder::class("Store")
            .implements(&store)
            .member(
                MemberBuilder::method("Get")
                    .generic("U")
                    .returns(TypeRef::param("U"))
                    .body(|_, _| Ok(Value::Unit)),
            )
            .build()
            .unwrap();
        assert!(class.is_assignable_to(&store));

        let get = class.members_named("Get").next().unwrap();
        assert_eq!(get.signature().normalized_return(), TypeRef::param("#0"));
    }

    #[test]
    fn test_override_replaces_base_member() {
        let base = TypeBuilder::class("Base")
            .member(MemberBuilder::method("Run").returns(TypeRef::Int).body(|_, _| Ok(1.into())))
            .member(
                MemberBuilder::method("Stop")
                    .non_overridable()
                    .body(|_, _| Ok(Value::Unit)),
            )
            .build()
            .unwrap();

        let derived = TypeBuilder::class("Derived")
            .extends(&base)
            .member(MemberBuilder::method("Run").returns(TypeRef::Int).body(|_, _| Ok(2.into())))
            .build()
            .unwrap();

        assert_eq!(derived.members().len(), 2);
        let run = derived.members_named("Run").next().unwrap();
        assert_eq!(run.declaring_type(), "Derived");
        assert!(derived.is_assignable_to(&base));

        let sealed_override = TypeBuilder::class("Broken")
            .extends(&base)
            .member(MemberBuilder::method("Stop").body(|_, _| Ok(Value::Unit)))
            .build();
        assert!(sealed_override.is_err());
    }

    #[test]
    fn test_interface_inheritance_collapses_members() {
        let reader = TypeBuilder::interface("IReader")
            .member(MemberBuilder::method("Read").returns(TypeRef::Str))
            .build()
            .unwrap();
        let writer = TypeBuilder::interface("IWriter")
            .member(MemberBuilder::method("Write").param("s", TypeRef::Str))
            .member(MemberBuilder::method("Read").returns(TypeRef::Str))
            .build()
            .unwrap();
        let stream = TypeBuilder::interface("IStream")
            .implements(&reader)
            .implements(&writer)
            .build()
            .unwrap();

        assert_eq!(stream.members().len(), 2);
        assert_eq!(stream.all_interfaces().len(), 2);
    }

    #[test]
    fn test_resolve_call_overloads() {
        let iface = TypeBuilder::interface("IPrinter")
            .member(MemberBuilder::method("Print").param("v", TypeRef::Int))
            .member(MemberBuilder::method("Print").param("v", TypeRef::Str))
            .member(MemberBuilder::method("Dump").param("v", TypeRef::Any))
            .member(MemberBuilder::method("Dump").param("v", TypeRef::Int))
            .build()
            .unwrap();

        let member = iface.resolve_call("Print", &[], &[Value::Str("x".into())]).unwrap();
        assert_eq!(member.signature().params[0].ty, TypeRef::Str);

        assert!(matches!(
            iface.resolve_call("Missing", &[], &[]),
            Err(ProxyError::MemberNotFound { .. })
        ));
        assert!(matches!(
            iface.resolve_call("Print", &[], &[Value::Bool(true)]),
            Err(ProxyError::ArgumentMismatch { .. })
        ));
        assert!(matches!(
            iface.resolve_call("Dump", &[], &[Value::Int(1)]),
            Err(ProxyError::AmbiguousCall { candidates: 2, .. })
        ));
    }

    #[test]
    fn test_check_arguments_skips_out_params() {
        let member = MemberBuilder::method("TryParse")
            .param("text", TypeRef::Str)
            .out_param("result", TypeRef::Int)
            .returns(TypeRef::Bool)
            .build("Parser");

        let sig = member.signature();
        assert!(sig.check_arguments(&["12".into(), Value::Unit], &[]).is_ok());
        assert!(sig.check_arguments(&["12".into()], &[]).is_err());
        assert_eq!(sig.by_ref_slots(), vec![1]);
    }
}
