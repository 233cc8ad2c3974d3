// src/model/mod.rs
//! Runtime contract model
//!
//! Describes the contracts proxies are synthesized for:
//!
//! - **Types**: interfaces and classes with members, constructors and fields
//! - **Values**: dynamic argument and return values with a small type language
//! - **Objects**: concrete instances and the `Target` dispatch trait
//! - **Metadata**: declarative per-member annotations

pub mod metadata;
pub mod object;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use metadata::{MetadataArg, MetadataEntry};
pub use object::{Frame, Object, Target};
pub use types::{
    CallShape, FieldInfo, MemberBuilder, MemberInfo, MemberKind, Param, ParamMode, Signature,
    TypeBuilder, TypeId, TypeInfo, TypeKind, Visibility,
};
pub use value::{TypeRef, Value};
