//! Cache Key Module
//!
//! Derives deterministic cache keys from owner identity, operation identifier,
//! argument vector and trailing callback identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::ser::{self, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{MemoError, Result};

/// Contribution of an absent callback. Real callbacks contribute `cb:<id>`.
const NO_CALLBACK_TOKEN: &[u8] = b"cb:none";

/// Separates the argument encoding from the callback token in the digest.
const FIELD_SEPARATOR: &[u8] = &[0x1f];

// == Owner Id ==
/// Stable identity of an owning object.
///
/// Allocated once per [`crate::memo::MemoizationManager`] from a process-wide
/// counter, so two live owners never share an id and ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct OwnerId(u64);

impl OwnerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

// == Callback ==
/// Trailing callback handed to a memoized operation.
///
/// Keys depend on the callback's identity, not its behaviour: clones share an
/// identity, separately constructed callbacks never do.
#[derive(Clone)]
pub struct Callback {
    id: u64,
    func: Arc<dyn Fn(&Value) -> Value + Send + Sync>,
}

impl Callback {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT.fetch_add(1, Ordering::Relaxed),
            func: Arc::new(func),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn call(&self, value: &Value) -> Value {
        (self.func)(value)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish()
    }
}

// == Cache Key ==
/// Key of one memoized call.
///
/// `digest` is the hex SHA-256 of the canonical JSON encoding of the arguments
/// followed by the callback token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CacheKey {
    pub owner: OwnerId,
    pub operation: String,
    pub digest: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.operation, self.digest)
    }
}

// == Finite Check ==
/// Serializer that walks the arguments without encoding them, failing on the
/// first NaN or infinite float.
///
/// serde_json writes non-finite floats as `null`, which would give them the
/// same key as an absent value.
struct FiniteCheck;

#[derive(Debug)]
struct FiniteCheckError(String);

impl fmt::Display for FiniteCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for FiniteCheckError {}

impl ser::Error for FiniteCheckError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

type Checked = std::result::Result<(), FiniteCheckError>;

fn check_float(value: f64) -> Checked {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FiniteCheckError(format!("non-finite float {value} cannot be keyed")))
    }
}

impl Serializer for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Checked {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Checked {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Checked {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Checked {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Checked {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Checked {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Checked {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Checked {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Checked {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Checked {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Checked {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Checked {
        check_float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Checked {
        check_float(v)
    }

    fn serialize_char(self, _: char) -> Checked {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Checked {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Checked {
        Ok(())
    }

    fn serialize_none(self) -> Checked {
        Ok(())
    }

    fn serialize_some<T>(self, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Checked {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_newtype_struct<T>(self, _: &'static str, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, FiniteCheckError> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_element<T>(&mut self, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_element<T>(&mut self, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_field<T>(&mut self, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_field<T>(&mut self, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_key<T>(&mut self, key: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        key.serialize(FiniteCheck)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_field<T>(&mut self, _: &'static str, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = FiniteCheckError;

    fn serialize_field<T>(&mut self, _: &'static str, value: &T) -> Checked
    where
        T: ?Sized + Serialize,
    {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

// == Derive Key ==
/// Builds the cache key for one call.
///
/// Arguments go through `serde_json::Value` first, which stores objects as
/// sorted maps, so the encoding does not depend on hash-map iteration order.
/// Arguments that cannot be serialized (for example maps keyed by sequences)
/// are rejected instead of falling back to an unstable identity, and so are
/// NaN and infinite floats, which JSON cannot represent.
pub fn derive_key<A>(
    owner: OwnerId,
    operation: &str,
    args: &A,
    callback: Option<&Callback>,
) -> Result<CacheKey>
where
    A: Serialize + ?Sized,
{
    // Reject values JSON would collapse into null
    args.serialize(FiniteCheck)
        .map_err(|e| MemoError::key_derivation(operation, e.to_string()))?;

    // Canonical encoding with sorted object keys
    let canonical = serde_json::to_value(args)
        .map_err(|e| MemoError::key_derivation(operation, e.to_string()))?;
    let encoded = serde_json::to_vec(&canonical)
        .map_err(|e| MemoError::key_derivation(operation, e.to_string()))?;

    // Digest arguments and callback identity
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hasher.update(FIELD_SEPARATOR);
    match callback {
        Some(callback) => hasher.update(format!("cb:{}", callback.id()).as_bytes()),
        None => hasher.update(NO_CALLBACK_TOKEN),
    }

    Ok(CacheKey {
        owner,
        operation: operation.to_string(),
        digest: hex::encode(hasher.finalize()),
    })
}
