//! Local-variable storage for one function activation.
//!
//! Slots are laid out struct-of-arrays: a tag per slot, a primitive lane
//! holding ints (and bools as 0/1) unboxed, and a boxed lane for everything
//! else. Specialized reads check the tag and go straight to the lane; generic
//! reads rebuild a [`Value`] from whichever lane the tag names.

use morph_ir::{LocalSlot, Tag};

use crate::errors::FrameError;
use crate::Value;

#[derive(Clone, Debug, Default)]
pub struct Frame {
    tags: Vec<Tag>,
    primitives: Vec<i64>,
    boxed: Vec<Value>,
}

impl Frame {
    /// A frame with `len` slots, all `Unset`.
    pub fn new(len: usize) -> Self {
        Frame {
            tags: vec![Tag::Unset; len],
            primitives: vec![0; len],
            boxed: vec![Value::Unit; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[inline]
    fn index(&self, slot: LocalSlot) -> Result<usize, FrameError> {
        let index = slot.index();
        if index < self.tags.len() {
            Ok(index)
        } else {
            Err(FrameError::SlotOutOfBounds {
                slot,
                len: self.tags.len(),
            })
        }
    }

    /// Current tag of `slot`.
    pub fn tag(&self, slot: LocalSlot) -> Result<Tag, FrameError> {
        let index = self.index(slot)?;
        Ok(self.tags[index])
    }

    /// Cheap tag probe used by guards. Out-of-range slots never match.
    #[inline]
    pub fn is_tag(&self, slot: LocalSlot, tag: Tag) -> bool {
        self.tags.get(slot.index()) == Some(&tag)
    }

    fn expect_tag(&self, slot: LocalSlot, expected: Tag) -> Result<usize, FrameError> {
        let index = self.index(slot)?;
        let actual = self.tags[index];
        if actual == expected {
            Ok(index)
        } else {
            Err(FrameError::TypeMismatch {
                slot,
                expected,
                actual,
            })
        }
    }

    /// Unboxed int read. Fails with `TypeMismatch` unless the slot is `Int`.
    #[inline]
    pub fn read_int(&self, slot: LocalSlot) -> Result<i64, FrameError> {
        let index = self.expect_tag(slot, Tag::Int)?;
        Ok(self.primitives[index])
    }

    /// Unboxed bool read. Fails with `TypeMismatch` unless the slot is `Bool`.
    #[inline]
    pub fn read_bool(&self, slot: LocalSlot) -> Result<bool, FrameError> {
        let index = self.expect_tag(slot, Tag::Bool)?;
        Ok(self.primitives[index] != 0)
    }

    /// Typed read: the slot must hold `expected`.
    pub fn read_typed(&self, slot: LocalSlot, expected: Tag) -> Result<Value, FrameError> {
        let index = self.expect_tag(slot, expected)?;
        Ok(self.load(index))
    }

    /// Dynamic read. Reading a slot that was never written is an error.
    pub fn read(&self, slot: LocalSlot) -> Result<Value, FrameError> {
        let index = self.index(slot)?;
        if self.tags[index] == Tag::Unset {
            return Err(FrameError::Unset { slot });
        }
        Ok(self.load(index))
    }

    fn load(&self, index: usize) -> Value {
        match self.tags[index] {
            Tag::Int => Value::Int(self.primitives[index]),
            Tag::Bool => Value::Bool(self.primitives[index] != 0),
            Tag::Boxed => self.boxed[index].clone(),
            Tag::Unset => Value::Unit,
        }
    }

    pub fn write_int(&mut self, slot: LocalSlot, value: i64) -> Result<(), FrameError> {
        let index = self.index(slot)?;
        self.tags[index] = Tag::Int;
        self.primitives[index] = value;
        self.boxed[index] = Value::Unit;
        Ok(())
    }

    pub fn write_bool(&mut self, slot: LocalSlot, value: bool) -> Result<(), FrameError> {
        let index = self.index(slot)?;
        self.tags[index] = Tag::Bool;
        self.primitives[index] = i64::from(value);
        self.boxed[index] = Value::Unit;
        Ok(())
    }

    /// Store `value` under the tag it carries.
    pub fn write(&mut self, slot: LocalSlot, value: Value) -> Result<(), FrameError> {
        match value {
            Value::Int(n) => self.write_int(slot, n),
            Value::Bool(b) => self.write_bool(slot, b),
            boxed @ (Value::Str(_) | Value::Unit) => {
                let index = self.index(slot)?;
                self.tags[index] = Tag::Boxed;
                self.primitives[index] = 0;
                self.boxed[index] = boxed;
                Ok(())
            }
        }
    }

    /// Every slot's current value; `None` for slots never written.
    pub fn snapshot(&self) -> Vec<Option<Value>> {
        (0..self.len())
            .map(|index| (self.tags[index] != Tag::Unset).then(|| self.load(index)))
            .collect()
    }
}
