//! Object numbering and the cross-reference table.
//!
//! Every indirect object of the output receives its number from the
//! [`CrossReferenceTable`] and reports the byte offset at which its `N 0 obj` header was
//! written. Numbers are dense, start at 1 and are never reused, so the offsets live in a
//! plain vector indexed by object number (slot 0 belongs to the free-list head).

use std::io::Write;

use crate::error::ContextError;

/// The number of an indirect object. The generation is always zero.
pub type ObjectId = u32;

/// The smallest number of entries the offset table grows by.
const MINIMUM_GROWTH: usize = 1000;

/// The incremental object allocator together with the byte offsets of the objects.
#[derive(Debug, Clone)]
pub struct CrossReferenceTable {
    /// The byte offset of each object, `None` until the object header has been written.
    offsets: Vec<Option<u64>>,
    /// The next object number to be handed out.
    next_id: ObjectId,
}

impl Default for CrossReferenceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossReferenceTable {
    pub fn new() -> Self {
        CrossReferenceTable {
            offsets: Vec::new(),
            next_id: 1,
        }
    }

    /// Hands out the next free object number.
    pub fn allocate(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        log::trace!("Allocated object {}", id);
        id
    }

    /// The next free object number, which is also the number of xref entries (entry 0
    /// included) and the `/Size` of the trailer.
    pub fn size(&self) -> ObjectId {
        self.next_id
    }

    /// The recorded offset of an object, if its header has been written.
    pub fn offset(&self, id: ObjectId) -> Option<u64> {
        self.offsets.get(id as usize).copied().flatten()
    }

    /// Associates the object with the byte offset of its header.
    ///
    /// The table grows by a fifth of its capacity, and by at least 1000 entries, when the
    /// object number does not fit. An object can only be placed once.
    pub fn record_offset(&mut self, id: ObjectId, offset: u64) -> Result<(), ContextError> {
        if id == 0 || id >= self.next_id {
            return Err(ContextError::with_context(format!(
                "Object {} has not been allocated",
                id
            )));
        }

        let index = id as usize;
        if index >= self.offsets.len() {
            self.grow(index)?;
        }
        if self.offsets[index].is_some() {
            return Err(ContextError::with_context(format!(
                "Object {} has already been written",
                id
            )));
        }
        self.offsets[index] = Some(offset);

        Ok(())
    }

    /// Grows the offset table so that `index` fits into it.
    fn grow(&mut self, index: usize) -> Result<(), ContextError> {
        let mut capacity = self.offsets.len();
        while capacity <= index {
            capacity += (capacity / 5).max(MINIMUM_GROWTH);
        }
        let additional = capacity - self.offsets.len();
        self.offsets.try_reserve_exact(additional).map_err(|error| {
            ContextError::with_error(
                format!("Unable to allocate array for object {}", index),
                &error,
            )
        })?;
        self.offsets.resize(capacity, None);

        Ok(())
    }

    /// Writes the `xref` section: the free-list head followed by one in-use entry for
    /// every object handed out so far.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ContextError> {
        let mut section = format!("xref\n0 {}\n0000000000 65535 f \n", self.next_id);
        for id in 1..self.next_id {
            let offset = self.offset(id).ok_or_else(|| {
                ContextError::with_context(format!(
                    "Object {} was allocated but never written",
                    id
                ))
            })?;
            section.push_str(&format!("{:010} 00000 n \n", offset));
        }

        writer.write_all(section.as_bytes()).map_err(|error| {
            ContextError::with_error("Failed to write the cross-reference table", &error)
        })
    }
}
