use crate::error::ContextError;
use crate::xref::ObjectId;

/// The finished pages of the document, in the order they were closed.
///
/// The registry is drained exactly once, when the page tree writes its `/Kids` array;
/// the page count survives the drain because it becomes the `/Count` of the tree.
#[derive(Debug, Default, Clone)]
pub struct PageRegistry {
    page_ids: Vec<ObjectId>,
    page_count: u32,
    drained: bool,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished page to the tail of the registry.
    pub fn append(&mut self, page_id: ObjectId) -> Result<(), ContextError> {
        if self.drained {
            return Err(ContextError::with_context(format!(
                "Page {} registered after the page tree was written",
                page_id
            )));
        }
        self.page_ids.try_reserve(1).map_err(|error| {
            ContextError::with_error(
                format!("Unable to allocate array for page {}", self.page_count + 1),
                &error,
            )
        })?;
        self.page_ids.push(page_id);
        self.page_count += 1;

        Ok(())
    }

    /// The number of pages registered so far.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Removes and returns every page id in registration order. Draining twice is an error.
    pub fn drain(&mut self) -> Result<Vec<ObjectId>, ContextError> {
        if self.drained {
            return Err(ContextError::with_context(
                "The page registry has already been drained",
            ));
        }
        self.drained = true;

        Ok(std::mem::take(&mut self.page_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_registration_order() {
        let mut registry = PageRegistry::new();
        for page_id in [4, 7, 10] {
            registry.append(page_id).unwrap();
        }
        assert_eq!(registry.page_count(), 3);
        assert_eq!(registry.drain().unwrap(), vec![4, 7, 10]);
        // The count is what the page tree reports after the drain
        assert_eq!(registry.page_count(), 3);
    }

    #[test]
    fn test_drain_happens_once() {
        let mut registry = PageRegistry::new();
        registry.append(4).unwrap();
        registry.drain().unwrap();
        assert!(registry.drain().is_err());
        assert!(registry.append(5).is_err());
    }
}
