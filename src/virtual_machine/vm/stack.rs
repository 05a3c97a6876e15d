use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Word;

/// Fixed-capacity operand stack.
///
/// Storage is allocated once up front; `len` marks the first free slot, so
/// entries `0..len` are live, bottom to top.
pub(super) struct Stack {
    slots: Box<[Word]>,
    len: usize,
}

impl Stack {
    /// Creates an empty stack holding at most `capacity` words.
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.len
    }

    pub(super) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Live entries, bottom to top.
    pub(super) fn as_slice(&self) -> &[Word] {
        &self.slots[..self.len]
    }

    pub(super) fn clear(&mut self) {
        self.len = 0;
    }

    /// Fails with [`VMError::StackUnderflow`] unless at least `n` entries are live.
    pub(super) fn require(&self, n: usize) -> Result<(), VMError> {
        if self.len < n {
            return Err(VMError::StackUnderflow {
                required: n,
                available: self.len,
            });
        }
        Ok(())
    }

    /// Fails with [`VMError::StackOverflow`] if no slot is free.
    pub(super) fn require_free(&self) -> Result<(), VMError> {
        if self.is_full() {
            return Err(VMError::StackOverflow {
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    pub(super) fn push(&mut self, value: Word) -> Result<(), VMError> {
        self.require_free()?;
        self.slots[self.len] = value;
        self.len += 1;
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Result<Word, VMError> {
        self.require(1)?;
        self.len -= 1;
        Ok(self.slots[self.len])
    }

    /// Returns the entry `depth` positions below the top (0 = top).
    pub(super) fn peek(&self, depth: usize) -> Result<Word, VMError> {
        if depth >= self.len {
            return Err(VMError::StackUnderflow {
                required: depth.saturating_add(1),
                available: self.len,
            });
        }
        Ok(self.slots[self.len - 1 - depth])
    }

    /// Overwrites the top entry in place.
    pub(super) fn set_top(&mut self, value: Word) -> Result<(), VMError> {
        self.require(1)?;
        self.slots[self.len - 1] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_lifo() {
        let mut stack = Stack::new(4);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(stack.as_slice(), &[1, 2]);
        assert_eq!(stack.pop().unwrap(), 2);
        assert_eq!(stack.pop().unwrap(), 1);
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn push_on_full_stack_fails_without_change() {
        let mut stack = Stack::new(2);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(
            stack.push(3),
            Err(VMError::StackOverflow { capacity: 2 })
        );
        assert_eq!(stack.as_slice(), &[1, 2]);
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut stack = Stack::new(2);
        assert_eq!(
            stack.pop(),
            Err(VMError::StackUnderflow {
                required: 1,
                available: 0
            })
        );
    }

    #[test]
    fn peek_counts_from_top() {
        let mut stack = Stack::new(8);
        for v in [10, 20, 30] {
            stack.push(v).unwrap();
        }
        assert_eq!(stack.peek(0).unwrap(), 30);
        assert_eq!(stack.peek(2).unwrap(), 10);
        assert!(matches!(
            stack.peek(3),
            Err(VMError::StackUnderflow {
                required: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn set_top_replaces_last_entry() {
        let mut stack = Stack::new(2);
        stack.push(5).unwrap();
        stack.set_top(9).unwrap();
        assert_eq!(stack.as_slice(), &[9]);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut stack = Stack::new(3);
        stack.push(1).unwrap();
        stack.clear();
        assert_eq!(stack.len(), 0);
        assert_eq!(stack.capacity(), 3);
    }
}
