//! Operand stack

use crate::error::{Result, RuntimeError};
use crate::guard;
use teal_spec::{StackValue, MAX_STACK_DEPTH};

/// LIFO operand stack
///
/// Operations that consume operands read them with [`Stack::top_n`], which
/// asserts the depth, and only remove them with [`Stack::replace_top`] once
/// every check for the opcode has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    values: Vec<StackValue>,
    max_depth: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_STACK_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            values: Vec::new(),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fail unless `extra` more values fit under the depth limit
    pub fn assert_room(&self, extra: usize, line: usize) -> Result<()> {
        if self.values.len().saturating_add(extra) > self.max_depth {
            return Err(RuntimeError::StackOverflow {
                max: self.max_depth,
                line,
            });
        }
        Ok(())
    }

    pub fn push(&mut self, value: impl Into<StackValue>) {
        self.values.push(value.into());
    }

    /// Pop the top value after asserting depth
    pub fn pop(&mut self, line: usize) -> Result<StackValue> {
        guard::assert_min_stack_len(self, 1, line)?;
        self.values.pop().ok_or(RuntimeError::StackUnderflow {
            expected: 1,
            actual: 0,
            line,
        })
    }

    /// The top `n` values in push order (deepest first), after asserting
    /// depth
    pub fn top_n(&self, n: usize, line: usize) -> Result<&[StackValue]> {
        guard::assert_min_stack_len(self, n, line)?;
        Ok(&self.values[self.values.len() - n..])
    }

    /// Value `depth` positions below the top (0 is the top)
    pub fn peek(&self, depth: usize) -> Option<&StackValue> {
        self.values
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.values.get(i))
    }

    /// Remove the top `n` values and push `results` in order
    pub fn replace_top(&mut self, n: usize, results: impl IntoIterator<Item = StackValue>) {
        let keep = self.values.len().saturating_sub(n);
        self.values.truncate(keep);
        self.values.extend(results);
    }

    /// Remove the top `n` values
    pub fn discard(&mut self, n: usize) {
        let keep = self.values.len().saturating_sub(n);
        self.values.truncate(keep);
    }

    /// Keep only the top value
    pub fn keep_top(&mut self) {
        let len = self.values.len();
        if len > 1 {
            self.values.drain(..len - 1);
        }
    }

    /// Move the top value below the next `n` values
    pub fn cover(&mut self, n: usize, line: usize) -> Result<()> {
        guard::assert_min_stack_len(self, n.saturating_add(1), line)?;
        if let Some(top) = self.values.pop() {
            let at = self.values.len() - n;
            self.values.insert(at, top);
        }
        Ok(())
    }

    /// Move the value `n` deep to the top
    pub fn uncover(&mut self, n: usize, line: usize) -> Result<()> {
        guard::assert_min_stack_len(self, n.saturating_add(1), line)?;
        let at = self.values.len() - 1 - n;
        let value = self.values.remove(at);
        self.values.push(value);
        Ok(())
    }

    pub fn values(&self) -> &[StackValue] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<StackValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_pop_empty() {
        let mut stack = Stack::new();
        let err = stack.pop(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StackUnderflow);
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_top_n_and_replace() {
        let mut stack = Stack::new();
        stack.push(1u64);
        stack.push(2u64);
        stack.push(3u64);

        let top = stack.top_n(2, 1).unwrap();
        assert_eq!(top, &[StackValue::Uint(2), StackValue::Uint(3)]);

        stack.replace_top(2, [StackValue::Uint(5)]);
        assert_eq!(stack.values(), &[StackValue::Uint(1), StackValue::Uint(5)]);
    }

    #[test]
    fn test_top_n_underflow_leaves_stack() {
        let mut stack = Stack::new();
        stack.push(1u64);
        assert!(stack.top_n(2, 9).is_err());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_peek() {
        let mut stack = Stack::new();
        stack.push(1u64);
        stack.push("a");
        assert_eq!(stack.peek(0), Some(&StackValue::Bytes(b"a".to_vec())));
        assert_eq!(stack.peek(1), Some(&StackValue::Uint(1)));
        assert_eq!(stack.peek(2), None);
    }

    #[test]
    fn test_cover_uncover() {
        let mut stack = Stack::new();
        for v in [1u64, 2, 3, 4] {
            stack.push(v);
        }
        stack.cover(2, 1).unwrap();
        let values: Vec<u64> = stack.values().iter().filter_map(|v| v.as_uint()).collect();
        assert_eq!(values, vec![1, 4, 2, 3]);

        stack.uncover(2, 1).unwrap();
        let values: Vec<u64> = stack.values().iter().filter_map(|v| v.as_uint()).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);

        assert!(stack.cover(4, 1).is_err());
        assert!(stack.uncover(4, 1).is_err());
    }

    #[test]
    fn test_discard_and_keep_top() {
        let mut stack = Stack::new();
        for v in [1u64, 2, 3] {
            stack.push(v);
        }
        stack.discard(1);
        assert_eq!(stack.values(), &[StackValue::Uint(1), StackValue::Uint(2)]);
        stack.push(9u64);
        stack.keep_top();
        assert_eq!(stack.values(), &[StackValue::Uint(9)]);
        stack.discard(5);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_assert_room() {
        let mut stack = Stack::with_max_depth(2);
        stack.push(1u64);
        assert!(stack.assert_room(1, 1).is_ok());
        assert!(matches!(
            stack.assert_room(2, 4),
            Err(RuntimeError::StackOverflow { max: 2, line: 4 })
        ));
        stack.push(2u64);
        assert!(stack.assert_room(0, 1).is_ok());
        assert!(stack.assert_room(1, 1).is_err());
        assert_eq!(stack.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_underflow_iff_too_shallow(depth in 0usize..20, n in 0usize..20) {
            let mut stack = Stack::new();
            for i in 0..depth {
                stack.push(i as u64);
            }
            let before = stack.clone();
            let result = stack.top_n(n, 1);
            prop_assert_eq!(result.is_err(), depth < n);
            prop_assert_eq!(stack, before);
        }

        #[test]
        fn prop_cover_then_uncover_is_identity(values in prop::collection::vec(any::<u64>(), 1..20), n in 0usize..20) {
            let mut stack = Stack::new();
            for v in &values {
                stack.push(*v);
            }
            let before = stack.clone();
            if n < values.len() {
                stack.cover(n, 1).unwrap();
                stack.uncover(n, 1).unwrap();
            }
            prop_assert_eq!(stack, before);
        }
    }
}
