#![forbid(unsafe_code)]

/// Fixed-length shift register of token ids.
///
/// The window length equals the model context size and never changes:
/// pushing a value drops the oldest element and appends the new one at the
/// end. Constant time, no reallocation.
pub struct ContextWindow {
    slots: Vec<i32>,
}

impl ContextWindow {
    /// Create a zero-filled window of `len` slots (`len` >= 1 is enforced).
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![0; len.max(1)],
        }
    }

    /// Shift every element one slot toward the front and write `value`
    /// into the last slot.
    pub fn push(&mut self, value: i32) {
        self.slots.rotate_left(1);
        if let Some(last) = self.slots.last_mut() {
            *last = value;
        }
    }

    /// Current window contents, oldest first.
    pub fn as_slice(&self) -> &[i32] {
        &self.slots
    }

    /// Window length (the model context size).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: the window holds at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reset every slot to zero.
    pub fn reset(&mut self) {
        for s in &mut self.slots {
            *s = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_shifts_left_and_appends() {
        let mut w = ContextWindow::new(3);
        w.push(5);
        w.push(7);
        assert_eq!(w.as_slice(), &[0, 5, 7]);
    }

    #[test]
    fn length_never_changes() {
        let mut w = ContextWindow::new(4);
        for v in 0..100 {
            w.push(v);
            assert_eq!(w.len(), 4);
        }
    }

    #[test]
    fn tail_holds_most_recent_values_in_order() {
        let mut w = ContextWindow::new(3);
        for v in 1..=5 {
            w.push(v);
        }
        assert_eq!(w.as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn fewer_pushes_than_length_keeps_leading_zeros() {
        let mut w = ContextWindow::new(5);
        w.push(9);
        assert_eq!(w.as_slice(), &[0, 0, 0, 0, 9]);
    }

    #[test]
    fn reset_zeroes_all_slots() {
        let mut w = ContextWindow::new(3);
        w.push(1);
        w.push(2);
        w.reset();
        assert_eq!(w.as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn zero_length_is_clamped_to_one() {
        let mut w = ContextWindow::new(0);
        assert_eq!(w.len(), 1);
        w.push(3);
        assert_eq!(w.as_slice(), &[3]);
    }
}
