//! 操作数栈深度跟踪
//!
//! Linear approximation over the emitted sequence. Every value-producing
//! pattern the emitter uses leaves the stack balanced at its end, so the
//! running maximum is exact for the code we generate.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackTracker {
    depth: u16,
    max: u16,
}

impl StackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        n: u16,
    ) {
        self.depth = self.depth.saturating_add(n);
        self.max = self.max.max(self.depth);
    }

    pub fn pop(
        &mut self,
        n: u16,
    ) {
        self.depth = self.depth.saturating_sub(n);
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Value for `.limit stack`
    pub fn max(&self) -> u16 {
        self.max
    }
}
