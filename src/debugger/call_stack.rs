use serde::{Deserialize, Serialize};

use crate::runtime::module::{FunctionId, Location};

/// One activation of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    pub function: FunctionId,
    /// Offset of the next instruction this frame executes.
    pub instruction_pointer: u32,
    /// Stack size including this frame; the outermost frame is at depth 1.
    pub frame_depth: usize,
}

impl CallFrame {
    pub fn location(&self) -> Location {
        Location::new(self.function, self.instruction_pointer)
    }
}

/// Nested activations, outermost first. The last frame is executing.
///
/// This is the only record of how deep execution currently is; the executor
/// pushes, pops and advances frames as it runs.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `function` at `entry`; returns the new frame's depth.
    pub fn push(&mut self, function: FunctionId, entry: u32) -> usize {
        let frame_depth = self.frames.len() + 1;
        self.frames.push(CallFrame {
            function,
            instruction_pointer: entry,
            frame_depth,
        });
        frame_depth
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// The executing frame, `None` once execution has finished.
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Move the executing frame to the instruction at `offset`.
    pub fn advance(&mut self, offset: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.instruction_pointer = offset;
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
