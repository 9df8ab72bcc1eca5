use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DebugResult, DebuggerError};
use crate::runtime::module::{FunctionId, Location, Module};
use crate::runtime::result::BreakpointId;

/// A resolved breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub function: FunctionId,
    pub requested_offset: u32,
    /// Always a breakable instruction offset `>= requested_offset`.
    pub resolved_offset: u32,
}

impl Breakpoint {
    pub fn location(&self) -> Location {
        Location::new(self.function, self.resolved_offset)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requested_offset == self.resolved_offset {
            write!(f, "#{} at {}", self.id, self.location())
        } else {
            write!(
                f,
                "#{} at {} (requested {})",
                self.id,
                self.location(),
                self.requested_offset
            )
        }
    }
}

/// Owns the breakpoint table and resolves requested offsets.
#[derive(Debug)]
pub struct BreakpointManager {
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    by_location: BTreeMap<Location, BreakpointId>,
    next_id: u32,
}

impl BreakpointManager {
    /// Create a new breakpoint manager
    pub fn new() -> Self {
        Self {
            breakpoints: BTreeMap::new(),
            by_location: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Set a breakpoint in `function` at the first breakable instruction at
    /// or after `offset`.
    ///
    /// Resolving to a location that already carries a breakpoint returns the
    /// existing one.
    pub fn set(&mut self, module: &Module, function: FunctionId, offset: u32) -> DebugResult<Breakpoint> {
        let resolved_offset = resolve(module, function, offset)?;
        let location = Location::new(function, resolved_offset);

        if let Some(existing) = self
            .by_location
            .get(&location)
            .and_then(|id| self.breakpoints.get(id))
        {
            debug!("Breakpoint {} already covers {}", existing.id, location);
            return Ok(existing.clone());
        }

        let breakpoint = Breakpoint {
            id: BreakpointId(self.next_id),
            function,
            requested_offset: offset,
            resolved_offset,
        };
        self.next_id += 1;
        info!("Breakpoint set: {}", breakpoint);
        self.by_location.insert(location, breakpoint.id);
        self.breakpoints.insert(breakpoint.id, breakpoint.clone());
        Ok(breakpoint)
    }

    /// Set a breakpoint by module offset alone.
    ///
    /// The function is the one whose body holds `offset`, or the first one
    /// starting after it.
    pub fn set_at_offset(&mut self, module: &Module, offset: u32) -> DebugResult<Breakpoint> {
        let function = module
            .function_at_or_after(offset)
            .map(|f| f.id())
            .ok_or(DebuggerError::UnresolvableModuleOffset(offset))?;
        self.set(module, function, offset)
    }

    /// Remove a breakpoint. Unknown ids are ignored.
    pub fn remove(&mut self, id: BreakpointId) -> bool {
        let removed = self.breakpoints.remove(&id).is_some_and(|bp| {
            self.by_location.remove(&bp.location());
            true
        });
        if removed {
            info!("Breakpoint {} removed", id);
        } else {
            debug!("Breakpoint {} not present; nothing removed", id);
        }
        removed
    }

    /// The breakpoint resolved exactly at `location`, if any.
    pub fn hit_at(&self, location: Location) -> Option<BreakpointId> {
        self.by_location.get(&location).copied()
    }

    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    /// List all breakpoints, ordered by id
    pub fn list(&self) -> Vec<Breakpoint> {
        self.breakpoints.values().cloned().collect()
    }

    /// Clear all breakpoints
    pub fn clear(&mut self) {
        self.breakpoints.clear();
        self.by_location.clear();
    }

    /// Check if there are any breakpoints set
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Get count of breakpoints
    pub fn count(&self) -> usize {
        self.breakpoints.len()
    }
}

impl Default for BreakpointManager {
    fn default() -> Self {
        Self::new()
    }
}

/// First breakable offset at or after `offset` inside `function`.
pub fn resolve(module: &Module, function: FunctionId, offset: u32) -> DebugResult<u32> {
    let unresolvable = DebuggerError::UnresolvableOffset { function, offset };
    let body = module
        .function(function)
        .ok_or(DebuggerError::UnknownFunction(function))?;
    let start = body.index_at_or_after(offset).ok_or_else(|| unresolvable.clone())?;

    body.instructions()[start..]
        .iter()
        .find(|i| i.breakable)
        .map(|i| i.offset)
        .ok_or(unresolvable)
}
