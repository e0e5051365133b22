//! Invocation Correlation Map (§3, §4.7): bijective association between the
//! upstream-side invocation UID and the dispatcher-side task ID.
//!
//! UID 1 is reserved for the `connect` reply and UID 2 for the login reply,
//! both handled specially by the session state machine rather than through
//! this map; steady-state invocations start allocating at 3.

use std::collections::HashMap;

pub struct InvocationMap {
    next_uid: u32,
    uid_to_task: HashMap<u32, u32>,
}

impl InvocationMap {
    pub fn new() -> Self {
        InvocationMap {
            next_uid: 3,
            uid_to_task: HashMap::new(),
        }
    }

    /// Allocates a fresh invocation UID correlated to `task_id`.
    pub fn allocate(&mut self, task_id: u32) -> u32 {
        let uid = self.next_uid;
        self.next_uid = self.next_uid.wrapping_add(1).max(3);
        self.uid_to_task.insert(uid, task_id);
        uid
    }

    /// Removes and returns the task id correlated to `uid`, if any.
    pub fn take(&mut self, uid: u32) -> Option<u32> {
        self.uid_to_task.remove(&uid)
    }
}

impl Default for InvocationMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_starts_at_three_and_increments() {
        let mut map = InvocationMap::new();
        assert_eq!(map.allocate(100), 3);
        assert_eq!(map.allocate(200), 4);
    }

    #[test]
    fn take_removes_the_entry() {
        let mut map = InvocationMap::new();
        let uid = map.allocate(42);
        assert_eq!(map.take(uid), Some(42));
        assert_eq!(map.take(uid), None);
    }

    #[test]
    fn unknown_uid_resolves_to_none() {
        let mut map = InvocationMap::new();
        assert_eq!(map.take(999), None);
    }
}
