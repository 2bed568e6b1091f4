//! Ordered Key List Module
//!
//! Arena-backed doubly linked list of keys, used for both the LRU and the TTL
//! ordering of a partition.

// == Slot ==
/// Stable handle to a node inside an [`IndexList`].
///
/// A slot stays valid until the node is removed; after that it may be reused.
pub(crate) type Slot = usize;

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<Slot>,
    next: Option<Slot>,
}

// == Index List ==
/// Doubly linked list of keys with O(1) push, move and removal.
///
/// Nodes live in a flat vector; freed slots are recycled through a free list.
/// - Front = most recently pushed / touched
/// - Back = oldest
#[derive(Debug, Default)]
pub(crate) struct IndexList {
    nodes: Vec<Option<Node>>,
    free: Vec<Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl IndexList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Inserts a key at the front and returns its slot.
    pub fn push_front(&mut self, key: String) -> Slot {
        let node = Node {
            key,
            prev: None,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        if let Some(old_head) = self.head {
            if let Some(n) = self.nodes[old_head].as_mut() {
                n.prev = Some(slot);
            }
        } else {
            self.tail = Some(slot);
        }
        self.head = Some(slot);
        self.len += 1;
        slot
    }

    // == Move To Front ==
    /// Moves an existing node to the front. Unknown slots are ignored.
    pub fn move_to_front(&mut self, slot: Slot) {
        if self.head == Some(slot) || !self.is_live(slot) {
            return;
        }
        self.unlink(slot);
        if let Some(n) = self.nodes[slot].as_mut() {
            n.prev = None;
            n.next = self.head;
        }
        if let Some(old_head) = self.head {
            if let Some(n) = self.nodes[old_head].as_mut() {
                n.prev = Some(slot);
            }
        } else {
            self.tail = Some(slot);
        }
        self.head = Some(slot);
    }

    // == Remove ==
    /// Removes a node and returns its key.
    pub fn remove(&mut self, slot: Slot) -> Option<String> {
        if !self.is_live(slot) {
            return None;
        }
        self.unlink(slot);
        let node = self.nodes[slot].take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.key)
    }

    // == Back ==
    /// Returns the oldest node without removing it.
    pub fn back(&self) -> Option<(Slot, &str)> {
        let slot = self.tail?;
        self.nodes[slot].as_ref().map(|n| (slot, n.key.as_str()))
    }

    // == Front ==
    /// Returns the newest key.
    #[cfg(test)]
    pub fn front(&self) -> Option<&str> {
        let slot = self.head?;
        self.nodes[slot].as_ref().map(|n| n.key.as_str())
    }

    // == Pop Back ==
    /// Removes and returns the oldest key.
    pub fn pop_back(&mut self) -> Option<String> {
        let slot = self.tail?;
        self.remove(slot)
    }

    /// Iterates keys from front to back.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every node and releases the arena.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn is_live(&self, slot: Slot) -> bool {
        matches!(self.nodes.get(slot), Some(Some(_)))
    }

    // Detaches a node from its neighbours, fixing head/tail. The node keeps
    // stale prev/next until the caller overwrites or drops it.
    fn unlink(&mut self, slot: Slot) {
        let (prev, next) = match self.nodes[slot].as_ref() {
            Some(n) => (n.prev, n.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(n) = self.nodes[p].as_mut() {
                    n.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(nx) => {
                if let Some(n) = self.nodes[nx].as_mut() {
                    n.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }
}

/// Front-to-back iterator over an [`IndexList`].
pub(crate) struct Iter<'a> {
    list: &'a IndexList,
    cursor: Option<Slot>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.list.nodes[slot].as_ref()?;
        self.cursor = node.next;
        Some(node.key.as_str())
    }
}
