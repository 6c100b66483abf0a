//! Bounded reuse pool for index nodes.
//!
//! Nodes retired by the index are kept on a per-kind free list, up to a fixed
//! capacity, and handed back out before anything new is allocated. A full
//! pool drops the node instead. This is a reject-on-full reuse cache, not an
//! allocator and not an LRU.

/// Default number of retired nodes kept per kind.
pub const DEFAULT_POOL_CAPACITY: usize = 5;

/// A node kind that can be parked in a [`Pool`].
pub trait Recycle: Default {
    /// Whether the node still references live index state.
    fn in_use(&self) -> bool;

    /// Reset key fields before the node is parked.
    fn recycle(&mut self);
}

/// Bounded LIFO free list of retired nodes.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    capacity: usize,
}

impl<T: Recycle> Pool<T> {
    /// Create an empty pool holding at most `capacity` nodes.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Take a parked node, or build a fresh one if none is parked.
    ///
    /// The caller sets the node's key fields.
    pub fn acquire(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    /// Retire a node: park it if there is room, drop it otherwise.
    ///
    /// # Panics
    ///
    /// Panics if the node is still in use. Releasing a bucket with links, or
    /// a link still attached to a bucket, means the index is corrupt.
    pub fn release(&mut self, mut node: T) {
        assert!(
            !node.in_use(),
            "released a {} that is still in use",
            std::any::type_name::<T>()
        );
        if self.free.len() < self.capacity {
            node.recycle();
            self.free.push(node);
        }
    }

    /// Number of parked nodes.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Maximum number of parked nodes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every parked node.
    pub fn clear(&mut self) {
        self.free = Vec::new();
    }
}

impl<T: Recycle> Default for Pool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Node {
        key: u32,
        attached: bool,
    }

    impl Recycle for Node {
        fn in_use(&self) -> bool {
            self.attached
        }

        fn recycle(&mut self) {
            self.key = 0;
        }
    }

    #[test]
    fn acquire_from_empty_pool_builds_fresh() {
        let mut pool: Pool<Node> = Pool::new(2);
        assert_eq!(pool.acquire(), Node::default());
        assert!(pool.is_empty());
    }

    #[test]
    fn release_parks_up_to_capacity() {
        let mut pool: Pool<Node> = Pool::new(2);
        for key in 0..4 {
            pool.release(Node {
                key,
                attached: false,
            });
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn released_nodes_are_reset() {
        let mut pool: Pool<Node> = Pool::new(1);
        pool.release(Node {
            key: 9,
            attached: false,
        });
        assert_eq!(pool.acquire().key, 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn zero_capacity_never_parks() {
        let mut pool: Pool<Node> = Pool::new(0);
        pool.release(Node::default());
        assert!(pool.is_empty());
    }

    #[test]
    #[should_panic(expected = "still in use")]
    fn releasing_attached_node_panics() {
        let mut pool: Pool<Node> = Pool::new(1);
        pool.release(Node {
            key: 1,
            attached: true,
        });
    }

    #[test]
    fn default_capacity_is_five() {
        let pool: Pool<Node> = Pool::default();
        assert_eq!(pool.capacity(), DEFAULT_POOL_CAPACITY);
        assert_eq!(DEFAULT_POOL_CAPACITY, 5);
    }

    #[test]
    fn clear_drops_parked_nodes() {
        let mut pool: Pool<Node> = Pool::new(3);
        pool.release(Node::default());
        pool.release(Node::default());
        pool.clear();
        assert!(pool.is_empty());
    }
}
