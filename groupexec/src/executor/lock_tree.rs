//! Multi-granularity locking over the group path tree.
//!
//! The [`LockTree`] owns one [`AdmissionSemaphore`] per distinct path it has
//! seen. Nodes are created lazily from the path's configured pool size and
//! never removed, so every lock/unlock of a path goes through the same nodes.
//! A node first created as an ancestor is resized when the pool for its own
//! path is built, so its quota always matches that pool's size.
//!
//! Locking `a/b` enters transit on `<root>` and `a` (root first), then enters
//! `a/b` exclusively. Unlocking reverses the order:
//!
//! ```text
//!   lock(a/b)                     unlock(a/b)
//!   <root>.enter_transit   (1)    a/b.exit_exclusive     (1)
//!   a.enter_transit        (2)    a.exit_transit         (2)
//!   a/b.enter_exclusive    (3)    <root>.exit_transit    (3)
//! ```
//!
//! Ancestors are entered before the node itself so that a job never holds
//! exclusivity at its own node while still queued behind an ancestor writer.

use super::admission::AdmissionSemaphore;
use super::path::GroupPath;
use crate::config::{ConfigError, GroupConfiguration, GroupConfigurationSource};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Lazily built tree of admission nodes keyed by path.
pub struct LockTree {
    nodes: DashMap<GroupPath, Arc<AdmissionSemaphore>>,
    configurations: Arc<dyn GroupConfigurationSource>,
}

impl LockTree {
    pub fn new(configurations: Arc<dyn GroupConfigurationSource>) -> Self {
        Self {
            nodes: DashMap::new(),
            configurations,
        }
    }

    /// Returns the node for `path`, creating it on first use.
    ///
    /// The node's quota is the pool size configured for `path` at creation
    /// time. Only [`chain_with`](Self::chain_with) resizes an existing node.
    pub fn node(&self, path: &GroupPath) -> Result<Arc<AdmissionSemaphore>, ConfigError> {
        if let Some(node) = self.nodes.get(path) {
            return Ok(Arc::clone(node.value()));
        }
        let configuration = self.configurations.configuration(path)?;
        let node = match self.nodes.entry(path.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                debug!(
                    path = %path,
                    quota = configuration.pool_size,
                    "Created admission node"
                );
                let node = Arc::new(AdmissionSemaphore::new(configuration.pool_size));
                entry.insert(Arc::clone(&node));
                node
            }
        };
        Ok(node)
    }

    /// Resolves the full chain of nodes from the root down to `path`.
    pub fn chain(&self, path: &GroupPath) -> Result<LockChain, ConfigError> {
        let ancestors = self.ancestor_nodes(path)?;
        let node = self.node(path)?;
        Ok(LockChain {
            path: path.clone(),
            ancestors,
            node,
        })
    }

    /// Resolves the chain for a pool being built at `path` with
    /// `configuration`.
    ///
    /// If the node for `path` already exists because a descendant was seen
    /// first, its quota is set to `configuration.pool_size`.
    pub fn chain_with(
        &self,
        path: &GroupPath,
        configuration: &GroupConfiguration,
    ) -> Result<LockChain, ConfigError> {
        let ancestors = self.ancestor_nodes(path)?;
        let node = match self.nodes.entry(path.clone()) {
            Entry::Occupied(entry) => {
                let node = Arc::clone(entry.get());
                if node.quota() != configuration.pool_size {
                    debug!(
                        path = %path,
                        from = node.quota(),
                        to = configuration.pool_size,
                        "Resized admission node"
                    );
                    node.set_quota(configuration.pool_size);
                }
                node
            }
            Entry::Vacant(entry) => {
                debug!(
                    path = %path,
                    quota = configuration.pool_size,
                    "Created admission node"
                );
                let node = Arc::new(AdmissionSemaphore::new(configuration.pool_size));
                entry.insert(Arc::clone(&node));
                node
            }
        };
        Ok(LockChain {
            path: path.clone(),
            ancestors,
            node,
        })
    }

    fn ancestor_nodes(&self, path: &GroupPath) -> Result<Vec<Arc<AdmissionSemaphore>>, ConfigError> {
        path.ancestors()
            .iter()
            .map(|ancestor| self.node(ancestor))
            .collect()
    }

    /// Blocks until a job at `path` may run.
    pub fn lock(&self, path: &GroupPath) -> Result<(), ConfigError> {
        self.chain(path)?.lock();
        Ok(())
    }

    /// Releases what [`lock`](Self::lock) acquired for `path`.
    pub fn unlock(&self, path: &GroupPath) -> Result<(), ConfigError> {
        self.chain(path)?.unlock();
        Ok(())
    }

    /// Returns the node for `path` if it has been created.
    pub fn existing_node(&self, path: &GroupPath) -> Option<Arc<AdmissionSemaphore>> {
        self.nodes.get(path).map(|node| Arc::clone(node.value()))
    }

    /// Number of nodes created so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Resolved nodes for one path, root first.
///
/// Grouped pools resolve their chain once at creation so that the worker
/// hooks never need a configuration lookup.
#[derive(Clone, Debug)]
pub struct LockChain {
    path: GroupPath,
    ancestors: Vec<Arc<AdmissionSemaphore>>,
    node: Arc<AdmissionSemaphore>,
}

impl LockChain {
    pub fn path(&self) -> &GroupPath {
        &self.path
    }

    pub fn lock(&self) {
        for ancestor in &self.ancestors {
            ancestor.enter_transit();
        }
        self.node.enter_exclusive();
    }

    pub fn unlock(&self) {
        self.node.exit_exclusive();
        for ancestor in self.ancestors.iter().rev() {
            ancestor.exit_transit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupConfiguration, StaticGroupConfigurations};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const BLOCKED_WAIT: Duration = Duration::from_millis(100);
    const UNBLOCKED_WAIT: Duration = Duration::from_secs(5);

    fn path(s: &str) -> GroupPath {
        s.parse().unwrap()
    }

    fn tree() -> Arc<LockTree> {
        let configurations = StaticGroupConfigurations::new()
            .with_group(path("a"), GroupConfiguration::with_pool_size(1))
            .with_group(path("a/b"), GroupConfiguration::with_pool_size(2));
        Arc::new(LockTree::new(Arc::new(configurations)))
    }

    fn spawn_lock(tree: &Arc<LockTree>, p: &str) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        let tree = Arc::clone(tree);
        let p = path(p);
        thread::spawn(move || {
            tree.lock(&p).unwrap();
            let _ = tx.send(());
        });
        rx
    }

    #[test]
    fn test_nodes_are_shared_per_path() {
        let tree = tree();
        let first = tree.node(&path("a/b")).unwrap();
        let second = tree.node(&path("a/b")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.quota(), 2);
    }

    #[test]
    fn test_chain_creates_ancestor_nodes() {
        let tree = tree();
        tree.chain(&path("a/b/c")).unwrap();
        assert_eq!(tree.len(), 4);
        assert!(tree.existing_node(&GroupPath::root()).is_some());
        assert!(tree.existing_node(&path("a")).is_some());
        assert!(tree.existing_node(&path("a/b")).is_some());
    }

    #[test]
    fn test_lock_counts_transit_on_ancestors() {
        let tree = tree();
        tree.lock(&path("a/b")).unwrap();

        assert_eq!(tree.existing_node(&GroupPath::root()).unwrap().readers(), 1);
        assert_eq!(tree.existing_node(&path("a")).unwrap().readers(), 1);
        assert_eq!(tree.existing_node(&path("a/b")).unwrap().writers(), 1);

        tree.unlock(&path("a/b")).unwrap();
        assert_eq!(tree.existing_node(&path("a")).unwrap().readers(), 0);
        assert_eq!(tree.existing_node(&path("a/b")).unwrap().writers(), 0);
    }

    #[test]
    fn test_ancestor_writer_blocks_descendants() {
        let tree = tree();
        tree.lock(&path("a")).unwrap();

        let child = spawn_lock(&tree, "a/b");
        assert!(child.recv_timeout(BLOCKED_WAIT).is_err());

        tree.unlock(&path("a")).unwrap();
        assert!(child.recv_timeout(UNBLOCKED_WAIT).is_ok());
    }

    #[test]
    fn test_descendant_activity_blocks_ancestor_writer() {
        let tree = tree();
        tree.lock(&path("a/b")).unwrap();
        tree.lock(&path("a/b")).unwrap();

        let parent = spawn_lock(&tree, "a");
        assert!(parent.recv_timeout(BLOCKED_WAIT).is_err());

        tree.unlock(&path("a/b")).unwrap();
        assert!(parent.recv_timeout(BLOCKED_WAIT).is_err());

        tree.unlock(&path("a/b")).unwrap();
        assert!(parent.recv_timeout(UNBLOCKED_WAIT).is_ok());
    }

    #[test]
    fn test_siblings_do_not_block_each_other() {
        let tree = tree();
        tree.lock(&path("a/b")).unwrap();
        let sibling = spawn_lock(&tree, "a/c");
        assert!(sibling.recv_timeout(UNBLOCKED_WAIT).is_ok());
    }

    #[test]
    fn test_chain_with_resizes_node_created_as_ancestor() {
        let tree = tree();
        tree.chain(&path("a/b")).unwrap();
        assert_eq!(tree.existing_node(&path("a")).unwrap().quota(), 1);

        let chain = tree
            .chain_with(&path("a"), &GroupConfiguration::with_pool_size(3))
            .unwrap();
        assert_eq!(chain.path(), &path("a"));
        assert_eq!(tree.existing_node(&path("a")).unwrap().quota(), 3);

        chain.lock();
        chain.lock();
        chain.lock();
        assert_eq!(tree.existing_node(&path("a")).unwrap().writers(), 3);
    }

    #[test]
    fn test_chain_with_creates_missing_node() {
        let tree = tree();
        tree.chain_with(&path("x/y"), &GroupConfiguration::with_pool_size(4))
            .unwrap();
        assert_eq!(tree.existing_node(&path("x/y")).unwrap().quota(), 4);
        assert_eq!(tree.existing_node(&path("x")).unwrap().quota(), 1);
    }

    #[test]
    fn test_configuration_failure_is_reported() {
        let configurations = StaticGroupConfigurations::new()
            .with_group(path("bad"), GroupConfiguration::with_pool_size(0));
        let tree = LockTree::new(Arc::new(configurations));

        assert!(tree.chain(&path("bad/child")).is_err());
        assert!(tree.existing_node(&path("bad")).is_none());
    }
}
