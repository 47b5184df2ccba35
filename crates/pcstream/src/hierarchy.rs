//! Hierarchy discovery.
//!
//! The resolver walks hierarchy pages with an explicit stack, starting at
//! the root page. Pages referenced by nodes deeper than the depth limit are
//! never fetched. A sub-page that cannot be loaded truncates its branch;
//! only a failed root page aborts resolution.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;

use pcstream_decode::{MAX_DEPTH, NodeKey};

use crate::error::Result;
use crate::fetch::ByteRange;

/// A resolvable tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileEntry {
    pub point_count: u64,
    /// Byte range inside the dataset file (COPC), `None` for per-tile
    /// resources (EPT).
    pub range: Option<ByteRange>,
}

/// Where a hierarchy page lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRef {
    /// A byte range of the dataset file (COPC).
    Range(ByteRange),
    /// The page named after a node (EPT `ept-hierarchy/<key>.json`).
    Node(NodeKey),
}

/// What the hierarchy knows about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEntry {
    Tile(TileEntry),
    /// The subtree is described by a deeper page that must be fetched.
    Page(PageRef),
}

/// A tile chosen for loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedTile {
    pub key: NodeKey,
    pub entry: TileEntry,
}

/// Loads and parses one hierarchy page.
pub trait PageLoader {
    fn load_page(
        &self,
        page: &PageRef,
    ) -> impl Future<Output = Result<Vec<(NodeKey, HierarchyEntry)>>> + Send;
}

/// Resolved node table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    entries: BTreeMap<NodeKey, HierarchyEntry>,
    depth_limit: u8,
}

impl Hierarchy {
    /// Depth limit the table was resolved for.
    #[must_use]
    pub fn depth_limit(&self) -> u8 {
        self.depth_limit
    }

    #[must_use]
    pub fn get(&self, key: &NodeKey) -> Option<&HierarchyEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&NodeKey, &HierarchyEntry)> {
        self.entries.iter()
    }

    /// Tiles with points at or above the resolved depth limit, root first.
    #[must_use]
    pub fn select(&self) -> Vec<SelectedTile> {
        self.select_depth(self.depth_limit)
    }

    /// Tiles with points whose depth does not exceed `depth`.
    ///
    /// Entries deeper than `depth` may be present because a page listed
    /// them while resolving a sibling branch; they are still excluded.
    #[must_use]
    pub fn select_depth(&self, depth: u8) -> Vec<SelectedTile> {
        self.entries
            .iter()
            .filter(|(key, _)| key.depth <= u32::from(depth))
            .filter_map(|(key, entry)| match entry {
                HierarchyEntry::Tile(tile) if tile.point_count > 0 => Some(SelectedTile {
                    key: *key,
                    entry: *tile,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Resolve the hierarchy below `root` down to `depth_limit` (clamped to 8).
pub async fn resolve<L: PageLoader>(
    loader: &L,
    root: PageRef,
    depth_limit: u8,
) -> Result<Hierarchy> {
    let depth_limit = depth_limit.min(MAX_DEPTH);
    let mut entries = BTreeMap::new();
    let mut visited = HashSet::from([root]);
    let mut pending = Vec::new();

    let found = loader.load_page(&root).await?;
    absorb(&mut entries, &mut pending, &visited, found, depth_limit);

    while let Some((key, page)) = pending.pop() {
        if !visited.insert(page) {
            continue;
        }
        match loader.load_page(&page).await {
            Ok(found) => absorb(&mut entries, &mut pending, &visited, found, depth_limit),
            Err(error) => {
                tracing::warn!(%key, %error, "hierarchy page unavailable, treating node as a leaf");
            }
        }
    }

    tracing::debug!(
        nodes = entries.len(),
        depth_limit,
        pages = visited.len(),
        "hierarchy resolved"
    );
    Ok(Hierarchy { entries, depth_limit })
}

fn absorb(
    entries: &mut BTreeMap<NodeKey, HierarchyEntry>,
    pending: &mut Vec<(NodeKey, PageRef)>,
    visited: &HashSet<PageRef>,
    found: Vec<(NodeKey, HierarchyEntry)>,
    depth_limit: u8,
) {
    for (key, entry) in found {
        match entry {
            HierarchyEntry::Tile(_) => {
                entries.insert(key, entry);
            }
            HierarchyEntry::Page(page) => {
                // A page never replaces a tile already learned for the node.
                entries.entry(key).or_insert(entry);
                if key.depth <= u32::from(depth_limit) && !visited.contains(&page) {
                    pending.push((key, page));
                }
            }
        }
    }
}
