use decisiongraph_core::types::{GraphId, HashScheme, Namespace, UtcStamp};

/// Everything needed to mint a graph's root cell.
///
/// In production the creator identity and signing key come from a key
/// ceremony; tests generate fresh material. `graph_id` and `at` are normally
/// left unset (freshly generated / current time) and pinned only when
/// re-deriving a known genesis.
#[derive(Clone, Debug)]
pub struct GenesisSpec {
    /// Human-readable graph name; becomes the genesis fact object.
    pub graph_name: String,
    /// Single-segment namespace at the root of this graph's tree.
    pub root_namespace: Namespace,
    /// Identity string of whoever mints the graph, e.g. `founder:acme`.
    pub creator: String,
    /// Bootstrap graphs start unsigned; the proof says so explicitly.
    pub bootstrap: bool,
    pub hash_scheme: HashScheme,
    /// Pin the graph id instead of generating one (replay / test vectors).
    pub graph_id: Option<GraphId>,
    /// Pin the mint time instead of using the current instant.
    pub at: Option<UtcStamp>,
}

impl GenesisSpec {
    pub fn bootstrap(graph_name: &str, root_namespace: Namespace, creator: &str) -> Self {
        Self {
            graph_name: graph_name.to_string(),
            root_namespace,
            creator: creator.to_string(),
            bootstrap: true,
            hash_scheme: HashScheme::CanonRfc8785V1,
            graph_id: None,
            at: None,
        }
    }
}
