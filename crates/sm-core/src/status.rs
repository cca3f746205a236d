use bitflags::bitflags;

bitflags! {
    /// Status flags carried by a node.
    ///
    /// `DISABLED`, `HEALTHY` and `TIRED` are derived by
    /// [`Node::refresh_status`](crate::node::Node::refresh_status); the
    /// remaining flags are conditions set by subsystem logic. Any of the
    /// [`BLOCKING`](Self::BLOCKING) conditions forces `DISABLED`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[derive(serde::Serialize, serde::Deserialize)]
    pub struct NodeStatus: u32 {
        const HEALTHY     = 1 << 0;
        const TIRED       = 1 << 1;
        const DISABLED    = 1 << 2;
        const FRACTURED   = 1 << 3;
        const TORN        = 1 << 4;
        const SEVERED     = 1 << 5;
        const UNSUPPORTED = 1 << 6;
        const DENERVATED  = 1 << 7;
        const BLEEDING    = 1 << 8;
        const INFECTED    = 1 << 9;
        const INFLAMED    = 1 << 10;
        const POISONED    = 1 << 11;
        const BURNED      = 1 << 12;
        const WOUNDED     = 1 << 13;
        const BANDAGED    = 1 << 14;
        const RESTING     = 1 << 15;

        /// Conditions that disable a node regardless of its components.
        const BLOCKING = Self::FRACTURED.bits()
            | Self::TORN.bits()
            | Self::SEVERED.bits()
            | Self::UNSUPPORTED.bits()
            | Self::DENERVATED.bits();
    }
}

impl NodeStatus {
    /// Lower-case names of every set flag, for display and export.
    pub fn labels(&self) -> Vec<String> {
        self.iter_names()
            .filter(|(name, _)| *name != "BLOCKING")
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels = self.labels();
        if labels.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&labels.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_covers_structural_conditions() {
        assert!(NodeStatus::BLOCKING.contains(NodeStatus::FRACTURED));
        assert!(NodeStatus::BLOCKING.contains(NodeStatus::UNSUPPORTED));
        assert!(!NodeStatus::BLOCKING.contains(NodeStatus::BLEEDING));
    }

    #[test]
    fn labels_skip_composites() {
        let status = NodeStatus::FRACTURED | NodeStatus::TORN;
        assert_eq!(status.labels(), vec!["fractured", "torn"]);
        assert_eq!(status.to_string(), "fractured,torn");
        assert_eq!(NodeStatus::empty().to_string(), "-");
    }
}
