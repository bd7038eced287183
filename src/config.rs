//! Tunables for parsing, comparing and building distance matrices.
//!
//! Every struct implements [`Default`] with the constants used by Day's
//! RF pipeline and offers chainable `with_*` setters.

/// Branch length assigned when a node carries no `:length` token.
pub const DEFAULT_BRANCH_LENGTH: f64 = 0.000033;

/// Branches at or below this length do not count as bipartitions.
pub const MIN_BRANCH_LENGTH: f64 = 6e-6;

/// Options of the Newick parser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    /// Length used for nodes without an explicit branch length.
    pub default_branch_length: f64,
    /// Factor every parsed branch length is multiplied by.
    pub length_scale: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_branch_length: DEFAULT_BRANCH_LENGTH,
            length_scale: 1.0,
        }
    }
}

impl ParseOptions {
    pub fn with_default_branch_length(mut self, length: f64) -> Self {
        self.default_branch_length = length;
        self
    }

    pub fn with_length_scale(mut self, scale: f64) -> Self {
        self.length_scale = scale;
        self
    }
}

/// Options shared by the preparer and the comparator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    /// Compare trees as rooted (no canonicalization around leaf 0).
    pub rooted: bool,
    /// Threshold below which a branch is treated as absent.
    pub min_branch_length: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            rooted: false,
            min_branch_length: MIN_BRANCH_LENGTH,
        }
    }
}

impl CompareOptions {
    pub fn with_rooted(mut self, rooted: bool) -> Self {
        self.rooted = rooted;
        self
    }

    pub fn with_min_branch_length(mut self, length: f64) -> Self {
        self.min_branch_length = length;
        self
    }
}

/// Value written into each matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Raw Robinson-Foulds count.
    #[default]
    Rf,
    /// RF divided by the maximum possible number of differences.
    NormalizedRf,
    /// Length-aware RF (Kuhner-Felsenstein style).
    Rfl,
}

/// Full configuration of a distance matrix computation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MatrixConfig {
    pub parse: ParseOptions,
    pub compare: CompareOptions,
    pub metric: Metric,
    /// Worker count; `None` uses the available CPU parallelism.
    pub threads: Option<usize>,
}

impl MatrixConfig {
    pub fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_compare(mut self, compare: CompareOptions) -> Self {
        self.compare = compare;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}
