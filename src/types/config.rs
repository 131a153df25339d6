//! Knowledge-base configuration: the one wire contract the core parses.
//!
//! A KB selects its chunker, retriever, and embedding settings as
//! `{name, params}` pairs in a JSON blob. An unknown `name` is a typed
//! [`RetrievalError::Config`] at load time, never a panic and never an
//! error deferred to first use.
//!
//! Strategy selection is a tagged union of supported strategies, each
//! with a strongly-typed parameter struct.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Raw `{name, params}` pair as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl OperatorSpec {
    /// A spec with no parameters (all defaults).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: serde_json::Value::Null,
        }
    }

    fn params_value(&self) -> serde_json::Value {
        if self.params.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            self.params.clone()
        }
    }

    fn parse_params<T: serde::de::DeserializeOwned>(&self, kind: &str) -> Result<T> {
        serde_json::from_value(self.params_value()).map_err(|e| {
            RetrievalError::config(format!("invalid params for {} '{}': {}", kind, self.name, e))
        })
    }

    /// Stable fingerprint of this spec, used in query-cache keys so a
    /// config edit never serves stale cached results.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.params_value().to_string().as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        format!("{}:{}", self.name, &hash[..16])
    }
}

// ============ Chunkers ============

fn default_max_chars() -> usize {
    800
}

/// Parameters for the fixed-length chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedParams {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

/// Parameters for the overlapping sliding-window chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowParams {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap")]
    pub overlap_chars: usize,
}

fn default_overlap() -> usize {
    200
}

/// Parameters for the recursive separator-cascade chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorParams {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        ". ".to_string(),
        " ".to_string(),
    ]
}

/// Parameters for the heading-aware markdown chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownParams {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

/// Parameters for the syntax-aware code chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeParams {
    #[serde(default = "default_code_max_chars")]
    pub max_chars: usize,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_code_max_chars() -> usize {
    1600
}

/// Parameters for two-layer parent/child chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentChildParams {
    #[serde(default = "default_parent_max_chars")]
    pub parent_max_chars: usize,
    #[serde(default = "default_child_max_chars")]
    pub child_max_chars: usize,
}

fn default_parent_max_chars() -> usize {
    2400
}
fn default_child_max_chars() -> usize {
    400
}

/// Typed chunker selection.
#[derive(Debug, Clone)]
pub enum ChunkerConfig {
    Fixed(FixedParams),
    Window(WindowParams),
    Separator(SeparatorParams),
    Markdown(MarkdownParams),
    Code(CodeParams),
    ParentChild(ParentChildParams),
}

impl ChunkerConfig {
    /// Names accepted on the wire.
    pub const NAMES: &'static [&'static str] = &[
        "fixed",
        "window",
        "separator",
        "markdown",
        "code",
        "parent_child",
    ];

    /// The wire name for this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fixed(_) => "fixed",
            Self::Window(_) => "window",
            Self::Separator(_) => "separator",
            Self::Markdown(_) => "markdown",
            Self::Code(_) => "code",
            Self::ParentChild(_) => "parent_child",
        }
    }

    /// Parse a `{name, params}` spec into a typed config.
    pub fn from_spec(spec: &OperatorSpec) -> Result<Self> {
        match spec.name.as_str() {
            "fixed" => Ok(Self::Fixed(spec.parse_params("chunker")?)),
            "window" => Ok(Self::Window(spec.parse_params("chunker")?)),
            "separator" => Ok(Self::Separator(spec.parse_params("chunker")?)),
            "markdown" => Ok(Self::Markdown(spec.parse_params("chunker")?)),
            "code" => Ok(Self::Code(spec.parse_params("chunker")?)),
            "parent_child" => Ok(Self::ParentChild(spec.parse_params("chunker")?)),
            other => Err(RetrievalError::config(format!(
                "unknown chunker '{}'; expected one of {:?}",
                other,
                Self::NAMES
            ))),
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::Separator(SeparatorParams {
            max_chars: default_max_chars(),
            separators: default_separators(),
        })
    }
}

// ============ Retrievers ============

/// How ranked lists are fused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    /// Reciprocal rank fusion.
    Rrf,
    /// Weighted score sum.
    Weighted,
}

fn default_rrf_k() -> f32 {
    60.0
}

/// Parameters for the sparse (BM25) retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseParams {
    #[serde(default = "default_bm25_k1")]
    pub k1: f32,
    #[serde(default = "default_bm25_b")]
    pub b: f32,
}

fn default_bm25_k1() -> f32 {
    1.5
}
fn default_bm25_b() -> f32 {
    0.75
}

impl Default for SparseParams {
    fn default() -> Self {
        Self {
            k1: default_bm25_k1(),
            b: default_bm25_b(),
        }
    }
}

/// Parameters for the hybrid dense+sparse retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridParams {
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,
    #[serde(default = "default_sparse_weight")]
    pub sparse_weight: f32,
}

fn default_dense_weight() -> f32 {
    0.7
}
fn default_sparse_weight() -> f32 {
    0.3
}

impl Default for HybridParams {
    fn default() -> Self {
        Self {
            dense_weight: default_dense_weight(),
            sparse_weight: default_sparse_weight(),
        }
    }
}

/// Raw fusion params as they appear on the wire.
#[derive(Debug, Clone, Deserialize)]
struct RawFusionParams {
    first: OperatorSpec,
    second: OperatorSpec,
    #[serde(default = "default_fusion_mode")]
    mode: FusionMode,
    #[serde(default = "default_rrf_k")]
    rrf_k: f32,
    #[serde(default)]
    weights: Option<(f32, f32)>,
    #[serde(default)]
    rerank: bool,
    #[serde(default = "default_rerank_candidates")]
    rerank_candidates: usize,
}

fn default_fusion_mode() -> FusionMode {
    FusionMode::Rrf
}
fn default_rerank_candidates() -> usize {
    50
}

/// Typed fusion parameters with resolved sub-retrievers.
#[derive(Debug, Clone)]
pub struct FusionParams {
    pub first: Box<RetrieverConfig>,
    pub second: Box<RetrieverConfig>,
    pub mode: FusionMode,
    pub rrf_k: f32,
    pub weights: (f32, f32),
    pub rerank: bool,
    pub rerank_candidates: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct RawExpansionParams {
    #[serde(default = "default_num_variants")]
    num_variants: usize,
    #[serde(default = "default_keep_original")]
    keep_original: bool,
    #[serde(default = "default_rrf_k")]
    rrf_k: f32,
    #[serde(default)]
    inner: Option<OperatorSpec>,
}

fn default_num_variants() -> usize {
    3
}
fn default_keep_original() -> bool {
    true
}

/// Parameters for query-expansion retrievers (HyDE, multi-query).
#[derive(Debug, Clone)]
pub struct ExpansionParams {
    pub num_variants: usize,
    pub keep_original: bool,
    pub rrf_k: f32,
    pub inner: Box<RetrieverConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSelfQueryParams {
    #[serde(default)]
    allowed_fields: Vec<String>,
    #[serde(default)]
    inner: Option<OperatorSpec>,
}

/// Parameters for the self-query retriever.
#[derive(Debug, Clone)]
pub struct SelfQueryParams {
    /// Whitelist of metadata fields the LLM may filter on.
    pub allowed_fields: Vec<String>,
    pub inner: Box<RetrieverConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawParentParams {
    #[serde(default)]
    inner: Option<OperatorSpec>,
}

/// Parameters for the parent-document retriever.
#[derive(Debug, Clone)]
pub struct ParentParams {
    pub inner: Box<RetrieverConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEnsembleMember {
    #[serde(flatten)]
    spec: OperatorSpec,
    #[serde(default = "default_member_weight")]
    weight: f32,
}

fn default_member_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
struct RawEnsembleParams {
    members: Vec<RawEnsembleMember>,
    #[serde(default = "default_fusion_mode")]
    mode: FusionMode,
    #[serde(default = "default_rrf_k")]
    rrf_k: f32,
    #[serde(default = "default_parallel")]
    parallel: bool,
}

fn default_parallel() -> bool {
    true
}

/// One weighted member of an ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleMember {
    pub config: RetrieverConfig,
    pub weight: f32,
}

/// Parameters for the ensemble retriever.
#[derive(Debug, Clone)]
pub struct EnsembleParams {
    pub members: Vec<EnsembleMember>,
    pub mode: FusionMode,
    pub rrf_k: f32,
    pub parallel: bool,
}

/// Typed retriever selection. Sub-retrievers are resolved recursively
/// at parse time, so a bad nested `name` fails at load, not first use.
#[derive(Debug, Clone)]
pub enum RetrieverConfig {
    Dense,
    Sparse(SparseParams),
    Hybrid(HybridParams),
    Fusion(FusionParams),
    Hyde(ExpansionParams),
    MultiQuery(ExpansionParams),
    SelfQuery(SelfQueryParams),
    Parent(ParentParams),
    Ensemble(EnsembleParams),
}

impl RetrieverConfig {
    /// Names accepted on the wire.
    pub const NAMES: &'static [&'static str] = &[
        "dense",
        "sparse",
        "hybrid",
        "fusion",
        "hyde",
        "multi_query",
        "self_query",
        "parent",
        "ensemble",
    ];

    /// The wire name for this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse(_) => "sparse",
            Self::Hybrid(_) => "hybrid",
            Self::Fusion(_) => "fusion",
            Self::Hyde(_) => "hyde",
            Self::MultiQuery(_) => "multi_query",
            Self::SelfQuery(_) => "self_query",
            Self::Parent(_) => "parent",
            Self::Ensemble(_) => "ensemble",
        }
    }

    /// Parse a `{name, params}` spec into a typed config, resolving
    /// nested sub-retrievers.
    pub fn from_spec(spec: &OperatorSpec) -> Result<Self> {
        match spec.name.as_str() {
            "dense" => Ok(Self::Dense),
            "sparse" => Ok(Self::Sparse(spec.parse_params("retriever")?)),
            "hybrid" => Ok(Self::Hybrid(spec.parse_params("retriever")?)),
            "fusion" => {
                let raw: RawFusionParams = spec.parse_params("retriever")?;
                Ok(Self::Fusion(FusionParams {
                    first: Box::new(Self::from_spec(&raw.first)?),
                    second: Box::new(Self::from_spec(&raw.second)?),
                    mode: raw.mode,
                    rrf_k: raw.rrf_k,
                    weights: raw.weights.unwrap_or((0.5, 0.5)),
                    rerank: raw.rerank,
                    rerank_candidates: raw.rerank_candidates,
                }))
            }
            "hyde" => Ok(Self::Hyde(Self::expansion_params(spec)?)),
            "multi_query" => Ok(Self::MultiQuery(Self::expansion_params(spec)?)),
            "self_query" => {
                let raw: RawSelfQueryParams = spec.parse_params("retriever")?;
                Ok(Self::SelfQuery(SelfQueryParams {
                    allowed_fields: raw.allowed_fields,
                    inner: Box::new(Self::inner_or_dense(raw.inner.as_ref())?),
                }))
            }
            "parent" => {
                let raw: RawParentParams = spec.parse_params("retriever")?;
                Ok(Self::Parent(ParentParams {
                    inner: Box::new(Self::inner_or_dense(raw.inner.as_ref())?),
                }))
            }
            "ensemble" => {
                let raw: RawEnsembleParams = spec.parse_params("retriever")?;
                if raw.members.is_empty() {
                    return Err(RetrievalError::config("ensemble requires at least one member"));
                }
                let members = raw
                    .members
                    .iter()
                    .map(|m| {
                        Ok(EnsembleMember {
                            config: Self::from_spec(&m.spec)?,
                            weight: m.weight,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Ensemble(EnsembleParams {
                    members,
                    mode: raw.mode,
                    rrf_k: raw.rrf_k,
                    parallel: raw.parallel,
                }))
            }
            other => Err(RetrievalError::config(format!(
                "unknown retriever '{}'; expected one of {:?}",
                other,
                Self::NAMES
            ))),
        }
    }

    fn expansion_params(spec: &OperatorSpec) -> Result<ExpansionParams> {
        let raw: RawExpansionParams = spec.parse_params("retriever")?;
        Ok(ExpansionParams {
            num_variants: raw.num_variants.max(1),
            keep_original: raw.keep_original,
            rrf_k: raw.rrf_k,
            inner: Box::new(Self::inner_or_dense(raw.inner.as_ref())?),
        })
    }

    fn inner_or_dense(inner: Option<&OperatorSpec>) -> Result<Self> {
        match inner {
            Some(spec) => Self::from_spec(spec),
            None => Ok(Self::Dense),
        }
    }

}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self::Hybrid(HybridParams::default())
    }
}

// ============ Embedding ============

/// Embedding settings for a knowledge base.
///
/// The concrete provider lives behind the [`crate::traits::Embedder`]
/// interface; the core only needs the dimensionality contract and the
/// batch ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_model() -> String {
    "default".to_string()
}
fn default_dims() -> usize {
    1024
}
fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
        }
    }
}

// ============ KbConfig ============

#[derive(Debug, Clone, Deserialize)]
struct RawKbConfig {
    #[serde(default)]
    chunker: Option<OperatorSpec>,
    #[serde(default)]
    retriever: Option<OperatorSpec>,
    #[serde(default)]
    embedding: Option<EmbeddingSettings>,
    #[serde(default)]
    enrich: bool,
    #[serde(default)]
    raptor: bool,
    #[serde(default = "default_raptor_max_layers")]
    raptor_max_layers: u32,
}

fn default_raptor_max_layers() -> u32 {
    3
}

/// Per-knowledge-base algorithm configuration.
///
/// Strategy selections stay as `{name, params}` specs (resolved
/// through the operator registry at use sites) but are validated
/// against the built-in strategy set at parse time, so a bad config
/// fails at load rather than at first query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbConfig {
    pub chunker: OperatorSpec,
    pub retriever: OperatorSpec,
    pub embedding: EmbeddingSettings,

    /// Generate an LLM document summary during ingestion.
    pub enrich: bool,

    /// Build a RAPTOR summary tree during ingestion.
    pub raptor: bool,
    pub raptor_max_layers: u32,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            chunker: OperatorSpec::named("separator"),
            retriever: OperatorSpec::named("hybrid"),
            embedding: EmbeddingSettings::default(),
            enrich: false,
            raptor: false,
            raptor_max_layers: default_raptor_max_layers(),
        }
    }
}

impl KbConfig {
    /// Parse a KB configuration blob. Missing sections fall back to
    /// defaults; any unknown built-in strategy name is a config error
    /// here, at load time.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let raw: RawKbConfig = serde_json::from_value(value.clone())
            .map_err(|e| RetrievalError::config(format!("invalid kb config: {}", e)))?;

        let chunker = raw.chunker.unwrap_or_else(|| OperatorSpec::named("separator"));
        ChunkerConfig::from_spec(&chunker)?;
        let retriever = raw
            .retriever
            .unwrap_or_else(|| OperatorSpec::named("hybrid"));
        RetrieverConfig::from_spec(&retriever)?;

        Ok(Self {
            chunker,
            retriever,
            embedding: raw.embedding.unwrap_or_default(),
            enrich: raw.enrich,
            raptor: raw.raptor,
            raptor_max_layers: raw.raptor_max_layers,
        })
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| RetrievalError::config(format!("invalid kb config json: {}", e)))?;
        Self::from_json(&value)
    }
}
